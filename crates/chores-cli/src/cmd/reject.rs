//! `chore reject`: send a chore in review back to its working phase.

use anyhow::{Context as _, Result};
use chores_core::ChoreId;
use clap::Args;

use crate::cmd::advance::TransitionView;
use crate::cmd::parse_id;
use crate::context::ProjectContext;
use crate::output::render_mode;

#[derive(Args, Debug)]
pub struct RejectArgs {
    #[arg(value_parser = parse_id)]
    pub id: ChoreId,

    /// Reviewer feedback, stored as the review note.
    #[arg(short, long)]
    pub reason: Option<String>,
}

/// # Errors
///
/// Unknown id, chore not in a review phase, or store failure.
pub fn run_reject(args: &RejectArgs, ctx: &ProjectContext) -> Result<()> {
    let mut repo = ctx.open_repository_with_hooks()?;
    let outcome = repo
        .reject(args.id, args.reason.clone())
        .with_context(|| format!("failed to reject chore {}", args.id))?;
    ctx.report_hook_failures(&mut repo);

    render_mode(
        ctx.output,
        &TransitionView::new(&outcome),
        TransitionView::write_row,
        TransitionView::write_pretty,
    )
}
