//! `chore delete`: remove a chore and its descendants from the active set.

use anyhow::{Context as _, Result};
use chores_core::ChoreId;
use clap::Args;
use serde::Serialize;

use crate::cmd::parse_id;
use crate::context::ProjectContext;
use crate::output::render_mode;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[arg(value_parser = parse_id)]
    pub id: ChoreId,
}

#[derive(Debug, Serialize)]
struct DeleteReport {
    deleted: Vec<ChoreId>,
}

/// # Errors
///
/// Unknown id or store failure.
pub fn run_delete(args: &DeleteArgs, ctx: &ProjectContext) -> Result<()> {
    let mut repo = ctx.open_repository_with_hooks()?;
    let deleted = repo
        .delete(args.id)
        .with_context(|| format!("failed to delete chore {}", args.id))?;
    ctx.report_hook_failures(&mut repo);

    render_mode(
        ctx.output,
        &DeleteReport { deleted },
        |r, w| {
            for id in &r.deleted {
                writeln!(w, "{id}")?;
            }
            Ok(())
        },
        |r, w| {
            let noun = if r.deleted.len() == 1 { "chore" } else { "chores" };
            writeln!(w, "deleted {} {noun}", r.deleted.len())
        },
    )
}
