//! `chore advance`: move a chore one phase forward.

use std::io::{self, Write};

use anyhow::{Context as _, Result};
use chores_core::lifecycle::{NoteUpdate, TransitionOutcome};
use chores_core::{ChoreId, Phase};
use clap::Args;
use serde::Serialize;

use crate::cmd::{ChoreView, parse_id};
use crate::context::ProjectContext;
use crate::output::{pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct AdvanceArgs {
    #[arg(value_parser = parse_id)]
    pub id: ChoreId,

    /// Record a progress note with the transition.
    #[arg(long)]
    pub progress: Option<String>,

    /// Record a review note with the transition.
    #[arg(long)]
    pub review: Option<String>,
}

/// A committed phase change, shared by `advance` and `reject`.
#[derive(Debug, Serialize)]
pub struct TransitionView {
    pub from: Phase,
    pub to: Phase,
    pub archived: bool,
    pub chore: ChoreView,
}

impl TransitionView {
    pub fn new(outcome: &TransitionOutcome) -> Self {
        Self {
            from: outcome.from,
            to: outcome.to,
            archived: outcome.archived,
            chore: ChoreView::new(&outcome.chore, outcome.archived),
        }
    }

    /// `id<TAB>from<TAB>to`
    pub fn write_row(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}\t{}\t{}", self.chore.id, self.from, self.to)
    }

    pub fn write_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}: {} -> {}", self.chore.name, self.from, self.to)?;
        pretty_kv(w, "ID", self.chore.id.to_string())?;
        pretty_kv(w, "Role", self.chore.role)?;
        if self.archived {
            writeln!(w, "Completed and archived.")?;
        }
        Ok(())
    }
}

/// # Errors
///
/// Unknown id, open children, or store failure.
pub fn run_advance(args: &AdvanceArgs, ctx: &ProjectContext) -> Result<()> {
    let mut repo = ctx.open_repository_with_hooks()?;
    let notes = NoteUpdate {
        progress_info: args.progress.clone(),
        review_info: args.review.clone(),
    };
    let outcome = repo
        .advance(args.id, notes)
        .with_context(|| format!("failed to advance chore {}", args.id))?;
    ctx.report_hook_failures(&mut repo);

    render_mode(
        ctx.output,
        &TransitionView::new(&outcome),
        TransitionView::write_row,
        TransitionView::write_pretty,
    )
}
