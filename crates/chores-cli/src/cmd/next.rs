//! `chore next`: the successor to pick up once a chore is done.

use anyhow::Result;
use chores_core::ChoreId;
use clap::Args;
use serde::Serialize;

use crate::cmd::{ChoreView, parse_id};
use crate::context::ProjectContext;
use crate::output::render_mode;

#[derive(Args, Debug)]
pub struct NextArgs {
    #[arg(value_parser = parse_id)]
    pub id: ChoreId,
}

#[derive(Debug, Serialize)]
struct NextReport {
    id: ChoreId,
    next: Option<ChoreView>,
}

/// Prints nothing (text) or `"next": null` (JSON) until `id` is terminal
/// and has a successor.
///
/// # Errors
///
/// `id` in neither store, or store failure.
pub fn run_next(args: &NextArgs, ctx: &ProjectContext) -> Result<()> {
    let repo = ctx.open_repository()?;
    let next = repo.next_chore(args.id)?;
    let archived = next.as_ref().is_some_and(|c| repo.read(c.id()).is_none());
    let report = NextReport {
        id: args.id,
        next: next.as_ref().map(|c| ChoreView::new(c, archived)),
    };

    render_mode(
        ctx.output,
        &report,
        |r, w| match &r.next {
            Some(view) => view.write_row(w),
            None => Ok(()),
        },
        |r, w| match &r.next {
            Some(view) => view.write_pretty(w),
            None => writeln!(w, "no successor ready for chore {}", r.id),
        },
    )
}
