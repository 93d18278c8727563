//! `chore successor`: link the chore that follows another once it is done.

use anyhow::{Context as _, Result};
use chores_core::ChoreId;
use clap::Args;
use serde::Serialize;

use crate::cmd::parse_id;
use crate::context::ProjectContext;
use crate::output::render;

#[derive(Args, Debug)]
pub struct SuccessorArgs {
    #[arg(value_parser = parse_id)]
    pub id: ChoreId,

    /// Chore to pick up after `id` completes. Set once.
    #[arg(value_parser = parse_id)]
    pub successor: ChoreId,
}

#[derive(Debug, Serialize)]
struct SuccessorReport {
    id: ChoreId,
    successor_id: ChoreId,
}

/// # Errors
///
/// Unknown id, link already set, self-link, missing successor.
pub fn run_successor(args: &SuccessorArgs, ctx: &ProjectContext) -> Result<()> {
    let mut repo = ctx.open_repository()?;
    repo.set_successor(args.id, args.successor)
        .with_context(|| format!("failed to link {} -> {}", args.id, args.successor))?;

    let report = SuccessorReport {
        id: args.id,
        successor_id: args.successor,
    };
    render(ctx.output, &report, |r, w| {
        writeln!(w, "{}\t{}", r.id, r.successor_id)
    })
}
