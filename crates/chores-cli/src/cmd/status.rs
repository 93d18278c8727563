//! `chore status`: per-phase counts, compact enough for a tmux status line.

use anyhow::Result;
use chores_core::Phase;
use chores_core::repository::StatusSummary;
use clap::Args;
use serde::Serialize;

use crate::context::ProjectContext;
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct StatusArgs {}

#[derive(Debug, Serialize)]
struct StatusReport {
    total: usize,
    summary: String,
    #[serde(flatten)]
    counts: StatusSummary,
}

/// # Errors
///
/// Store read failure.
pub fn run_status(_args: &StatusArgs, ctx: &ProjectContext) -> Result<()> {
    let repo = ctx.open_repository()?;
    let counts = repo.status_summary();
    let report = StatusReport {
        total: counts.total(),
        summary: counts.to_string(),
        counts,
    };

    render_mode(
        ctx.output,
        &report,
        |r, w| writeln!(w, "{}", r.summary),
        |r, w| {
            pretty_section(w, "Active chores by phase")?;
            for phase in Phase::ALL {
                let n = r.counts.counts.get(&phase).copied().unwrap_or(0);
                if n > 0 {
                    writeln!(w, "{:<14} {:>4}", phase.as_str(), n)?;
                }
            }
            writeln!(w, "{:<14} {:>4}", "total", r.total)
        },
    )
}
