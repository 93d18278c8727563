//! `chore repair`: drop archived chores from the active store.

use anyhow::{Context as _, Result};
use chores_core::repository::RepairReport;
use clap::Args;

use crate::cmd::validate::{write_report_pretty, write_report_text};
use crate::context::ProjectContext;
use crate::output::{pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct RepairArgs {}

/// # Errors
///
/// Store read or write failure.
pub fn run_repair(_args: &RepairArgs, ctx: &ProjectContext) -> Result<()> {
    let mut repo = ctx.open_repository()?;
    let report: RepairReport = repo.repair().context("repair failed")?;

    render_mode(
        ctx.output,
        &report,
        |r, w| {
            writeln!(w, "cleaned\t{}", r.cleanup.cleaned_count)?;
            write_report_text(&r.validation, w)
        },
        |r, w| {
            pretty_kv(w, "Cleaned", r.cleanup.cleaned_count.to_string())?;
            pretty_kv(w, "Remaining", r.cleanup.remaining_active.to_string())?;
            writeln!(w)?;
            write_report_pretty(&r.validation, w)
        },
    )
}
