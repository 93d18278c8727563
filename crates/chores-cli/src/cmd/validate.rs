//! `chore validate`: check that no chore sits in both stores.

use std::io::{self, Write};

use anyhow::Result;
use chores_core::integrity::LocationReport;
use clap::Args;

use crate::context::ProjectContext;
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ValidateArgs {}

pub(crate) fn write_report_pretty(report: &LocationReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Store integrity")?;
    pretty_kv(w, "Active", report.active_count.to_string())?;
    pretty_kv(w, "Completed", report.completed_count.to_string())?;
    pretty_kv(w, "In both", report.dual_location_count.to_string())?;
    pretty_kv(w, "Status", if report.valid { "ok" } else { "INVALID" })?;
    for issue in &report.issues {
        writeln!(w, "  - {issue}")?;
    }
    Ok(())
}

pub(crate) fn write_report_text(report: &LocationReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "{}\tactive={}\tcompleted={}\tdual={}",
        if report.valid { "ok" } else { "invalid" },
        report.active_count,
        report.completed_count,
        report.dual_location_count
    )?;
    for issue in &report.issues {
        writeln!(w, "{issue}")?;
    }
    Ok(())
}

/// Prints the report, then fails when it is invalid so scripts can branch
/// on the exit status.
///
/// # Errors
///
/// Store read failure, or an invalid report.
pub fn run_validate(_args: &ValidateArgs, ctx: &ProjectContext) -> Result<()> {
    let repo = ctx.open_repository()?;
    let report = repo.validate_integrity()?;
    render_mode(ctx.output, &report, write_report_text, write_report_pretty)?;
    report.into_result()?;
    Ok(())
}
