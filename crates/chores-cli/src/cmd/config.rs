//! `chore config`: the effective configuration and any problems with it.

use std::path::Path;

use anyhow::Result;
use chores_core::config::{self, ConfigIssue, EffectiveConfig};
use clap::Args;
use serde::Serialize;

use crate::output::{OutputMode, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ConfigArgs {}

#[derive(Debug, Serialize)]
struct ConfigReport<'a> {
    path: String,
    #[serde(flatten)]
    effective: &'a EffectiveConfig,
    issues: Vec<ConfigIssue>,
}

/// Works on invalid configs too; that is what it is for.
///
/// # Errors
///
/// The config file cannot be read or parsed.
pub fn run_config(_args: &ConfigArgs, json: bool, project_root: &Path) -> Result<()> {
    let effective = config::resolve_config(project_root, json)?;
    let output = OutputMode::from_name(&effective.resolved_output);
    let report = ConfigReport {
        path: config::config_path(project_root).display().to_string(),
        issues: config::validate(&effective.project),
        effective: &effective,
    };

    render_mode(
        output,
        &report,
        |r, w| {
            if r.issues.is_empty() {
                return writeln!(w, "ok\t{}", r.path);
            }
            for issue in &r.issues {
                writeln!(w, "{}\t{}", issue.code, issue.message)?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, &r.path)?;
            let body = toml::to_string_pretty(&r.effective.project).map_err(std::io::Error::other)?;
            write!(w, "{body}")?;
            writeln!(w)?;
            writeln!(w, "output = {:?}", r.effective.resolved_output)?;
            if r.issues.is_empty() {
                writeln!(w, "no issues")
            } else {
                for issue in &r.issues {
                    writeln!(w, "! {}: {}", issue.code, issue.message)?;
                }
                Ok(())
            }
        },
    )
}
