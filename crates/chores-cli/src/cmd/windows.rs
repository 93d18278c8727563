//! `chore windows`: compare live tmux windows with the active set.
//!
//! Hook failures are never retried, so tmux and the store can drift apart.
//! This is the pass that brings them back: `--prune` closes windows of
//! chores that are gone and renames windows whose phase is out of date,
//! `--open` opens the surfaces of chores that have none.

use std::collections::BTreeSet;
use std::io::{self, Write};

use anyhow::{Context as _, Result};
use chores_core::{Chore, ChoreId, Role};
use chores_tmux::{OrchestrationError, WorkspaceOrchestrator};
use chores_tmux::naming::window_name;
use chores_tmux::workspace::ChoreWindow;
use clap::Args;
use serde::Serialize;
use tracing::warn;

use crate::context::ProjectContext;
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct WindowsArgs {
    /// Close stale windows and rename out-of-date ones.
    #[arg(long)]
    pub prune: bool,

    /// Open windows (and reviewer panes) for chores that have none.
    #[arg(long)]
    pub open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    Current,
    /// Chore is active but the name carries another phase or slug.
    Outdated,
    /// No active chore with this id.
    Stale,
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowEntry {
    #[serde(flatten)]
    pub window: ChoreWindow,
    pub state: WindowState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_name: Option<String>,
    /// What `--prune` did with it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowsReport {
    pub windows: Vec<WindowEntry>,
    /// Active chores without a window.
    pub missing: Vec<ChoreId>,
    /// Chores `--open` opened a window for.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opened: Vec<ChoreId>,
}

/// Classify every chore window against the active chores.
pub fn audit(windows: Vec<ChoreWindow>, active: &[&Chore]) -> WindowsReport {
    let mut seen = BTreeSet::new();
    let entries = windows
        .into_iter()
        .map(|window| {
            let chore = active.iter().find(|c| c.id() == window.label.chore_id);
            let (state, expected_name) = match chore {
                None => (WindowState::Stale, None),
                Some(chore) => {
                    seen.insert(chore.id());
                    let expected = window_name(chore.id(), chore.phase(), &chore.name);
                    if expected == window.name {
                        (WindowState::Current, None)
                    } else {
                        (WindowState::Outdated, Some(expected))
                    }
                }
            };
            WindowEntry {
                window,
                state,
                expected_name,
                action: None,
            }
        })
        .collect();

    let missing = active
        .iter()
        .map(|c| c.id())
        .filter(|id| !seen.contains(id))
        .collect();

    WindowsReport {
        windows: entries,
        missing,
        opened: Vec::new(),
    }
}

/// Apply `--prune`: close stale windows, rename outdated ones.
///
/// Individual failures are recorded on the entry and logged; the pass
/// carries on with the rest.
pub fn prune(orchestrator: &WorkspaceOrchestrator, report: &mut WindowsReport, active: &[&Chore]) {
    for entry in &mut report.windows {
        let id = entry.window.label.chore_id;
        let result = match entry.state {
            WindowState::Current => continue,
            WindowState::Stale => orchestrator
                .cleanup_worker_window(id)
                .map(|outcome| format!("closed ({})", outcome.as_str())),
            WindowState::Outdated => {
                let Some(chore) = active.iter().find(|c| c.id() == id) else {
                    continue;
                };
                sync_surfaces(orchestrator, chore).map(|()| "renamed".to_string())
            }
        };
        entry.action = Some(match result {
            Ok(action) => action,
            Err(e) => {
                warn!(chore = %id, error = %e, "window prune failed");
                format!("failed: {e}")
            }
        });
    }
}

/// Apply `--open`: a worker window for every chore without one, plus the
/// reviewer pane when the chore is under review.
pub fn open_missing(orchestrator: &WorkspaceOrchestrator, report: &mut WindowsReport, active: &[&Chore]) {
    for id in &report.missing {
        let Some(chore) = active.iter().find(|c| c.id() == *id) else {
            continue;
        };
        let result = match chore.phase().role() {
            Role::Worker => orchestrator.create_worker_window(chore).map(|_| ()),
            Role::Reviewer => orchestrator.create_reviewer_pane(chore).map(|_| ()),
        };
        match result {
            Ok(()) => report.opened.push(*id),
            Err(e) => warn!(chore = %id, error = %e, "failed to open chore window"),
        }
    }
}

fn sync_surfaces(
    orchestrator: &WorkspaceOrchestrator,
    chore: &Chore,
) -> Result<(), OrchestrationError> {
    orchestrator.rename_window(chore)?;
    orchestrator.update_context(chore)?;
    match chore.phase().role() {
        Role::Reviewer => orchestrator.create_reviewer_pane(chore).map(|_| ()),
        Role::Worker => orchestrator.cleanup_reviewer_pane(chore.id()).map(|_| ()),
    }
}

/// # Errors
///
/// tmux disabled or missing, or the window listing fails.
pub fn run_windows(args: &WindowsArgs, ctx: &ProjectContext) -> Result<()> {
    let orchestrator = ctx.orchestrator()?;
    let repo = ctx.open_repository()?;
    let active = repo.list_all();

    let windows = orchestrator
        .list_chore_windows()
        .context("failed to list tmux windows")?;
    let mut report = audit(windows, &active);
    if args.prune {
        prune(&orchestrator, &mut report, &active);
    }
    if args.open {
        open_missing(&orchestrator, &mut report, &active);
    }

    render_mode(ctx.output, &report, write_text, write_pretty)
}

const fn state_label(state: WindowState) -> &'static str {
    match state {
        WindowState::Current => "current",
        WindowState::Outdated => "outdated",
        WindowState::Stale => "stale",
    }
}

fn write_text(report: &WindowsReport, w: &mut dyn Write) -> io::Result<()> {
    for entry in &report.windows {
        writeln!(
            w,
            "{}\t{}\t{}:{}\t{}",
            entry.window.label.chore_id,
            state_label(entry.state),
            entry.window.session,
            entry.window.window_id,
            entry.window.name
        )?;
    }
    for id in &report.missing {
        writeln!(w, "{id}\tmissing")?;
    }
    Ok(())
}

fn write_pretty(report: &WindowsReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Chore windows")?;
    if report.windows.is_empty() {
        writeln!(w, "(none)")?;
    }
    for entry in &report.windows {
        let marker = if entry.window.active { "*" } else { " " };
        write!(
            w,
            "{marker} {:<10} {:<16} {}",
            state_label(entry.state),
            entry.window.session,
            entry.window.name
        )?;
        if let Some(expected) = &entry.expected_name {
            write!(w, "  -> {expected}")?;
        }
        if let Some(action) = &entry.action {
            write!(w, "  [{action}]")?;
        }
        writeln!(w)?;
    }
    if !report.missing.is_empty() {
        writeln!(w)?;
        let ids: Vec<String> = report.missing.iter().map(ToString::to_string).collect();
        writeln!(w, "No window: {}", ids.join(", "))?;
    }
    if !report.opened.is_empty() {
        let ids: Vec<String> = report.opened.iter().map(ToString::to_string).collect();
        writeln!(w, "Opened:    {}", ids.join(", "))?;
    }
    Ok(())
}
