//! `chore init`: create `.chores/` with a default config and an empty store.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chores_core::config::{self, CHORES_DIR, ProjectConfig};
use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing `.chores/config.toml`.
    #[arg(long)]
    pub force: bool,

    /// Write `[tmux] enabled = false`.
    #[arg(long)]
    pub disable_tmux: bool,

    /// Pin the tmux session chores open their windows in.
    #[arg(long, value_name = "NAME")]
    pub session: Option<String>,
}

#[derive(Debug, Serialize)]
struct InitReport {
    root: PathBuf,
    config: PathBuf,
    active: PathBuf,
    archive: PathBuf,
    tmux_enabled: bool,
}

/// Execute `chore init`.
///
/// ```text
/// .chores/
///   config.toml
///   chores.jsonl            (empty active store)
/// ```
///
/// The archive file is created on first archival.
///
/// # Errors
///
/// `.chores/` already exists without `--force`, or a filesystem write fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let chores_dir = project_root.join(CHORES_DIR);
    if chores_dir.exists() && !args.force {
        anyhow::bail!(".chores/ already exists. Use `chore init --force` to reinitialize.");
    }

    let mut project = ProjectConfig::default();
    if args.disable_tmux {
        project.tmux.enabled = false;
    }
    project.tmux.session.clone_from(&args.session);

    let issues = config::validate(&project);
    if let Some(issue) = issues.first() {
        anyhow::bail!("{}: {}", issue.code, issue.message);
    }

    let config_path = config::save_project_config(project_root, &project)?;
    let store = project.store.open(project_root);
    let active = store.active_path().to_path_buf();
    if let Some(parent) = active.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    if !active.exists() {
        std::fs::write(&active, "")
            .with_context(|| format!("Failed to create {}", active.display()))?;
    }
    info!(root = %project_root.display(), "initialized chores project");

    let report = InitReport {
        root: project_root.to_path_buf(),
        config: config_path,
        archive: store.archive_path().to_path_buf(),
        active,
        tmux_enabled: project.tmux.enabled,
    };
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "initialized {}", r.root.display()),
        |r, w| {
            pretty_section(w, "Initialized chores project")?;
            pretty_kv(w, "Root", r.root.display().to_string())?;
            pretty_kv(w, "Config", r.config.display().to_string())?;
            pretty_kv(w, "Active", r.active.display().to_string())?;
            pretty_kv(w, "Archive", r.archive.display().to_string())?;
            pretty_kv(w, "Tmux", if r.tmux_enabled { "enabled" } else { "disabled" })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(force: bool) -> InitArgs {
        InitArgs {
            force,
            disable_tmux: true,
            session: Some("work".into()),
        }
    }

    #[test]
    fn init_writes_config_and_store() {
        let dir = TempDir::new().unwrap();
        run_init(&args(false), OutputMode::Json, dir.path()).unwrap();

        assert!(dir.path().join(".chores/chores.jsonl").is_file());
        let cfg = config::load_project_config(dir.path()).unwrap();
        assert!(!cfg.tmux.enabled);
        assert_eq!(cfg.tmux.session.as_deref(), Some("work"));
    }

    #[test]
    fn second_init_needs_force() {
        let dir = TempDir::new().unwrap();
        run_init(&args(false), OutputMode::Json, dir.path()).unwrap();
        std::fs::write(dir.path().join(".chores/chores.jsonl"), "keep\n").unwrap();

        assert!(run_init(&args(false), OutputMode::Json, dir.path()).is_err());
        run_init(&args(true), OutputMode::Json, dir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join(".chores/chores.jsonl")).unwrap(),
            "keep\n"
        );
    }
}
