//! Per-invocation wiring: project root, effective config, repository and
//! (when enabled) the tmux hooks.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use chores_core::config::{self, CHORES_DIR, EffectiveConfig};
use chores_core::id::IdGenerator;
use chores_core::store::ChoreStore;
use chores_core::{ErrorCode, Repository};
use chores_tmux::binary::locate_tmux;
use chores_tmux::{LifecycleHooks, OrchestratorOptions, SessionResolver, TmuxCli, WorkspaceOrchestrator};
use tracing::{debug, warn};

use crate::output::OutputMode;

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("no .chores/ directory in {} or any parent", .start.display())]
    NotInitialized { start: PathBuf },

    #[error("invalid configuration: {}", .issues.join("; "))]
    InvalidConfig { issues: Vec<String> },

    #[error("tmux integration is disabled (see [tmux].enabled in .chores/config.toml, or --no-tmux)")]
    TmuxDisabled,
}

impl ContextError {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::InvalidConfig { .. } => ErrorCode::ConfigParseError,
            Self::TmuxDisabled => ErrorCode::MultiplexerMissing,
        }
    }
}

/// Walk up from `start` to the first directory holding `.chores/`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CHORES_DIR).is_dir())
        .map(Path::to_path_buf)
}

#[derive(Debug)]
pub struct ProjectContext {
    pub root: PathBuf,
    pub config: EffectiveConfig,
    pub output: OutputMode,
    pub quiet: bool,
    tmux_allowed: bool,
}

impl ProjectContext {
    /// Locate the project and load its configuration.
    ///
    /// # Errors
    ///
    /// No `.chores/` directory, unreadable or invalid config.
    pub fn discover(root: Option<&Path>, cwd: &Path, flags: &GlobalFlags) -> Result<Self> {
        let root = match root {
            Some(root) => root.to_path_buf(),
            None => find_project_root(cwd).ok_or_else(|| ContextError::NotInitialized {
                start: cwd.to_path_buf(),
            })?,
        };
        if !root.join(CHORES_DIR).is_dir() {
            return Err(ContextError::NotInitialized { start: root }.into());
        }

        let config = config::resolve_config(&root, flags.json)?;
        let issues: Vec<String> = config::validate(&config.project)
            .into_iter()
            .map(|issue| format!("{}: {}", issue.code, issue.message))
            .collect();
        if !issues.is_empty() {
            return Err(ContextError::InvalidConfig { issues }.into());
        }

        debug!(root = %root.display(), output = %config.resolved_output, "project context");
        Ok(Self {
            output: OutputMode::from_name(&config.resolved_output),
            root,
            config,
            quiet: flags.quiet,
            tmux_allowed: !flags.no_tmux,
        })
    }

    pub fn store(&self) -> ChoreStore {
        self.config.project.store.open(&self.root)
    }

    /// Repository without workspace hooks, for read-only commands.
    ///
    /// # Errors
    ///
    /// Bad node id or unreadable store.
    pub fn open_repository(&self) -> Result<Repository> {
        let ids = IdGenerator::new(self.config.project.ids.node_id)
            .context("invalid [ids].node_id")?;
        Repository::open(self.store(), Arc::new(ids)).context("failed to load chore store")
    }

    /// Repository with tmux hooks attached when tmux is enabled and found.
    ///
    /// A missing tmux binary is logged and the repository runs without hooks.
    ///
    /// # Errors
    ///
    /// As for [`Self::open_repository`].
    pub fn open_repository_with_hooks(&self) -> Result<Repository> {
        let repo = self.open_repository()?;
        if !self.tmux_enabled() {
            return Ok(repo);
        }
        match self.orchestrator() {
            Ok(orchestrator) => Ok(repo.with_observer(Box::new(LifecycleHooks::new(orchestrator)))),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "tmux unavailable; workspace hooks disabled");
                Ok(repo)
            }
        }
    }

    pub fn tmux_enabled(&self) -> bool {
        self.tmux_allowed && self.config.project.tmux.enabled
    }

    /// Build the orchestrator from `[tmux]` config.
    ///
    /// # Errors
    ///
    /// tmux disabled, or the binary cannot be found.
    pub fn orchestrator(&self) -> Result<WorkspaceOrchestrator> {
        if !self.tmux_enabled() {
            return Err(ContextError::TmuxDisabled.into());
        }
        let tmux_config = &self.config.project.tmux;
        let binary = locate_tmux(tmux_config.binary.as_deref())?;
        let tmux = Arc::new(TmuxCli::new(
            binary,
            Duration::from_millis(tmux_config.query_timeout_ms),
        ));
        let sessions = SessionResolver::new(
            tmux.clone(),
            tmux_config.default_session.clone(),
            Duration::from_millis(tmux_config.verify_timeout_ms),
        );
        let mut options = OrchestratorOptions::from_config(tmux_config);
        if let Some(dir) = options.working_dir.take() {
            options.working_dir = Some(if dir.is_absolute() { dir } else { self.root.join(dir) });
        }
        Ok(WorkspaceOrchestrator::new(tmux, sessions, options))
    }

    /// Print accumulated hook failures to stderr unless `--quiet`.
    pub fn report_hook_failures(&self, repo: &mut Repository) {
        let failures = repo.take_hook_failures();
        if self.quiet {
            return;
        }
        for failure in failures {
            if self.output.is_json() {
                eprintln!("{}", serde_json::json!({ "warning": failure }));
            } else {
                eprintln!("warning: {failure}");
            }
        }
    }
}

/// Global flags shared by every subcommand.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalFlags {
    pub json: bool,
    pub quiet: bool,
    pub no_tmux: bool,
}
