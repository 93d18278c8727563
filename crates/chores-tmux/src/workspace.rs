//! Worker windows and reviewer panes for chores.
//!
//! A chore owns at most one window, named by [`window_name`]. Pane 0 is the
//! worker; a second pane, titled `reviewer`, exists only while the chore
//! sits in a review phase. Windows are located by parsing names across all
//! sessions, so teardown works no matter which session created them and
//! never creates a session itself.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chores_core::config::TmuxConfig;
use chores_core::{Chore, ChoreId, ErrorCode, Role};
use serde::Serialize;
use tracing::{debug, info};

use crate::command::{Multiplexer, shell_single_quote};
use crate::error::TmuxError;
use crate::naming::{WindowLabel, parse_window_name, window_name};
use crate::session::{ResolvedSession, SessionResolutionError, SessionResolver};

const VERIFY_POLL: Duration = Duration::from_millis(50);
const WINDOW_FORMAT: &str = "#{session_name}:#{window_id}:#{window_active}:#{window_name}";
const PANE_FORMAT: &str = "#{pane_id}:#{pane_index}:#{pane_title}";

#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Session(#[from] SessionResolutionError),

    #[error(transparent)]
    Tmux(#[from] TmuxError),

    #[error("{surface} {target} not visible within {waited_ms}ms of creation")]
    NotVerified {
        surface: &'static str,
        target: String,
        waited_ms: u64,
    },
}

impl OrchestrationError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Session(e) => e.code(),
            Self::Tmux(e) => e.code(),
            Self::NotVerified { .. } => ErrorCode::SurfaceNotVerified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Session to use instead of ambient detection.
    pub session: Option<String>,
    /// Pause after creating a surface, before verifying it.
    pub settle_delay: Duration,
    pub verify_timeout: Duration,
    pub worker_command: Option<String>,
    pub reviewer_command: Option<String>,
    pub working_dir: Option<PathBuf>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from_config(&TmuxConfig::default())
    }
}

impl OrchestratorOptions {
    #[must_use]
    pub fn from_config(config: &TmuxConfig) -> Self {
        Self {
            session: config.session.clone(),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            verify_timeout: Duration::from_millis(config.verify_timeout_ms),
            worker_command: config.worker_command.clone(),
            reviewer_command: config.reviewer_command.clone(),
            working_dir: config.working_dir.clone(),
        }
    }
}

/// A live chore window as reported by tmux.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoreWindow {
    pub session: String,
    pub window_id: String,
    pub name: String,
    pub active: bool,
    pub label: WindowLabel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerWindow {
    pub session: String,
    pub window_id: String,
    pub name: String,
    /// False when the window already existed.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewerPane {
    pub window_id: String,
    pub pane_id: String,
    pub created: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupOutcome {
    Removed,
    AlreadyAbsent,
}

impl CleanupOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Removed => "removed",
            Self::AlreadyAbsent => "already_absent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PaneInfo {
    id: String,
    index: u32,
    title: String,
}

pub struct WorkspaceOrchestrator {
    tmux: Arc<dyn Multiplexer>,
    sessions: SessionResolver,
    options: OrchestratorOptions,
}

impl std::fmt::Debug for WorkspaceOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceOrchestrator")
            .field("binary", &self.tmux.binary())
            .field("sessions", &self.sessions)
            .field("options", &self.options)
            .finish()
    }
}

impl WorkspaceOrchestrator {
    pub fn new(tmux: Arc<dyn Multiplexer>, sessions: SessionResolver, options: OrchestratorOptions) -> Self {
        Self {
            tmux,
            sessions,
            options,
        }
    }

    #[must_use]
    pub const fn sessions(&self) -> &SessionResolver {
        &self.sessions
    }

    #[must_use]
    pub const fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        self.tmux.binary()
    }

    /// Resolve (and create if needed) the session new windows go into.
    ///
    /// # Errors
    ///
    /// See [`SessionResolver::resolve`].
    pub fn resolve_session(&self) -> Result<ResolvedSession, OrchestrationError> {
        Ok(self.sessions.resolve(self.options.session.as_deref())?)
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    /// Every chore window in every session. No tmux server means none.
    ///
    /// # Errors
    ///
    /// tmux failures and malformed listing lines.
    pub fn list_chore_windows(&self) -> Result<Vec<ChoreWindow>, OrchestrationError> {
        let output = match self.tmux.run_checked(&["list-windows", "-a", "-F", WINDOW_FORMAT]) {
            Ok(output) => output,
            Err(e) if e.is_missing_target() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut windows = Vec::new();
        for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
            let mut parts = line.splitn(4, ':');
            let (Some(session), Some(window_id), Some(active), Some(name)) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                return Err(TmuxError::Parse {
                    command: "list-windows -a".to_string(),
                    line: line.to_string(),
                }
                .into());
            };
            if let Some(label) = parse_window_name(name) {
                windows.push(ChoreWindow {
                    session: session.to_string(),
                    window_id: window_id.to_string(),
                    name: name.to_string(),
                    active: active == "1",
                    label,
                });
            }
        }
        Ok(windows)
    }

    /// # Errors
    ///
    /// As for [`Self::list_chore_windows`].
    pub fn find_window(&self, id: ChoreId) -> Result<Option<ChoreWindow>, OrchestrationError> {
        Ok(self
            .list_chore_windows()?
            .into_iter()
            .find(|w| w.label.chore_id == id))
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Open the chore's worker window, or return the one already open.
    ///
    /// The new window gets its context exported in pane 0, then the
    /// configured worker command.
    ///
    /// # Errors
    ///
    /// Session resolution, tmux failures, or a window that never appears.
    pub fn create_worker_window(&self, chore: &Chore) -> Result<WorkerWindow, OrchestrationError> {
        if let Some(existing) = self.find_window(chore.id())? {
            debug!(chore = %chore.id(), window = %existing.window_id, "worker window already open");
            return Ok(WorkerWindow {
                session: existing.session,
                window_id: existing.window_id,
                name: existing.name,
                created: false,
            });
        }

        let session = self.resolve_session()?;
        let name = window_name(chore.id(), chore.phase(), &chore.name);
        let target = format!("{}:", session.name);
        let working_dir = self.working_dir();
        let mut args = vec!["new-window", "-d", "-P", "-F", "#{window_id}", "-t", &target, "-n", &name];
        if let Some(dir) = &working_dir {
            args.extend(["-c", dir.as_str()]);
        }
        let output = self.tmux.run_checked(&args)?;
        let window_id = parse_created_id(&output.stdout, '@', "new-window")?;

        self.settle();
        let session_target = format!("={}", session.name);
        let visible = self.wait_until(|| {
            let listing = self
                .tmux
                .run_checked(&["list-windows", "-t", &session_target, "-F", "#{window_id}"])?;
            Ok(listing.stdout.lines().any(|l| l.trim() == window_id))
        })?;
        if !visible {
            return Err(self.not_verified("window", &window_id));
        }

        let worker = self
            .panes(&window_id)?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_verified("pane", &window_id))?;
        self.tmux
            .run_checked(&["select-pane", "-t", &worker.id, "-T", Role::Worker.as_str()])?;
        self.set_window_context(&window_id, chore)?;
        self.inject_context(&worker.id, chore, Role::Worker, self.options.worker_command.as_deref())?;

        info!(chore = %chore.id(), session = %session.name, window = %name, "opened worker window");
        Ok(WorkerWindow {
            session: session.name,
            window_id,
            name,
            created: true,
        })
    }

    /// Split a reviewer pane into the chore's window, opening the window
    /// first if it is missing. Returns the existing pane when present.
    ///
    /// # Errors
    ///
    /// As for [`Self::create_worker_window`].
    pub fn create_reviewer_pane(&self, chore: &Chore) -> Result<ReviewerPane, OrchestrationError> {
        let window = self.create_worker_window(chore)?;
        if let Some(existing) = reviewer_of(&self.panes(&window.window_id)?) {
            debug!(chore = %chore.id(), pane = %existing.id, "reviewer pane already open");
            return Ok(ReviewerPane {
                window_id: window.window_id,
                pane_id: existing.id,
                created: false,
            });
        }

        let working_dir = self.working_dir();
        let mut args = vec![
            "split-window",
            "-d",
            "-h",
            "-P",
            "-F",
            "#{pane_id}",
            "-t",
            window.window_id.as_str(),
        ];
        if let Some(dir) = &working_dir {
            args.extend(["-c", dir.as_str()]);
        }
        let output = self.tmux.run_checked(&args)?;
        let pane_id = parse_created_id(&output.stdout, '%', "split-window")?;

        self.settle();
        let visible = self.wait_until(|| Ok(self.panes(&window.window_id)?.iter().any(|p| p.id == pane_id)))?;
        if !visible {
            return Err(self.not_verified("pane", &pane_id));
        }

        self.tmux
            .run_checked(&["select-pane", "-t", &pane_id, "-T", Role::Reviewer.as_str()])?;
        self.inject_context(&pane_id, chore, Role::Reviewer, self.options.reviewer_command.as_deref())?;

        info!(chore = %chore.id(), window = %window.name, pane = %pane_id, "opened reviewer pane");
        Ok(ReviewerPane {
            window_id: window.window_id,
            pane_id,
            created: true,
        })
    }

    // -----------------------------------------------------------------------
    // Updates and teardown
    // -----------------------------------------------------------------------

    /// Rename the chore's window to match its current phase.
    ///
    /// Returns the window's name, or `None` when the chore has no window.
    ///
    /// # Errors
    ///
    /// tmux failures.
    pub fn rename_window(&self, chore: &Chore) -> Result<Option<String>, OrchestrationError> {
        let Some(window) = self.find_window(chore.id())? else {
            return Ok(None);
        };
        let name = window_name(chore.id(), chore.phase(), &chore.name);
        if window.name != name {
            self.tmux
                .run_checked(&["rename-window", "-t", &window.window_id, &name])?;
            debug!(chore = %chore.id(), from = %window.name, to = %name, "renamed window");
        }
        Ok(Some(name))
    }

    /// Refresh the `@chore_*` window options. Returns false without a window.
    ///
    /// # Errors
    ///
    /// tmux failures.
    pub fn update_context(&self, chore: &Chore) -> Result<bool, OrchestrationError> {
        let Some(window) = self.find_window(chore.id())? else {
            return Ok(false);
        };
        self.set_window_context(&window.window_id, chore)?;
        Ok(true)
    }

    /// # Errors
    ///
    /// tmux failures other than the pane already being gone.
    pub fn cleanup_reviewer_pane(&self, id: ChoreId) -> Result<CleanupOutcome, OrchestrationError> {
        let Some(window) = self.find_window(id)? else {
            return Ok(CleanupOutcome::AlreadyAbsent);
        };
        let Some(reviewer) = reviewer_of(&self.panes(&window.window_id)?) else {
            return Ok(CleanupOutcome::AlreadyAbsent);
        };
        let outcome = self.kill(&["kill-pane", "-t", &reviewer.id])?;
        debug!(chore = %id, pane = %reviewer.id, ?outcome, "reviewer pane cleanup");
        Ok(outcome)
    }

    /// # Errors
    ///
    /// tmux failures other than the window already being gone.
    pub fn cleanup_worker_window(&self, id: ChoreId) -> Result<CleanupOutcome, OrchestrationError> {
        let Some(window) = self.find_window(id)? else {
            return Ok(CleanupOutcome::AlreadyAbsent);
        };
        let outcome = self.kill(&["kill-window", "-t", &window.window_id])?;
        info!(chore = %id, window = %window.name, ?outcome, "worker window cleanup");
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn kill(&self, args: &[&str]) -> Result<CleanupOutcome, OrchestrationError> {
        match self.tmux.run_checked(args) {
            Ok(_) => Ok(CleanupOutcome::Removed),
            Err(e) if e.is_missing_target() => Ok(CleanupOutcome::AlreadyAbsent),
            Err(e) => Err(e.into()),
        }
    }

    fn panes(&self, window_id: &str) -> Result<Vec<PaneInfo>, TmuxError> {
        let output = self
            .tmux
            .run_checked(&["list-panes", "-t", window_id, "-F", PANE_FORMAT])?;
        let mut panes = Vec::new();
        for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
            let mut parts = line.splitn(3, ':');
            let parsed = match (parts.next(), parts.next().map(str::parse::<u32>)) {
                (Some(id), Some(Ok(index))) => Some(PaneInfo {
                    id: id.to_string(),
                    index,
                    title: parts.next().unwrap_or_default().to_string(),
                }),
                _ => None,
            };
            panes.push(parsed.ok_or_else(|| TmuxError::Parse {
                command: "list-panes".to_string(),
                line: line.to_string(),
            })?);
        }
        panes.sort_by_key(|p| p.index);
        Ok(panes)
    }

    fn set_window_context(&self, window_id: &str, chore: &Chore) -> Result<(), TmuxError> {
        let id = chore.id().to_string();
        let description = single_line(&chore.description);
        let pairs = [
            ("@chore_id", id.as_str()),
            ("@chore_name", chore.name.as_str()),
            ("@chore_phase", chore.phase().as_str()),
            ("@chore_description", description.as_str()),
        ];
        for (key, value) in pairs {
            self.tmux
                .run_checked(&["set-option", "-w", "-t", window_id, key, value])?;
        }
        Ok(())
    }

    /// Type an `export` of the chore context into `pane`, then `command`.
    fn inject_context(
        &self,
        pane: &str,
        chore: &Chore,
        role: Role,
        command: Option<&str>,
    ) -> Result<(), TmuxError> {
        let line = context_exports(chore, role);
        self.tmux.run_checked(&["send-keys", "-t", pane, "-l", &line])?;
        self.tmux.run_checked(&["send-keys", "-t", pane, "Enter"])?;
        if let Some(command) = command.filter(|c| !c.trim().is_empty()) {
            self.tmux.run_checked(&["send-keys", "-t", pane, "-l", command])?;
            self.tmux.run_checked(&["send-keys", "-t", pane, "Enter"])?;
        }
        Ok(())
    }

    fn working_dir(&self) -> Option<String> {
        self.options
            .working_dir
            .as_ref()
            .map(|d| d.to_string_lossy().into_owned())
    }

    fn settle(&self) {
        if !self.options.settle_delay.is_zero() {
            thread::sleep(self.options.settle_delay);
        }
    }

    fn wait_until(&self, mut check: impl FnMut() -> Result<bool, TmuxError>) -> Result<bool, TmuxError> {
        let timeout = self.options.verify_timeout;
        let start = Instant::now();
        loop {
            if check()? {
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            thread::sleep(VERIFY_POLL.min(timeout));
        }
    }

    fn not_verified(&self, surface: &'static str, target: &str) -> OrchestrationError {
        OrchestrationError::NotVerified {
            surface,
            target: target.to_string(),
            waited_ms: u64::try_from(self.options.verify_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// The pane titled `reviewer`, else the second pane by index.
fn reviewer_of(panes: &[PaneInfo]) -> Option<PaneInfo> {
    panes
        .iter()
        .find(|p| p.title == Role::Reviewer.as_str())
        .or_else(|| panes.get(1))
        .cloned()
}

fn parse_created_id(stdout: &str, sigil: char, command: &str) -> Result<String, TmuxError> {
    let id = stdout.trim();
    if id.starts_with(sigil) && id.len() > 1 {
        Ok(id.to_string())
    } else {
        Err(TmuxError::Parse {
            command: command.to_string(),
            line: id.to_string(),
        })
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// `export CHORE_ID='…' CHORE_NAME='…' …` for the given role.
#[must_use]
pub fn context_exports(chore: &Chore, role: Role) -> String {
    let vars = [
        ("CHORE_ID", chore.id().to_string()),
        ("CHORE_NAME", single_line(&chore.name)),
        ("CHORE_DESCRIPTION", single_line(&chore.description)),
        ("CHORE_PHASE", chore.phase().as_str().to_string()),
        ("CHORE_ROLE", role.as_str().to_string()),
    ];
    let assignments: Vec<String> = vars
        .iter()
        .map(|(key, value)| format!("{key}={}", shell_single_quote(value)))
        .collect();
    format!("export {}", assignments.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeTmux;
    use chores_core::Phase;
    use chores_core::model::ChoreRecord;

    fn chore(id: u64, name: &str, phase: Phase) -> Chore {
        Chore::from_record(ChoreRecord {
            id: ChoreId::new(id),
            name: name.to_string(),
            description: "it's\nmultiline".to_string(),
            phase,
            successor_id: None,
            progress_info: None,
            review_info: None,
            parent_id: None,
        })
    }

    fn orchestrator(fake: &Arc<FakeTmux>) -> WorkspaceOrchestrator {
        let sessions = SessionResolver::new(fake.clone(), "chore-dispatcher", Duration::from_millis(100))
            .with_ambient_detection(false);
        let options = OrchestratorOptions {
            settle_delay: Duration::ZERO,
            verify_timeout: Duration::from_millis(100),
            worker_command: Some("claude".to_string()),
            ..OrchestratorOptions::default()
        };
        WorkspaceOrchestrator::new(fake.clone(), sessions, options)
    }

    #[test]
    fn worker_window_is_created_once() {
        let fake = Arc::new(FakeTmux::new());
        let orch = orchestrator(&fake);
        let c = chore(42, "Implement login", Phase::Design);

        let first = orch.create_worker_window(&c).unwrap();
        assert!(first.created);
        assert_eq!(first.session, "chore-dispatcher");
        assert_eq!(first.name, "chore-42-design-implement-login");

        let second = orch.create_worker_window(&c).unwrap();
        assert!(!second.created);
        assert_eq!(second.window_id, first.window_id);
        assert_eq!(fake.count("new-window"), 1);

        let window = fake.window(&first.name).unwrap();
        assert_eq!(window.panes[0].title, "worker");
        assert_eq!(window.options.get("@chore_phase").map(String::as_str), Some("design"));
        assert_eq!(
            window.options.get("@chore_description").map(String::as_str),
            Some("it's multiline")
        );
        let typed = &window.panes[0].typed;
        assert!(typed[0].starts_with("export CHORE_ID='42' CHORE_NAME='Implement login'"));
        assert!(typed[0].ends_with("CHORE_ROLE='worker'"));
        assert_eq!(typed[1..], ["<Enter>", "claude", "<Enter>"]);
    }

    #[test]
    fn reviewer_pane_lifecycle() {
        let fake = Arc::new(FakeTmux::new().with_session("chore-dispatcher"));
        let orch = orchestrator(&fake);
        let c = chore(7, "Docs", Phase::DesignReview);

        let pane = orch.create_reviewer_pane(&c).unwrap();
        assert!(pane.created);
        let again = orch.create_reviewer_pane(&c).unwrap();
        assert!(!again.created);
        assert_eq!(again.pane_id, pane.pane_id);

        let window = fake.chore_window(7).unwrap();
        assert_eq!(window.panes.len(), 2);
        assert_eq!(window.panes[1].title, "reviewer");
        assert!(window.panes[1].typed[0].ends_with("CHORE_ROLE='reviewer'"));

        assert_eq!(orch.cleanup_reviewer_pane(c.id()).unwrap(), CleanupOutcome::Removed);
        assert_eq!(orch.cleanup_reviewer_pane(c.id()).unwrap(), CleanupOutcome::AlreadyAbsent);
        assert_eq!(fake.chore_window(7).unwrap().panes.len(), 1);
    }

    #[test]
    fn cleanup_is_idempotent_and_never_creates_sessions() {
        let fake = Arc::new(FakeTmux::new());
        let orch = orchestrator(&fake);
        let id = ChoreId::new(5);

        assert_eq!(orch.cleanup_worker_window(id).unwrap(), CleanupOutcome::AlreadyAbsent);
        assert_eq!(orch.cleanup_reviewer_pane(id).unwrap(), CleanupOutcome::AlreadyAbsent);
        assert_eq!(fake.count("new-session"), 0);

        orch.create_worker_window(&chore(5, "x", Phase::Work)).unwrap();
        assert_eq!(orch.cleanup_worker_window(id).unwrap(), CleanupOutcome::Removed);
        assert_eq!(orch.cleanup_worker_window(id).unwrap(), CleanupOutcome::AlreadyAbsent);
        assert!(fake.chore_window(5).is_none());
    }

    #[test]
    fn rename_follows_phase() {
        let fake = Arc::new(FakeTmux::new());
        let orch = orchestrator(&fake);
        assert_eq!(orch.rename_window(&chore(3, "Fix bug", Phase::Plan)).unwrap(), None);

        orch.create_worker_window(&chore(3, "Fix bug", Phase::Plan)).unwrap();
        let renamed = orch.rename_window(&chore(3, "Fix bug", Phase::PlanReview)).unwrap();
        assert_eq!(renamed.as_deref(), Some("chore-3-plan_review-fix-bug"));
        assert!(fake.window("chore-3-plan_review-fix-bug").is_some());

        assert!(orch.update_context(&chore(3, "Fix bug", Phase::PlanReview)).unwrap());
        let window = fake.chore_window(3).unwrap();
        assert_eq!(window.options.get("@chore_phase").map(String::as_str), Some("plan_review"));
    }

    #[test]
    fn window_that_never_appears_is_not_verified() {
        let fake = Arc::new(FakeTmux::new().with_session("chore-dispatcher"));
        fake.phantom_windows();
        let orch = orchestrator(&fake);
        let err = orch.create_worker_window(&chore(1, "a", Phase::Design)).unwrap_err();
        assert!(matches!(err, OrchestrationError::NotVerified { surface: "window", .. }), "{err:?}");
        assert_eq!(err.code(), ErrorCode::SurfaceNotVerified);
    }

    #[test]
    fn listing_failure_aborts_creation() {
        let fake = Arc::new(FakeTmux::new().with_session("chore-dispatcher"));
        fake.fail_on("list-windows");
        let orch = orchestrator(&fake);
        let err = orch.create_worker_window(&chore(1, "a", Phase::Design)).unwrap_err();
        assert!(matches!(err, OrchestrationError::Tmux(_)), "{err:?}");
        assert_eq!(fake.count("new-window"), 0);
    }

    #[test]
    fn listing_skips_foreign_windows() {
        let fake = Arc::new(FakeTmux::new().with_session("mixed"));
        let sessions = SessionResolver::new(fake.clone(), "chore-dispatcher", Duration::from_millis(100))
            .with_ambient_detection(false);
        let options = OrchestratorOptions {
            session: Some("mixed".to_string()),
            settle_delay: Duration::ZERO,
            verify_timeout: Duration::from_millis(100),
            ..OrchestratorOptions::default()
        };
        let orch = WorkspaceOrchestrator::new(fake.clone(), sessions, options);
        orch.create_worker_window(&chore(11, "one", Phase::Design)).unwrap();
        assert!(!fake.has_session("chore-dispatcher"));
        assert!(fake.window_names().iter().any(|n| n == "shell"));

        let windows = orch.list_chore_windows().unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].label.chore_id, ChoreId::new(11));
        assert_eq!(windows[0].session, "mixed");
    }

    #[test]
    fn exports_are_quoted() {
        let line = context_exports(&chore(9, "it's", Phase::Work), Role::Worker);
        assert!(line.contains(r#"CHORE_NAME='it'"'"'s'"#), "{line}");
        assert!(line.contains("CHORE_PHASE='work'"));
    }
}
