//! Picking the tmux session chore windows live in.
//!
//! Resolution order: an explicit name, then the session the caller is
//! already attached to, then the configured fallback. A missing explicit or
//! fallback session is created and polled until tmux reports it.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chores_core::ErrorCode;
use serde::Serialize;
use tracing::{debug, info};

use crate::command::Multiplexer;
use crate::error::TmuxError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    Explicit,
    Ambient,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSession {
    pub name: String,
    /// Shell command a human can paste to reach the session.
    pub attach_command: String,
    pub source: SessionSource,
    /// True when this call created the session.
    pub created: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionResolutionError {
    #[error("invalid session name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error(transparent)]
    Tmux(#[from] TmuxError),

    #[error("session {name:?} did not appear within {waited_ms}ms of being created")]
    NotCreated { name: String, waited_ms: u64 },
}

impl SessionResolutionError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidName { .. } => ErrorCode::InvalidSessionName,
            Self::Tmux(e) => e.code(),
            Self::NotCreated { .. } => ErrorCode::SessionUnavailable,
        }
    }
}

/// Reject names tmux would mangle or misread as a target.
///
/// # Errors
///
/// Returns [`SessionResolutionError::InvalidName`] with the first problem.
pub fn validate_session_name(name: &str) -> Result<(), SessionResolutionError> {
    let invalid = |reason| {
        Err(SessionResolutionError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };

    if name.trim().is_empty() {
        return invalid("name is empty");
    }
    if name.chars().any(char::is_whitespace) {
        return invalid("contains whitespace");
    }
    if name.chars().any(char::is_control) {
        return invalid("contains control characters");
    }
    if let Some(c) = name.chars().find(|c| matches!(c, ':' | '.' | '/' | '*' | '=')) {
        return match c {
            ':' => invalid("contains ':' (tmux target separator)"),
            '.' => invalid("contains '.' (tmux pane separator)"),
            '/' => invalid("contains '/'"),
            '*' => invalid("contains '*'"),
            _ => invalid("contains '='"),
        };
    }
    Ok(())
}

pub struct SessionResolver {
    tmux: Arc<dyn Multiplexer>,
    fallback: String,
    verify_timeout: Duration,
    inside_tmux: bool,
}

impl std::fmt::Debug for SessionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionResolver")
            .field("fallback", &self.fallback)
            .field("verify_timeout", &self.verify_timeout)
            .field("inside_tmux", &self.inside_tmux)
            .finish_non_exhaustive()
    }
}

impl SessionResolver {
    /// Ambient detection follows the `TMUX` environment variable.
    pub fn new(tmux: Arc<dyn Multiplexer>, fallback: impl Into<String>, verify_timeout: Duration) -> Self {
        Self {
            tmux,
            fallback: fallback.into(),
            verify_timeout,
            inside_tmux: std::env::var_os("TMUX").is_some(),
        }
    }

    #[must_use]
    pub const fn with_ambient_detection(mut self, inside_tmux: bool) -> Self {
        self.inside_tmux = inside_tmux;
        self
    }

    #[must_use]
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Resolve a session, creating it when needed.
    ///
    /// An invalid explicit name fails before tmux is invoked.
    ///
    /// # Errors
    ///
    /// Invalid names, tmux failures, or a created session that never shows up.
    pub fn resolve(&self, explicit: Option<&str>) -> Result<ResolvedSession, SessionResolutionError> {
        if let Some(name) = explicit {
            validate_session_name(name)?;
            return self.ensure(name, SessionSource::Explicit);
        }

        if let Some(name) = self.ambient_session()? {
            debug!(session = %name, "using ambient tmux session");
            return Ok(self.resolved(name, SessionSource::Ambient, false));
        }

        validate_session_name(&self.fallback)?;
        self.ensure(&self.fallback, SessionSource::Fallback)
    }

    /// Name of a session that already exists, without creating anything.
    ///
    /// # Errors
    ///
    /// Invalid explicit names and tmux failures other than "no server".
    pub fn existing_session(&self, explicit: Option<&str>) -> Result<Option<String>, SessionResolutionError> {
        if let Some(name) = explicit {
            validate_session_name(name)?;
            return Ok(self.session_exists(name)?.then(|| name.to_string()));
        }
        if let Some(name) = self.ambient_session()? {
            return Ok(Some(name));
        }
        Ok(self.session_exists(&self.fallback)?.then(|| self.fallback.clone()))
    }

    /// # Errors
    ///
    /// Spawn or timeout failures; a non-zero exit just means "no".
    pub fn session_exists(&self, name: &str) -> Result<bool, TmuxError> {
        let target = format!("={name}");
        Ok(self.tmux.run(&["has-session", "-t", &target])?.success())
    }

    fn ambient_session(&self) -> Result<Option<String>, TmuxError> {
        if !self.inside_tmux {
            return Ok(None);
        }
        let output = self.tmux.run(&["display-message", "-p", "#{session_name}"])?;
        if !output.success() {
            debug!(stderr = %output.stderr.trim(), "ambient session query failed");
            return Ok(None);
        }
        let name = output.stdout.trim();
        if name.is_empty() || !self.session_exists(name)? {
            return Ok(None);
        }
        Ok(Some(name.to_string()))
    }

    fn ensure(&self, name: &str, source: SessionSource) -> Result<ResolvedSession, SessionResolutionError> {
        if self.session_exists(name)? {
            return Ok(self.resolved(name.to_string(), source, false));
        }

        let output = self.tmux.run(&["new-session", "-d", "-s", name])?;
        if !output.success() {
            // Another process may have won the race; verification decides.
            debug!(session = %name, stderr = %output.stderr.trim(), "new-session reported failure");
        }

        let start = Instant::now();
        loop {
            if self.session_exists(name)? {
                info!(session = %name, "created tmux session");
                return Ok(self.resolved(name.to_string(), source, true));
            }
            if start.elapsed() >= self.verify_timeout {
                return Err(SessionResolutionError::NotCreated {
                    name: name.to_string(),
                    waited_ms: u64::try_from(self.verify_timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            thread::sleep(POLL_INTERVAL.min(self.verify_timeout));
        }
    }

    fn resolved(&self, name: String, source: SessionSource, created: bool) -> ResolvedSession {
        ResolvedSession {
            attach_command: attach_command(&name, self.inside_tmux),
            name,
            source,
            created,
        }
    }
}

/// `switch-client` from inside tmux, `attach-session` from outside.
#[must_use]
pub fn attach_command(session: &str, inside_tmux: bool) -> String {
    let verb = if inside_tmux { "switch-client" } else { "attach-session" };
    format!("tmux {verb} -t {session}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeTmux;

    fn resolver(fake: &Arc<FakeTmux>) -> SessionResolver {
        SessionResolver::new(fake.clone(), "chore-dispatcher", Duration::from_millis(100))
            .with_ambient_detection(false)
    }

    #[test]
    fn invalid_explicit_name_never_reaches_tmux() {
        let fake = Arc::new(FakeTmux::new());
        for bad in ["", "  ", "has space", "a:b", "a.b", "a/b", "a*", "tab\tname"] {
            let err = resolver(&fake).resolve(Some(bad)).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidSessionName, "{bad:?}");
        }
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn explicit_session_is_created_and_verified() {
        let fake = Arc::new(FakeTmux::new());
        let resolved = resolver(&fake).resolve(Some("work")).unwrap();
        assert_eq!(resolved.name, "work");
        assert_eq!(resolved.source, SessionSource::Explicit);
        assert!(resolved.created);
        assert_eq!(resolved.attach_command, "tmux attach-session -t work");
        assert!(fake.has_session("work"));

        let again = resolver(&fake).resolve(Some("work")).unwrap();
        assert!(!again.created);
        assert_eq!(fake.count("new-session"), 1);
    }

    #[test]
    fn ambient_session_wins_over_fallback() {
        let fake = Arc::new(FakeTmux::new().with_session("mine"));
        fake.set_ambient(Some("mine"));
        let resolved = resolver(&fake)
            .with_ambient_detection(true)
            .resolve(None)
            .unwrap();
        assert_eq!(resolved.source, SessionSource::Ambient);
        assert_eq!(resolved.name, "mine");
        assert_eq!(resolved.attach_command, "tmux switch-client -t mine");
        assert!(!fake.has_session("chore-dispatcher"));
    }

    #[test]
    fn falls_back_when_not_inside_tmux() {
        let fake = Arc::new(FakeTmux::new());
        fake.set_ambient(Some("ignored"));
        let resolved = resolver(&fake).resolve(None).unwrap();
        assert_eq!(resolved.source, SessionSource::Fallback);
        assert_eq!(resolved.name, "chore-dispatcher");
        assert!(resolved.created);
        assert_eq!(fake.count("display-message"), 0);
    }

    #[test]
    fn silent_creation_failure_is_reported() {
        let fake = Arc::new(FakeTmux::new());
        fake.ignore_session_creation();
        let err = resolver(&fake).resolve(Some("ghost")).unwrap_err();
        assert!(matches!(err, SessionResolutionError::NotCreated { ref name, .. } if name == "ghost"));
        assert_eq!(err.code(), ErrorCode::SessionUnavailable);
    }

    #[test]
    fn existing_session_never_creates() {
        let fake = Arc::new(FakeTmux::new());
        assert_eq!(resolver(&fake).existing_session(None).unwrap(), None);
        assert_eq!(resolver(&fake).existing_session(Some("x")).unwrap(), None);
        assert_eq!(fake.count("new-session"), 0);

        let fake = Arc::new(FakeTmux::new().with_session("chore-dispatcher"));
        assert_eq!(
            resolver(&fake).existing_session(None).unwrap().as_deref(),
            Some("chore-dispatcher")
        );
    }
}
