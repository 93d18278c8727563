use std::fmt;

use crate::id::IdError;
use crate::integrity::ValidationError;
use crate::model::ChoreId;
use crate::store::StoreError;
use crate::transition::TransitionError;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    ChoreNotFound,
    ParentNotFound,
    InvalidTransition,
    ChildrenIncomplete,
    NotRejectable,
    SuccessorConflict,
    WrongPhase,
    IntegrityViolation,
    StoreCorrupt,
    StoreWriteFailed,
    ClockMovedBackwards,
    MultiplexerMissing,
    InvalidSessionName,
    SessionUnavailable,
    SurfaceNotVerified,
    MultiplexerCommandFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ChoreNotFound => "E2001",
            Self::ParentNotFound => "E2002",
            Self::InvalidTransition => "E2003",
            Self::ChildrenIncomplete => "E2004",
            Self::NotRejectable => "E2005",
            Self::SuccessorConflict => "E2006",
            Self::WrongPhase => "E3001",
            Self::IntegrityViolation => "E3002",
            Self::StoreCorrupt => "E3003",
            Self::StoreWriteFailed => "E5001",
            Self::ClockMovedBackwards => "E5002",
            Self::MultiplexerMissing => "E6001",
            Self::InvalidSessionName => "E6002",
            Self::SessionUnavailable => "E6003",
            Self::SurfaceNotVerified => "E6004",
            Self::MultiplexerCommandFailed => "E6005",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Chore store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::ChoreNotFound => "Chore not found",
            Self::ParentNotFound => "Parent chore not found",
            Self::InvalidTransition => "Invalid phase transition",
            Self::ChildrenIncomplete => "Child chores are not finished",
            Self::NotRejectable => "Chore is not under review",
            Self::SuccessorConflict => "Successor link rejected",
            Self::WrongPhase => "Operation not allowed in this phase",
            Self::IntegrityViolation => "Active/archive integrity violated",
            Self::StoreCorrupt => "Chore store record is corrupt",
            Self::StoreWriteFailed => "Chore store write failed",
            Self::ClockMovedBackwards => "System clock moved backwards",
            Self::MultiplexerMissing => "tmux binary not found",
            Self::InvalidSessionName => "Invalid tmux session name",
            Self::SessionUnavailable => "tmux session unavailable",
            Self::SurfaceNotVerified => "tmux window or pane could not be verified",
            Self::MultiplexerCommandFailed => "tmux command failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `chore init` to create the .chores directory."),
            Self::ConfigParseError => Some("Fix syntax in .chores/config.toml and retry."),
            Self::ChoreNotFound | Self::ParentNotFound => {
                Some("Run `chore list` to see active chores.")
            }
            Self::InvalidTransition => Some(
                "Advance one phase at a time: design -> design_review -> design_ready -> plan -> \
                 plan_review -> plan_ready -> work -> work_review -> work_done.",
            ),
            Self::ChildrenIncomplete => Some("Finish every child chore before advancing the parent."),
            Self::NotRejectable => Some("Only chores in a *_review phase can be rejected."),
            Self::SuccessorConflict => None,
            Self::WrongPhase => None,
            Self::IntegrityViolation | Self::StoreCorrupt => {
                Some("Reload from the store, then run `chore repair`.")
            }
            Self::StoreWriteFailed => Some("Check disk space and write permissions."),
            Self::ClockMovedBackwards => Some("Wait for the system clock to catch up and retry."),
            Self::MultiplexerMissing => {
                Some("Install tmux or set [tmux].binary in .chores/config.toml.")
            }
            Self::InvalidSessionName => {
                Some("Session names may not contain spaces, '/', '*', ':', '.' or control characters.")
            }
            Self::SessionUnavailable | Self::SurfaceNotVerified => {
                Some("Check `tmux ls`; workspace surfaces can be recreated by re-running the phase hook.")
            }
            Self::MultiplexerCommandFailed => Some("Run with CHORES_LOG=debug to see the tmux invocation."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error returned by [`crate::repository::Repository`] and
/// [`crate::lifecycle::LifecycleManager`] operations.
///
/// After a `Store` or `Validation` failure from a phase change the in-memory
/// set and the store files may disagree; reload before retrying.
#[derive(Debug, thiserror::Error)]
pub enum ChoreError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error("chore {0} not found")]
    NotFound(ChoreId),

    #[error("parent chore {0} not found")]
    ParentNotFound(ChoreId),

    #[error("chore {id}: cannot link successor {successor}: {reason}")]
    SuccessorConflict {
        id: ChoreId,
        successor: ChoreId,
        reason: &'static str,
    },
}

impl ChoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Transition(e) => e.code(),
            Self::Validation(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Id(e) => e.code(),
            Self::NotFound(_) => ErrorCode::ChoreNotFound,
            Self::ParentNotFound(_) => ErrorCode::ParentNotFound,
            Self::SuccessorConflict { .. } => ErrorCode::SuccessorConflict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChoreError, ErrorCode};
    use crate::model::{ChoreId, Phase};
    use crate::transition::TransitionError;
    use std::collections::HashSet;

    const ALL: [ErrorCode; 19] = [
        ErrorCode::NotInitialized,
        ErrorCode::ConfigParseError,
        ErrorCode::ChoreNotFound,
        ErrorCode::ParentNotFound,
        ErrorCode::InvalidTransition,
        ErrorCode::ChildrenIncomplete,
        ErrorCode::NotRejectable,
        ErrorCode::SuccessorConflict,
        ErrorCode::WrongPhase,
        ErrorCode::IntegrityViolation,
        ErrorCode::StoreCorrupt,
        ErrorCode::StoreWriteFailed,
        ErrorCode::ClockMovedBackwards,
        ErrorCode::MultiplexerMissing,
        ErrorCode::InvalidSessionName,
        ErrorCode::SessionUnavailable,
        ErrorCode::SurfaceNotVerified,
        ErrorCode::MultiplexerCommandFailed,
        ErrorCode::InternalUnexpected,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let rendered = code.code();
            assert_eq!(rendered.len(), 5);
            assert!(rendered.starts_with('E'));
            assert!(rendered.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn chore_error_delegates_codes() {
        let err: ChoreError = TransitionError::ChildrenIncomplete {
            id: ChoreId::new(1),
            pending: vec![ChoreId::new(2)],
        }
        .into();
        assert_eq!(err.code(), ErrorCode::ChildrenIncomplete);
        assert_eq!(err.to_string(), "chore 1: 1 child chore(s) not finished");

        let err: ChoreError = TransitionError::NotAllowed {
            id: ChoreId::new(1),
            from: Phase::Design,
            to: Phase::Plan,
            reason: "phases cannot be skipped",
        }
        .into();
        assert_eq!(err.code().code(), "E2003");
        assert_eq!(ChoreError::NotFound(ChoreId::new(9)).code(), ErrorCode::ChoreNotFound);
    }

    #[test]
    fn display_matches_code() {
        assert_eq!(ErrorCode::IntegrityViolation.to_string(), "E3002");
    }
}
