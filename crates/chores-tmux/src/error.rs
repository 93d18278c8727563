use std::path::PathBuf;
use std::string::FromUtf8Error;

use chores_core::ErrorCode;

/// Failure invoking the tmux binary or reading its output.
#[derive(Debug, thiserror::Error)]
pub enum TmuxError {
    #[error("failed to spawn `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {status:?}: {}", .stderr.trim())]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("`{command}` wrote non-UTF-8 {stream}: {source}")]
    NonUtf8Output {
        command: String,
        stream: &'static str,
        #[source]
        source: FromUtf8Error,
    },

    #[error("`{command}` did not finish within {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    #[error("tmux binary not found (searched {} locations and PATH)", .searched.len())]
    BinaryNotFound { searched: Vec<PathBuf> },

    #[error("unexpected output from `{command}`: {line:?}")]
    Parse { command: String, line: String },
}

impl TmuxError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } | Self::BinaryNotFound { .. } => ErrorCode::MultiplexerMissing,
            Self::CommandFailed { .. }
            | Self::NonUtf8Output { .. }
            | Self::Timeout { .. }
            | Self::Parse { .. } => ErrorCode::MultiplexerCommandFailed,
        }
    }

    /// tmux reports a missing server, session, window or pane.
    ///
    /// Teardown treats these as "already gone".
    #[must_use]
    pub fn is_missing_target(&self) -> bool {
        let Self::CommandFailed { stderr, .. } = self else {
            return false;
        };
        let stderr = stderr.to_ascii_lowercase();
        ["no server running", "can't find", "no such", "error connecting", "session not found"]
            .iter()
            .any(|needle| stderr.contains(needle))
    }
}
