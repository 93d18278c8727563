//! Shared output layer for pretty/text/JSON parity across all commands.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--json`
//! 2. `FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. `output` in the user config
//! 4. Default: [`OutputMode::Pretty`] on a TTY, [`OutputMode::Text`] when piped.
//!
//! The resolution itself lives in `chores_core::config::resolve_config`;
//! this module only maps the resolved name onto [`OutputMode`].

use chores_core::integrity::ValidationError;
use chores_core::store::StoreError;
use chores_core::{ChoreError, ErrorCode};
use chores_tmux::session::SessionResolutionError;
use chores_tmux::{OrchestrationError, TmuxError};
use serde::Serialize;
use std::io::{self, Write};

use crate::context::ContextError;

pub const PRETTY_RULE_WIDTH: usize = 72;

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Left-aligned key/value line.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-oriented sections and aligned columns.
    Pretty,
    /// Tab-separated rows for agents and pipes.
    Text,
    Json,
}

impl OutputMode {
    /// Map a resolved mode name; anything unknown is treated as text.
    pub fn from_name(name: &str) -> Self {
        match name {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Text,
        }
    }

    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Render `value` as JSON, or through `human_fn` in pretty and text modes.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => human_fn(value, &mut out)?,
    }
    Ok(())
}

/// Render with distinct text and pretty renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Stable `E####` code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    fn coded(message: String, code: ErrorCode) -> Self {
        Self {
            message,
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }

    /// Classify an error from any layer, keeping the code of the first
    /// recognised library error in the chain.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        for cause in err.chain() {
            let code = if let Some(e) = cause.downcast_ref::<ChoreError>() {
                Some(e.code())
            } else if let Some(e) = cause.downcast_ref::<ValidationError>() {
                Some(e.code())
            } else if let Some(e) = cause.downcast_ref::<StoreError>() {
                Some(e.code())
            } else if let Some(e) = cause.downcast_ref::<OrchestrationError>() {
                Some(e.code())
            } else if let Some(e) = cause.downcast_ref::<SessionResolutionError>() {
                Some(e.code())
            } else if let Some(e) = cause.downcast_ref::<TmuxError>() {
                Some(e.code())
            } else {
                cause.downcast_ref::<ContextError>().map(ContextError::code)
            };
            if let Some(code) = code {
                return Self::coded(message, code);
            }
        }
        Self::new(message)
    }
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;
    use chores_core::ChoreId;

    #[test]
    fn mode_names_map() {
        assert_eq!(OutputMode::from_name("json"), OutputMode::Json);
        assert_eq!(OutputMode::from_name("pretty"), OutputMode::Pretty);
        assert_eq!(OutputMode::from_name("text"), OutputMode::Text);
        assert_eq!(OutputMode::from_name("bogus"), OutputMode::Text);
        assert!(OutputMode::Json.is_json());
    }

    #[test]
    fn chore_errors_keep_their_code_through_context() {
        let err = Err::<(), _>(ChoreError::NotFound(ChoreId::new(9)))
            .context("advancing chore")
            .unwrap_err();
        let cli = CliError::from_anyhow(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2001"));
        assert!(cli.message.starts_with("advancing chore: "));
        assert!(cli.suggestion.is_some());
    }

    #[test]
    fn unknown_errors_have_no_code() {
        let err = anyhow::anyhow!("plain failure");
        let cli = CliError::from_anyhow(&err);
        assert_eq!(cli.error_code, None);
        assert_eq!(cli.message, "plain failure");
    }

    #[test]
    fn json_error_shape() {
        let cli = CliError {
            message: "m".into(),
            suggestion: None,
            error_code: Some("E2003".into()),
        };
        let value = serde_json::to_value(&cli).unwrap();
        assert_eq!(value, serde_json::json!({"message": "m", "error_code": "E2003"}));
    }
}
