use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::TmuxError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TmuxOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl TmuxOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.status, Some(0))
    }
}

/// Anything that can execute tmux command lines.
///
/// `run` reports a non-zero exit through [`TmuxOutput::status`];
/// `run_checked` turns it into [`TmuxError::CommandFailed`].
pub trait Multiplexer: Send + Sync {
    /// Execute one tmux invocation; `args` excludes the binary itself.
    ///
    /// # Errors
    ///
    /// Spawn, timeout and decoding failures.
    fn run(&self, args: &[&str]) -> Result<TmuxOutput, TmuxError>;

    fn binary(&self) -> &Path;

    /// # Errors
    ///
    /// As for [`Multiplexer::run`], plus [`TmuxError::CommandFailed`] on a
    /// non-zero exit.
    fn run_checked(&self, args: &[&str]) -> Result<TmuxOutput, TmuxError> {
        let output = self.run(args)?;
        if output.success() {
            Ok(output)
        } else {
            Err(TmuxError::CommandFailed {
                command: render_command(self.binary(), args),
                status: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
    }
}

/// The real tmux binary, with a wall-clock bound on every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxCli {
    pub binary: PathBuf,
    pub timeout: Duration,
}

impl TmuxCli {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl Multiplexer for TmuxCli {
    fn run(&self, args: &[&str]) -> Result<TmuxOutput, TmuxError> {
        let rendered = render_command(&self.binary, args);
        debug!(command = %rendered, "tmux");

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TmuxError::Io {
                command: rendered.clone(),
                source,
            })?;

        // Drain both pipes while polling: the child stalls once a pipe
        // buffer fills.
        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        let start = Instant::now();
        let status = loop {
            let exited = child.try_wait().map_err(|source| TmuxError::Io {
                command: rendered.clone(),
                source,
            })?;
            if let Some(status) = exited {
                break status;
            }
            if start.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TmuxError::Timeout {
                    command: rendered,
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            thread::sleep(Duration::from_millis(5));
        };

        let stdout = collect(stdout_reader, &rendered, "stdout")?;
        let stderr = collect(stderr_reader, &rendered, "stderr")?;

        Ok(TmuxOutput {
            status: status.code(),
            stdout,
            stderr,
        })
    }

    fn binary(&self) -> &Path {
        &self.binary
    }
}

type Reader = JoinHandle<io::Result<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Reader> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf).map(|_| buf)
        })
    })
}

fn collect(reader: Option<Reader>, command: &str, stream: &'static str) -> Result<String, TmuxError> {
    let Some(reader) = reader else {
        return Ok(String::new());
    };
    let bytes = reader
        .join()
        .unwrap_or_else(|_| Err(io::Error::other(format!("{stream} reader panicked"))))
        .map_err(|source| TmuxError::Io {
            command: command.to_string(),
            source,
        })?;
    String::from_utf8(bytes).map_err(|source| TmuxError::NonUtf8Output {
        command: command.to_string(),
        stream,
        source,
    })
}

#[must_use]
pub fn render_command(binary: &Path, args: &[&str]) -> String {
    let mut rendered = binary.to_string_lossy().into_owned();
    for arg in args {
        rendered.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            rendered.push_str(&shell_single_quote(arg));
        } else {
            rendered.push_str(arg);
        }
    }
    rendered
}

/// Quote `value` for a POSIX shell.
#[must_use]
pub fn shell_single_quote(value: &str) -> String {
    let escaped = value.replace('\'', "'\"'\"'");
    format!("'{escaped}'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_quotes_only_when_needed() {
        let rendered = render_command(
            Path::new("/usr/bin/tmux"),
            &["send-keys", "-t", "%1", "-l", "export A='x y'"],
        );
        assert_eq!(
            rendered,
            r#"/usr/bin/tmux send-keys -t %1 -l 'export A='"'"'x y'"'"''"#
        );
    }

    #[test]
    fn missing_binary_is_io_error() {
        let tmux = TmuxCli::new("/definitely/missing/tmux-binary", Duration::from_secs(1));
        let err = tmux.run(&["-V"]).unwrap_err();
        assert!(matches!(err, TmuxError::Io { .. }), "{err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn slow_command_times_out() {
        let tmux = TmuxCli::new("/bin/sleep", Duration::from_millis(50));
        let err = tmux.run(&["5"]).unwrap_err();
        assert!(matches!(err, TmuxError::Timeout { timeout_ms: 50, .. }), "{err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn large_output_is_drained_while_waiting() {
        let tmux = TmuxCli::new("/bin/sh", Duration::from_secs(5));
        let start = Instant::now();
        let output = tmux
            .run(&["-c", "head -c 200000 /dev/zero | tr '\\0' x; head -c 100000 /dev/zero | tr '\\0' y >&2"])
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.len(), 200_000);
        assert_eq!(output.stderr.len(), 100_000);
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_reported_then_checked() {
        let tmux = TmuxCli::new("/bin/sh", Duration::from_secs(5));
        let output = tmux.run(&["-c", "echo oops >&2; exit 3"]).unwrap();
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stderr.trim(), "oops");

        let err = tmux.run_checked(&["-c", "exit 3"]).unwrap_err();
        assert!(matches!(err, TmuxError::CommandFailed { status: Some(3), .. }));
    }
}
