//! `chore attach`: resolve the chore session and print (or run) the command
//! that attaches to it.

use std::process::Command;

use anyhow::{Context as _, Result};
use chores_tmux::ResolvedSession;
use clap::Args;
use tracing::info;

use crate::context::ProjectContext;
use crate::output::{pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct AttachArgs {
    /// Session to attach to instead of the configured one.
    #[arg(long, value_name = "NAME")]
    pub session: Option<String>,

    /// Run the attach command instead of printing it.
    #[arg(long)]
    pub exec: bool,
}

/// # Errors
///
/// tmux disabled or missing, invalid session name, session creation
/// failure, or a failing attach under `--exec`.
pub fn run_attach(args: &AttachArgs, ctx: &ProjectContext) -> Result<()> {
    let orchestrator = ctx.orchestrator()?;
    let session: ResolvedSession = match args.session.as_deref() {
        Some(name) => orchestrator.sessions().resolve(Some(name))?,
        None => orchestrator.resolve_session()?,
    };

    if args.exec {
        let subcommand: Vec<&str> = session.attach_command.split_whitespace().skip(1).collect();
        info!(session = %session.name, "attaching");
        let status = Command::new(orchestrator.binary())
            .args(&subcommand)
            .status()
            .with_context(|| format!("failed to run {}", session.attach_command))?;
        if !status.success() {
            anyhow::bail!("`{}` exited with {status}", session.attach_command);
        }
        return Ok(());
    }

    render_mode(
        ctx.output,
        &session,
        |s, w| writeln!(w, "{}", s.attach_command),
        |s, w| {
            pretty_kv(w, "Session", &s.name)?;
            pretty_kv(w, "Created", if s.created { "yes" } else { "no" })?;
            pretty_kv(w, "Attach", &s.attach_command)
        },
    )
}
