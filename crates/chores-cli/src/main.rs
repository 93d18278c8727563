#![forbid(unsafe_code)]

mod cmd;
mod context;
mod output;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use context::{GlobalFlags, ProjectContext};
use output::{CliError, OutputMode, render_error};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "chore: phase-gated chore tracker with tmux workspaces",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output such as hook warnings.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Project root (default: nearest parent holding `.chores/`).
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Skip every tmux side effect for this invocation.
    #[arg(long, global = true)]
    no_tmux: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn flags(&self) -> GlobalFlags {
        GlobalFlags {
            json: self.json,
            quiet: self.quiet,
            no_tmux: self.no_tmux,
        }
    }

    /// Output mode before any config is loaded.
    const fn early_output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a chores project",
        long_about = "Create .chores/ with a default config.toml and an empty active store.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    chore init\n\n    # Track chores without opening tmux windows\n    chore init --disable-tmux"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Show the effective configuration",
        after_help = "EXAMPLES:\n    chore config\n    chore config --json"
    )]
    Config(cmd::config::ConfigArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Create a chore in the design phase",
        long_about = "Create a chore in the design phase. With tmux enabled, a worker window is opened for it.",
        after_help = "EXAMPLES:\n    # Create a top-level chore\n    chore create \"Fix login\" -d \"Session cookie expires early\"\n\n    # Create a child chore\n    chore create \"Write tests\" --parent 1234"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Move a chore to its next phase",
        long_about = "Move a chore one phase forward. Parents wait for their active children. \
                      Reaching work_done archives the chore and closes its window.",
        after_help = "EXAMPLES:\n    chore advance 1234 --progress \"design written\"\n    chore advance 1234 --review \"looks good\""
    )]
    Advance(cmd::advance::AdvanceArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Send a chore under review back to its working phase",
        after_help = "EXAMPLES:\n    chore reject 1234 --reason \"missing error handling\""
    )]
    Reject(cmd::reject::RejectArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Edit a chore's fields",
        after_help = "EXAMPLES:\n    chore update 1234 --name \"Fix login redirect\"\n    chore update 1234 --phase design_review"
    )]
    Update(cmd::update::UpdateArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Delete a chore and its descendants",
        after_help = "EXAMPLES:\n    chore delete 1234"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Set the chore that follows another",
        after_help = "EXAMPLES:\n    # 5678 becomes actionable once 1234 is done\n    chore successor 1234 5678"
    )]
    Successor(cmd::successor::SuccessorArgs),

    #[command(
        next_help_heading = "Read",
        about = "List active or archived chores",
        after_help = "EXAMPLES:\n    chore list\n    chore list --phase work_review\n    chore list --archived --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one chore",
        after_help = "EXAMPLES:\n    chore show 1234"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show the successor of a finished chore",
        after_help = "EXAMPLES:\n    chore next 1234"
    )]
    Next(cmd::next::NextArgs),

    #[command(
        next_help_heading = "Read",
        about = "Count active chores per phase",
        after_help = "EXAMPLES:\n    # Compact form for a tmux status line\n    chore status"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Check that no chore is in both stores",
        after_help = "EXAMPLES:\n    chore validate && echo ok"
    )]
    Validate(cmd::validate::ValidateArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Remove archived chores from the active store",
        after_help = "EXAMPLES:\n    chore repair"
    )]
    Repair(cmd::repair::RepairArgs),

    #[command(
        next_help_heading = "Workspace",
        about = "List chore windows and reconcile them with the store",
        after_help = "EXAMPLES:\n    chore windows\n    chore windows --prune --open"
    )]
    Windows(cmd::windows::WindowsArgs),

    #[command(
        next_help_heading = "Workspace",
        about = "Attach to the chore tmux session",
        after_help = "EXAMPLES:\n    # Print the attach command\n    chore attach\n\n    # Attach right away\n    chore attach --exec"
    )]
    Attach(cmd::attach::AttachArgs),
}

/// Default directives when `CHORES_LOG` is unset. The library crates log
/// under `chores_*` and the binary under `chore`.
const fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "chores=debug,chore=debug,info"
    } else {
        "chores=info,chore=info,warn"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CHORES_LOG").unwrap_or_else(|_| {
        EnvFilter::new(default_log_filter(verbose || env::var("DEBUG").is_ok()))
    });

    let format = env::var("CHORES_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn dispatch(cli: &Cli, output: &mut OutputMode) -> anyhow::Result<()> {
    let cwd = env::current_dir()?;
    match &cli.command {
        Commands::Init(args) => {
            let root = cli.root.clone().unwrap_or(cwd);
            return cmd::init::run_init(args, cli.early_output_mode(), &root);
        }
        Commands::Config(args) => {
            let root = cli
                .root
                .clone()
                .or_else(|| context::find_project_root(&cwd))
                .unwrap_or(cwd);
            return cmd::config::run_config(args, cli.json, &root);
        }
        _ => {}
    }

    let ctx = ProjectContext::discover(cli.root.as_deref(), &cwd, &cli.flags())?;
    *output = ctx.output;
    debug!(root = %ctx.root.display(), "dispatching");

    match &cli.command {
        Commands::Create(args) => cmd::create::run_create(args, &ctx),
        Commands::Advance(args) => cmd::advance::run_advance(args, &ctx),
        Commands::Reject(args) => cmd::reject::run_reject(args, &ctx),
        Commands::Update(args) => cmd::update::run_update(args, &ctx),
        Commands::Delete(args) => cmd::delete::run_delete(args, &ctx),
        Commands::Successor(args) => cmd::successor::run_successor(args, &ctx),
        Commands::List(args) => cmd::list::run_list(args, &ctx),
        Commands::Show(args) => cmd::show::run_show(args, &ctx),
        Commands::Next(args) => cmd::next::run_next(args, &ctx),
        Commands::Status(args) => cmd::status::run_status(args, &ctx),
        Commands::Validate(args) => cmd::validate::run_validate(args, &ctx),
        Commands::Repair(args) => cmd::repair::run_repair(args, &ctx),
        Commands::Windows(args) => cmd::windows::run_windows(args, &ctx),
        Commands::Attach(args) => cmd::attach::run_attach(args, &ctx),
        Commands::Init(_) | Commands::Config(_) => Ok(()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let mut output = cli.early_output_mode();
    match dispatch(&cli, &mut output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = CliError::from_anyhow(&e);
            if render_error(output, &error).is_err() {
                eprintln!("error: {}", error.message);
            }
            ExitCode::FAILURE
        }
    }
}
