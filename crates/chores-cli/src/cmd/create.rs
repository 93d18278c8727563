//! `chore create`

use anyhow::{Context as _, Result};
use chores_core::ChoreId;
use clap::Args;

use crate::cmd::{ChoreView, parse_id};
use crate::context::ProjectContext;
use crate::output::render_mode;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Short name; also becomes the window slug.
    pub name: String,

    /// Longer description shown to agents.
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Nest the new chore under an active parent.
    #[arg(long, value_parser = parse_id)]
    pub parent: Option<ChoreId>,
}

/// # Errors
///
/// Empty name, unknown parent, or store failure.
pub fn run_create(args: &CreateArgs, ctx: &ProjectContext) -> Result<()> {
    let name = args.name.trim();
    if name.is_empty() {
        anyhow::bail!("chore name must not be empty");
    }

    let mut repo = ctx.open_repository_with_hooks()?;
    let chore = repo
        .create(name, args.description.as_str(), args.parent)
        .context("failed to create chore")?;
    ctx.report_hook_failures(&mut repo);

    let view = ChoreView::new(&chore, false);
    render_mode(
        ctx.output,
        &view,
        |v, w| writeln!(w, "{}", v.id),
        |v, w| writeln!(w, "created chore {} ({})", v.id, v.name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: CreateArgs,
    }

    #[test]
    fn create_args_parse() {
        let w = Wrapper::parse_from(["test", "Fix login", "-d", "details", "--parent", "12"]);
        assert_eq!(w.args.name, "Fix login");
        assert_eq!(w.args.description, "details");
        assert_eq!(w.args.parent, Some(ChoreId::new(12)));
    }

    #[test]
    fn bad_parent_is_rejected_by_parser() {
        assert!(Wrapper::try_parse_from(["test", "x", "--parent", "p1"]).is_err());
    }
}
