//! `chore list`

use std::io::Write;

use anyhow::Result;
use chores_core::Phase;
use clap::Args;

use crate::cmd::{ChoreView, parse_phase};
use crate::context::ProjectContext;
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only chores currently in this phase.
    #[arg(long, value_parser = parse_phase)]
    pub phase: Option<Phase>,

    /// List the archive instead of the active set.
    #[arg(long, conflicts_with = "phase")]
    pub archived: bool,
}

/// # Errors
///
/// Store read failure.
pub fn run_list(args: &ListArgs, ctx: &ProjectContext) -> Result<()> {
    let repo = ctx.open_repository()?;
    let views: Vec<ChoreView> = if args.archived {
        repo.archived()?
            .iter()
            .map(|c| ChoreView::new(c, true))
            .collect()
    } else {
        let chores = match args.phase {
            Some(phase) => repo.find_by_phase(phase),
            None => repo.list_all(),
        };
        chores.into_iter().map(|c| ChoreView::new(c, false)).collect()
    };

    render_mode(
        ctx.output,
        &views,
        |views, w| {
            for view in views {
                view.write_row(w)?;
            }
            Ok(())
        },
        |views, w| write_table(views, args.archived, w),
    )
}

fn write_table(views: &[ChoreView], archived: bool, w: &mut dyn Write) -> std::io::Result<()> {
    let heading = if archived { "Archived chores" } else { "Active chores" };
    pretty_section(w, heading)?;
    if views.is_empty() {
        return writeln!(w, "(none)");
    }
    for view in views {
        let indent = if view.parent_id.is_some() { "  " } else { "" };
        writeln!(
            w,
            "{indent}{:<20} {:<14} {:<9} {}",
            view.id.to_string(),
            view.phase.as_str(),
            view.role,
            view.name
        )?;
    }
    Ok(())
}
