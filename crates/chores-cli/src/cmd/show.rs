//! `chore show`: one chore from the active set, falling back to the archive.

use anyhow::Result;
use chores_core::{ChoreError, ChoreId};
use clap::Args;

use crate::cmd::{ChoreView, parse_id};
use crate::context::ProjectContext;
use crate::output::render_mode;

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[arg(value_parser = parse_id)]
    pub id: ChoreId,
}

/// # Errors
///
/// [`ChoreError::NotFound`] when the id is in neither store.
pub fn run_show(args: &ShowArgs, ctx: &ProjectContext) -> Result<()> {
    let repo = ctx.open_repository()?;
    let view = match repo.read(args.id) {
        Some(chore) => ChoreView::new(chore, false),
        None => {
            let archived = repo.archived()?;
            let chore = archived
                .iter()
                .rev()
                .find(|c| c.id() == args.id)
                .ok_or(ChoreError::NotFound(args.id))?;
            ChoreView::new(chore, true)
        }
    };

    render_mode(
        ctx.output,
        &view,
        |v, w| {
            v.write_row(w)?;
            if !v.description.is_empty() {
                writeln!(w, "{}", v.description)?;
            }
            Ok(())
        },
        ChoreView::write_pretty,
    )
}
