//! `chore update`: edit fields, or jump to the next phase with `--phase`.

use anyhow::{Context as _, Result};
use chores_core::repository::ChoreUpdate;
use chores_core::{ChoreError, ChoreId, Phase};
use clap::Args;
use serde::Serialize;

use crate::cmd::{ChoreView, parse_id, parse_phase};
use crate::context::ProjectContext;
use crate::output::render_mode;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[arg(value_parser = parse_id)]
    pub id: ChoreId,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    /// Replace the worker's progress note.
    #[arg(long)]
    pub progress: Option<String>,

    /// Replace the reviewer's note.
    #[arg(long)]
    pub review: Option<String>,

    /// Move to this phase. Only the next phase in the workflow is accepted.
    #[arg(long, value_parser = parse_phase)]
    pub phase: Option<Phase>,
}

impl UpdateArgs {
    fn to_update(&self) -> ChoreUpdate {
        ChoreUpdate {
            name: self.name.clone(),
            description: self.description.clone(),
            progress_info: self.progress.clone(),
            review_info: self.review.clone(),
            phase: self.phase,
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdateReport {
    #[serde(flatten)]
    chore: ChoreView,
    /// False when the chore reached its terminal phase and was archived.
    active: bool,
}

/// # Errors
///
/// Unknown id, illegal phase change, or store failure.
pub fn run_update(args: &UpdateArgs, ctx: &ProjectContext) -> Result<()> {
    let update = args.to_update();
    if update == ChoreUpdate::default() {
        anyhow::bail!("nothing to update: pass at least one of --name, --description, --progress, --review, --phase");
    }

    let mut repo = ctx.open_repository_with_hooks()?;
    let updated = repo
        .update(args.id, update)
        .with_context(|| format!("failed to update chore {}", args.id))?;
    ctx.report_hook_failures(&mut repo);

    let report = match updated {
        Some(chore) => UpdateReport {
            chore: ChoreView::new(&chore, false),
            active: true,
        },
        None => {
            let archived = repo.archived()?;
            let chore = archived
                .iter()
                .rev()
                .find(|c| c.id() == args.id)
                .ok_or(ChoreError::NotFound(args.id))?;
            UpdateReport {
                chore: ChoreView::new(chore, true),
                active: false,
            }
        }
    };

    render_mode(
        ctx.output,
        &report,
        |r, w| r.chore.write_row(w),
        |r, w| {
            if r.active {
                writeln!(w, "updated chore {}", r.chore.id)
            } else {
                writeln!(w, "chore {} completed and archived", r.chore.id)
            }
        },
    )
}
