//! Mirrors lifecycle events into tmux.
//!
//! Every action is best-effort: a failure becomes a [`HookFailure`] for the
//! repository to keep, and the remaining actions for the event still run.

use chores_core::observer::{ChoreObserver, HookAction, HookFailure};
use chores_core::{Chore, ChoreId, Phase, Role};
use tracing::debug;

use crate::workspace::{OrchestrationError, WorkspaceOrchestrator};

#[derive(Debug)]
pub struct LifecycleHooks {
    orchestrator: WorkspaceOrchestrator,
}

impl LifecycleHooks {
    #[must_use]
    pub const fn new(orchestrator: WorkspaceOrchestrator) -> Self {
        Self { orchestrator }
    }

    #[must_use]
    pub const fn orchestrator(&self) -> &WorkspaceOrchestrator {
        &self.orchestrator
    }
}

/// Workspace actions implied by moving from `from` to `to`, in order.
#[must_use]
pub fn plan_phase_change(from: Phase, to: Phase) -> Vec<HookAction> {
    let mut actions = Vec::new();

    if to.role() == Role::Worker && from.role() != Role::Worker && !to.is_terminal() {
        actions.push(HookAction::CreateWorkerWindow);
    }
    if to.role() == Role::Reviewer {
        actions.push(HookAction::CreateReviewerPane);
    }
    if from.role() == Role::Reviewer && to.role() != Role::Reviewer {
        actions.push(HookAction::CleanupReviewerPane);
    }
    if to.is_terminal() {
        actions.push(HookAction::CleanupWorkerWindow);
    } else {
        actions.push(HookAction::RenameWindow);
        actions.push(HookAction::UpdateContext);
    }
    actions
}

impl LifecycleHooks {
    fn perform(&self, chore: &Chore, action: HookAction) -> Result<(), OrchestrationError> {
        match action {
            HookAction::CreateWorkerWindow => self.orchestrator.create_worker_window(chore).map(drop),
            HookAction::CreateReviewerPane => self.orchestrator.create_reviewer_pane(chore).map(drop),
            HookAction::CleanupReviewerPane => self.orchestrator.cleanup_reviewer_pane(chore.id()).map(drop),
            HookAction::CleanupWorkerWindow => self.orchestrator.cleanup_worker_window(chore.id()).map(drop),
            HookAction::RenameWindow => self.orchestrator.rename_window(chore).map(drop),
            HookAction::UpdateContext => self.orchestrator.update_context(chore).map(drop),
        }
    }

    fn run_all(&self, chore: &Chore, actions: &[HookAction]) -> Vec<HookFailure> {
        actions
            .iter()
            .filter_map(|&action| {
                debug!(chore = %chore.id(), %action, "workspace hook");
                self.perform(chore, action)
                    .err()
                    .map(|e| HookFailure::new(chore.id(), action, e.to_string()))
            })
            .collect()
    }
}

impl ChoreObserver for LifecycleHooks {
    fn on_created(&mut self, chore: &Chore) -> Vec<HookFailure> {
        if chore.phase() == Phase::FIRST {
            self.run_all(chore, &[HookAction::CreateWorkerWindow])
        } else {
            Vec::new()
        }
    }

    fn on_phase_changed(&mut self, chore: &Chore, from: Phase, to: Phase) -> Vec<HookFailure> {
        self.run_all(chore, &plan_phase_change(from, to))
    }

    fn on_deleted(&mut self, id: ChoreId) -> Vec<HookFailure> {
        match self.orchestrator.cleanup_worker_window(id) {
            Ok(_) => Vec::new(),
            Err(e) => vec![HookFailure::new(id, HookAction::CleanupWorkerWindow, e.to_string())],
        }
    }
}
