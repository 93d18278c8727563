//! Event seam between the repository and whatever mirrors chores elsewhere.
//!
//! Callbacks run after the triggering change has committed. They never fail
//! the operation: anything that goes wrong is returned as a [`HookFailure`]
//! and kept by the repository so the divergence can be inspected later.

use std::fmt;

use serde::Serialize;

use crate::model::{Chore, ChoreId, Phase};

/// Workspace action a hook attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookAction {
    CreateWorkerWindow,
    CreateReviewerPane,
    CleanupReviewerPane,
    CleanupWorkerWindow,
    RenameWindow,
    UpdateContext,
}

impl HookAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateWorkerWindow => "create_worker_window",
            Self::CreateReviewerPane => "create_reviewer_pane",
            Self::CleanupReviewerPane => "cleanup_reviewer_pane",
            Self::CleanupWorkerWindow => "cleanup_worker_window",
            Self::RenameWindow => "rename_window",
            Self::UpdateContext => "update_context",
        }
    }
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One best-effort action that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookFailure {
    pub chore_id: ChoreId,
    pub action: HookAction,
    pub message: String,
}

impl HookFailure {
    pub fn new(chore_id: ChoreId, action: HookAction, message: impl Into<String>) -> Self {
        Self {
            chore_id,
            action,
            message: message.into(),
        }
    }
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chore {} {}: {}", self.chore_id, self.action, self.message)
    }
}

/// Receives committed repository events.
pub trait ChoreObserver: Send {
    fn on_created(&mut self, chore: &Chore) -> Vec<HookFailure>;

    /// `chore` is the committed state; after a terminal step it is no longer
    /// in the active set.
    fn on_phase_changed(&mut self, chore: &Chore, from: Phase, to: Phase) -> Vec<HookFailure>;

    fn on_deleted(&mut self, id: ChoreId) -> Vec<HookFailure>;
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ChoreObserver for NoopObserver {
    fn on_created(&mut self, _chore: &Chore) -> Vec<HookFailure> {
        Vec::new()
    }

    fn on_phase_changed(&mut self, _chore: &Chore, _from: Phase, _to: Phase) -> Vec<HookFailure> {
        Vec::new()
    }

    fn on_deleted(&mut self, _id: ChoreId) -> Vec<HookFailure> {
        Vec::new()
    }
}
