//! The phase transition table applied to chores.
//!
//! The table itself lives on [`Phase`]; this module binds it to [`Chore`]
//! values and carries the caller-facing [`TransitionError`]. The children
//! gate is not checked here, see [`crate::active::ActiveSet::pending_children`].

use crate::error::ErrorCode;
use crate::model::{Chore, ChoreId, Phase};

/// An illegal phase change was requested.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("chore {id}: cannot move {from} -> {to}: {reason}")]
    NotAllowed {
        id: ChoreId,
        from: Phase,
        to: Phase,
        reason: &'static str,
    },

    #[error("chore {id}: {} child chore(s) not finished", .pending.len())]
    ChildrenIncomplete { id: ChoreId, pending: Vec<ChoreId> },

    #[error("chore {id}: cannot reject from {phase}, only review phases can be rejected")]
    NotRejectable { id: ChoreId, phase: Phase },
}

impl TransitionError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotAllowed { .. } => ErrorCode::InvalidTransition,
            Self::ChildrenIncomplete { .. } => ErrorCode::ChildrenIncomplete,
            Self::NotRejectable { .. } => ErrorCode::NotRejectable,
        }
    }
}

/// True iff `target` is the single allowed successor of `current`.
#[must_use]
pub fn validate(current: Phase, target: Phase) -> bool {
    current.can_transition_to(target).is_ok()
}

/// Move `chore` to `target`, touching nothing but its phase.
///
/// # Errors
///
/// Returns [`TransitionError::NotAllowed`] when `target` is not the table
/// successor of the chore's phase; the chore is left unchanged.
pub fn apply(chore: &mut Chore, target: Phase) -> Result<(), TransitionError> {
    chore
        .phase()
        .can_transition_to(target)
        .map_err(|e| TransitionError::NotAllowed {
            id: chore.id(),
            from: e.from,
            to: e.to,
            reason: e.reason,
        })?;
    chore.set_phase(target);
    Ok(())
}

/// Send a chore under review back to its working phase.
///
/// Returns the phase the chore was moved to.
///
/// # Errors
///
/// Returns [`TransitionError::NotRejectable`] outside the review phases.
pub fn apply_rejection(chore: &mut Chore) -> Result<Phase, TransitionError> {
    let target = chore
        .phase()
        .rejection_target()
        .ok_or(TransitionError::NotRejectable {
            id: chore.id(),
            phase: chore.phase(),
        })?;
    chore.set_phase(target);
    Ok(target)
}
