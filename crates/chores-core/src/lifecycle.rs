//! One phase change as a single logical operation.
//!
//! # Sequence
//!
//! 1. Children gate, then table check. Either failing leaves everything
//!    untouched.
//! 2. Apply the phase and any supplied notes.
//! 3. Terminal phase: append to the archive, drop from the active set, then
//!    rewrite the active store. Otherwise rewrite the active store only.
//! 4. Scan both stores; any issue fails the call with
//!    [`crate::integrity::ValidationError::Integrity`].
//!
//! A failure in steps 3 or 4 leaves the in-memory set ahead of (or out of
//! step with) the store files. Callers should reload rather than retry.

use tracing::info;

use crate::active::ActiveSet;
use crate::archive::ArchivalManager;
use crate::error::ChoreError;
use crate::integrity::IntegrityValidator;
use crate::model::{Chore, ChoreId, Phase};
use crate::store::ChoreStore;
use crate::transition::{self, TransitionError};

/// Notes written alongside a phase change. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteUpdate {
    pub progress_info: Option<String>,
    pub review_info: Option<String>,
}

impl NoteUpdate {
    #[must_use]
    pub const fn progress(text: String) -> Self {
        Self {
            progress_info: Some(text),
            review_info: None,
        }
    }

    #[must_use]
    pub const fn review(text: String) -> Self {
        Self {
            progress_info: None,
            review_info: Some(text),
        }
    }

    fn apply_to(self, chore: &mut Chore) {
        if let Some(progress) = self.progress_info {
            chore.progress_info = Some(progress);
        }
        if let Some(review) = self.review_info {
            chore.review_info = Some(review);
        }
    }
}

/// What a committed phase change did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: Phase,
    pub to: Phase,
    /// True when the chore reached the terminal phase and left the active set.
    pub archived: bool,
    /// The chore as committed.
    pub chore: Chore,
}

#[derive(Debug, Clone)]
pub struct LifecycleManager {
    archival: ArchivalManager,
    validator: IntegrityValidator,
}

impl LifecycleManager {
    #[must_use]
    pub fn new(store: ChoreStore) -> Self {
        Self {
            archival: ArchivalManager::new(store.clone()),
            validator: IntegrityValidator::new(store),
        }
    }

    #[must_use]
    pub const fn archival(&self) -> &ArchivalManager {
        &self.archival
    }

    #[must_use]
    pub const fn validator(&self) -> &IntegrityValidator {
        &self.validator
    }

    /// Check the children gate and the table without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ChoreError::NotFound`] or a [`TransitionError`].
    #[allow(clippy::unused_self)]
    pub fn check(&self, active: &ActiveSet, id: ChoreId, target: Phase) -> Result<(), ChoreError> {
        let chore = active.get(id).ok_or(ChoreError::NotFound(id))?;

        let pending = active.pending_children(id);
        if !pending.is_empty() {
            return Err(TransitionError::ChildrenIncomplete { id, pending }.into());
        }

        chore
            .phase()
            .can_transition_to(target)
            .map_err(|e| TransitionError::NotAllowed {
                id,
                from: e.from,
                to: e.to,
                reason: e.reason,
            })?;
        Ok(())
    }

    /// Move chore `id` to `target` and commit the result to the stores.
    ///
    /// # Errors
    ///
    /// - [`TransitionError`] if the gate or the table rejects the change;
    ///   nothing was mutated.
    /// - [`ChoreError::Store`] or [`ChoreError::Validation`] if the commit failed;
    ///   the in-memory set may already reflect the change.
    pub fn transition(
        &self,
        active: &mut ActiveSet,
        id: ChoreId,
        target: Phase,
        notes: NoteUpdate,
    ) -> Result<TransitionOutcome, ChoreError> {
        self.check(active, id, target)?;

        let chore = active.get_mut(id).ok_or(ChoreError::NotFound(id))?;
        let from = chore.phase();
        transition::apply(chore, target)?;
        notes.apply_to(chore);
        let committed = chore.clone();

        self.commit(active, from, committed)
    }

    /// Send a chore under review back to its working phase.
    ///
    /// Outside the forward table and not subject to the children gate.
    /// `review_info` is recorded when supplied.
    ///
    /// # Errors
    ///
    /// [`TransitionError::NotRejectable`] outside the review phases, otherwise
    /// as for [`LifecycleManager::transition`].
    pub fn reject(
        &self,
        active: &mut ActiveSet,
        id: ChoreId,
        review_info: Option<String>,
    ) -> Result<TransitionOutcome, ChoreError> {
        let chore = active.get_mut(id).ok_or(ChoreError::NotFound(id))?;
        let from = chore.phase();
        transition::apply_rejection(chore)?;
        NoteUpdate {
            progress_info: None,
            review_info,
        }
        .apply_to(chore);
        let committed = chore.clone();

        self.commit(active, from, committed)
    }

    fn commit(
        &self,
        active: &mut ActiveSet,
        from: Phase,
        chore: Chore,
    ) -> Result<TransitionOutcome, ChoreError> {
        let archived = chore.is_complete();
        if archived {
            self.archival.archive(&chore)?;
            self.archival.remove_from_active(chore.id(), active);
        }
        self.archival.persist_active(active)?;

        self.validator.validate_locations()?.into_result()?;

        info!(id = %chore.id(), %from, to = %chore.phase(), archived, "phase change committed");
        Ok(TransitionOutcome {
            from,
            to: chore.phase(),
            archived,
            chore,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::ValidationError;
    use crate::model::ChoreRecord;
    use tempfile::TempDir;

    fn record(id: u64, phase: Phase, parent: Option<u64>) -> ChoreRecord {
        ChoreRecord {
            id: ChoreId::new(id),
            name: format!("c{id}"),
            description: String::new(),
            phase,
            successor_id: None,
            progress_info: None,
            review_info: None,
            parent_id: parent.map(ChoreId::new),
        }
    }

    fn setup(records: Vec<ChoreRecord>) -> (TempDir, ChoreStore, ActiveSet) {
        let dir = TempDir::new().unwrap();
        let store = ChoreStore::from_active(dir.path().join("chores.jsonl"));
        store.rewrite_active(&records).unwrap();
        let active = ActiveSet::from_records(store.read_active().unwrap());
        (dir, store, active)
    }

    #[test]
    fn forward_step_persists_phase_and_notes() {
        let (_dir, store, mut active) = setup(vec![record(1, Phase::Design, None)]);
        let manager = LifecycleManager::new(store.clone());

        let outcome = manager
            .transition(
                &mut active,
                ChoreId::new(1),
                Phase::DesignReview,
                NoteUpdate::progress("draft ready".into()),
            )
            .unwrap();

        assert_eq!(outcome.from, Phase::Design);
        assert_eq!(outcome.to, Phase::DesignReview);
        assert!(!outcome.archived);
        let on_disk = store.read_active().unwrap();
        assert_eq!(on_disk[0].phase, Phase::DesignReview);
        assert_eq!(on_disk[0].progress_info.as_deref(), Some("draft ready"));
    }

    #[test]
    fn terminal_step_archives_and_removes() {
        let (_dir, store, mut active) = setup(vec![
            record(1, Phase::WorkReview, None),
            record(2, Phase::Plan, None),
        ]);
        let manager = LifecycleManager::new(store.clone());

        let outcome = manager
            .transition(&mut active, ChoreId::new(1), Phase::WorkDone, NoteUpdate::default())
            .unwrap();

        assert!(outcome.archived);
        assert!(active.get(ChoreId::new(1)).is_none());
        assert_eq!(store.read_active().unwrap().len(), 1);
        assert_eq!(store.read_archive().unwrap()[0].id, ChoreId::new(1));

        let report = manager.validator().validate_locations().unwrap();
        assert!(report.valid);
        assert_eq!(report.dual_location_count, 0);
    }

    #[test]
    fn rejected_transition_mutates_nothing() {
        let (_dir, store, mut active) = setup(vec![record(1, Phase::Design, None)]);
        let manager = LifecycleManager::new(store.clone());

        let err = manager
            .transition(
                &mut active,
                ChoreId::new(1),
                Phase::Plan,
                NoteUpdate::progress("ignored".into()),
            )
            .unwrap_err();

        assert!(matches!(err, ChoreError::Transition(TransitionError::NotAllowed { .. })));
        let chore = active.get(ChoreId::new(1)).unwrap();
        assert_eq!(chore.phase(), Phase::Design);
        assert!(chore.progress_info.is_none());
    }

    #[test]
    fn children_gate_applies_to_every_target() {
        let (_dir, store, mut active) = setup(vec![
            record(1, Phase::Design, None),
            record(2, Phase::Design, Some(1)),
        ]);
        let manager = LifecycleManager::new(store);

        let err = manager
            .transition(&mut active, ChoreId::new(1), Phase::DesignReview, NoteUpdate::default())
            .unwrap_err();
        match err {
            ChoreError::Transition(TransitionError::ChildrenIncomplete { pending, .. }) => {
                assert_eq!(pending, vec![ChoreId::new(2)]);
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn reject_returns_to_working_phase_with_review() {
        let (_dir, store, mut active) = setup(vec![
            record(1, Phase::WorkReview, None),
            record(2, Phase::Design, Some(1)),
        ]);
        let manager = LifecycleManager::new(store.clone());

        let outcome = manager
            .reject(&mut active, ChoreId::new(1), Some("missing tests".into()))
            .unwrap();
        assert_eq!(outcome.to, Phase::Work);
        assert_eq!(outcome.chore.review_info.as_deref(), Some("missing tests"));
        assert_eq!(store.read_active().unwrap()[0].phase, Phase::Work);

        let err = manager.reject(&mut active, ChoreId::new(1), None).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::NotRejectable);
    }

    #[test]
    fn post_commit_scan_surfaces_existing_corruption() {
        let (_dir, store, mut active) = setup(vec![record(1, Phase::Design, None)]);
        store.append_archive(&record(7, Phase::Plan, None)).unwrap();
        let manager = LifecycleManager::new(store);

        let err = manager
            .transition(&mut active, ChoreId::new(1), Phase::DesignReview, NoteUpdate::default())
            .unwrap_err();
        match err {
            ChoreError::Validation(ValidationError::Integrity { issues }) => {
                assert_eq!(issues, vec!["Non-completed chore 7 in completed file".to_string()]);
            }
            other => panic!("unexpected {other}"),
        }
    }
}
