//! CRUD over the active set, with phase changes delegated to the lifecycle
//! engine and every committed change announced to a [`ChoreObserver`].
//!
//! The in-memory set is authoritative between loads: [`Repository::read`]
//! never touches the store files.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::active::ActiveSet;
use crate::archive::ReconcileReport;
use crate::error::ChoreError;
use crate::id::IdGenerator;
use crate::integrity::LocationReport;
use crate::lifecycle::{LifecycleManager, NoteUpdate, TransitionOutcome};
use crate::model::{Chore, ChoreId, Phase};
use crate::observer::{ChoreObserver, HookFailure, NoopObserver};
use crate::store::ChoreStore;

/// Field changes for [`Repository::update`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoreUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub progress_info: Option<String>,
    pub review_info: Option<String>,
    pub phase: Option<Phase>,
}

/// Result of [`Repository::repair`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub cleanup: ReconcileReport,
    pub validation: LocationReport,
    pub repaired: bool,
}

/// Per-phase counts of active chores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub counts: BTreeMap<Phase, usize>,
}

impl StatusSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

impl fmt::Display for StatusSummary {
    /// `Chores[DSN:2 WRK:1]`, phases in workflow order, empty phases omitted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .counts
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(phase, n)| format!("{}:{n}", phase.short_label()))
            .collect();
        if parts.is_empty() {
            f.write_str("Chores[none]")
        } else {
            write!(f, "Chores[{}]", parts.join(" "))
        }
    }
}

pub struct Repository {
    store: ChoreStore,
    lifecycle: LifecycleManager,
    ids: Arc<IdGenerator>,
    active: ActiveSet,
    observer: Box<dyn ChoreObserver>,
    hook_failures: Vec<HookFailure>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("store", &self.store)
            .field("active", &self.active.len())
            .field("hook_failures", &self.hook_failures.len())
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Load the active store into memory with no observer attached.
    ///
    /// # Errors
    ///
    /// Returns [`ChoreError::Store`] if the active store cannot be read.
    pub fn open(store: ChoreStore, ids: Arc<IdGenerator>) -> Result<Self, ChoreError> {
        let active = ActiveSet::from_records(store.read_active()?);
        info!(path = %store.active_path().display(), active = active.len(), "loaded chores");
        Ok(Self {
            lifecycle: LifecycleManager::new(store.clone()),
            store,
            ids,
            active,
            observer: Box::new(NoopObserver),
            hook_failures: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn ChoreObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &ChoreStore {
        &self.store
    }

    #[must_use]
    pub const fn active(&self) -> &ActiveSet {
        &self.active
    }

    /// Replace the in-memory set with what the active store holds now.
    ///
    /// # Errors
    ///
    /// Returns [`ChoreError::Store`] if the store cannot be read; the previous
    /// set is kept in that case.
    pub fn reload(&mut self) -> Result<(), ChoreError> {
        self.active = ActiveSet::from_records(self.store.read_active()?);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Create / read
    // -----------------------------------------------------------------------

    /// Create a chore in the first phase and persist it.
    ///
    /// # Errors
    ///
    /// - [`ChoreError::ParentNotFound`] if `parent_id` is not active.
    /// - [`ChoreError::Id`] or [`ChoreError::Store`] on generator or write
    ///   failure; the chore is not kept in that case.
    pub fn create(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        parent_id: Option<ChoreId>,
    ) -> Result<Chore, ChoreError> {
        match parent_id {
            Some(parent) if !self.active.contains(parent) => {
                return Err(ChoreError::ParentNotFound(parent));
            }
            _ => {}
        }

        let chore = Chore::create(&self.ids, name, description, parent_id)?;
        let id = chore.id();
        self.active.insert(chore.clone());
        if let Err(e) = self.persist() {
            self.active.remove(id);
            return Err(e);
        }

        info!(%id, name = %chore.name, "created chore");
        let failures = self.observer.on_created(&chore);
        self.record_failures(failures);
        Ok(chore)
    }

    #[must_use]
    pub fn read(&self, id: ChoreId) -> Option<&Chore> {
        self.active.get(id)
    }

    #[must_use]
    pub fn list_all(&self) -> Vec<&Chore> {
        self.active.iter().collect()
    }

    #[must_use]
    pub fn find_by_phase(&self, phase: Phase) -> Vec<&Chore> {
        self.active.find_by_phase(phase)
    }

    /// Every chore in the archive store, in archival order.
    ///
    /// # Errors
    ///
    /// Returns [`ChoreError::Store`] if the archive cannot be read.
    pub fn archived(&self) -> Result<Vec<Chore>, ChoreError> {
        Ok(self
            .store
            .read_archive()?
            .into_iter()
            .map(Chore::from_record)
            .collect())
    }

    // -----------------------------------------------------------------------
    // Update / phase changes
    // -----------------------------------------------------------------------

    /// Change fields and optionally the phase.
    ///
    /// The phase change is checked before any field is touched. Returns the
    /// updated chore, or `None` when the change reached the terminal phase and
    /// the chore was archived.
    ///
    /// # Errors
    ///
    /// - [`ChoreError::NotFound`] for an unknown id.
    /// - [`ChoreError::Transition`] if the phase change is not allowed.
    /// - [`ChoreError::Store`] / [`ChoreError::Validation`] if the commit
    ///   failed; call [`Repository::reload`] before continuing.
    pub fn update(&mut self, id: ChoreId, update: ChoreUpdate) -> Result<Option<Chore>, ChoreError> {
        if let Some(target) = update.phase {
            self.lifecycle.check(&self.active, id, target)?;
        }

        let chore = self.active.get_mut(id).ok_or(ChoreError::NotFound(id))?;
        if let Some(name) = update.name {
            chore.name = name;
        }
        if let Some(description) = update.description {
            chore.description = description;
        }

        let notes = NoteUpdate {
            progress_info: update.progress_info,
            review_info: update.review_info,
        };

        match update.phase {
            Some(target) => {
                let outcome = self.transition(id, target, notes)?;
                Ok((!outcome.archived).then_some(outcome.chore))
            }
            None => {
                if let Some(progress) = notes.progress_info {
                    chore.progress_info = Some(progress);
                }
                if let Some(review) = notes.review_info {
                    chore.review_info = Some(review);
                }
                let updated = chore.clone();
                self.persist()?;
                Ok(Some(updated))
            }
        }
    }

    /// Move a chore to the next phase in the table.
    ///
    /// # Errors
    ///
    /// [`ChoreError::NotFound`], or as for [`LifecycleManager::transition`].
    pub fn advance(&mut self, id: ChoreId, notes: NoteUpdate) -> Result<TransitionOutcome, ChoreError> {
        let chore = self.active.get(id).ok_or(ChoreError::NotFound(id))?;
        // Active chores are never terminal, so `next` only fails on corrupt input.
        let target = chore.phase().next().unwrap_or(Phase::TERMINAL);
        self.transition(id, target, notes)
    }

    /// Reviewer rejection: review phase back to its working phase.
    ///
    /// # Errors
    ///
    /// As for [`LifecycleManager::reject`].
    pub fn reject(
        &mut self,
        id: ChoreId,
        review_info: Option<String>,
    ) -> Result<TransitionOutcome, ChoreError> {
        let outcome = self.lifecycle.reject(&mut self.active, id, review_info)?;
        self.notify_phase_change(&outcome);
        Ok(outcome)
    }

    fn transition(
        &mut self,
        id: ChoreId,
        target: Phase,
        notes: NoteUpdate,
    ) -> Result<TransitionOutcome, ChoreError> {
        let outcome = self.lifecycle.transition(&mut self.active, id, target, notes)?;
        self.notify_phase_change(&outcome);
        Ok(outcome)
    }

    fn notify_phase_change(&mut self, outcome: &TransitionOutcome) {
        let failures = self
            .observer
            .on_phase_changed(&outcome.chore, outcome.from, outcome.to);
        self.record_failures(failures);
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Delete a chore and all of its descendants.
    ///
    /// Returns the deleted ids, deepest first.
    ///
    /// # Errors
    ///
    /// [`ChoreError::NotFound`] for an unknown id, [`ChoreError::Store`] if
    /// the rewrite fails (the chores are already gone from memory then).
    pub fn delete(&mut self, id: ChoreId) -> Result<Vec<ChoreId>, ChoreError> {
        if !self.active.contains(id) {
            return Err(ChoreError::NotFound(id));
        }

        let doomed = self.active.subtree_post_order(id);
        for victim in &doomed {
            let failures = self.observer.on_deleted(*victim);
            self.record_failures(failures);
            self.active.remove(*victim);
        }
        self.persist()?;

        info!(%id, count = doomed.len(), "deleted chore");
        Ok(doomed)
    }

    // -----------------------------------------------------------------------
    // Successors
    // -----------------------------------------------------------------------

    /// Link `successor` as the chore to pick up once `id` is done.
    ///
    /// # Errors
    ///
    /// [`ChoreError::NotFound`] if `id` is not active, or
    /// [`ChoreError::SuccessorConflict`] if a link already exists, the
    /// successor is `id` itself, or the successor is unknown.
    pub fn set_successor(&mut self, id: ChoreId, successor: ChoreId) -> Result<(), ChoreError> {
        let conflict = |reason| ChoreError::SuccessorConflict {
            id,
            successor,
            reason,
        };

        let chore = self.active.get(id).ok_or(ChoreError::NotFound(id))?;
        if chore.successor_id().is_some() {
            return Err(conflict("successor already set"));
        }
        if id == successor {
            return Err(conflict("a chore cannot succeed itself"));
        }
        if !self.active.contains(successor) && self.find_archived(successor)?.is_none() {
            return Err(conflict("successor does not exist"));
        }

        if let Some(chore) = self.active.get_mut(id) {
            chore.set_successor(successor);
        }
        self.persist()
    }

    /// The successor of `id` if it is still active.
    #[must_use]
    pub fn successor_of(&self, id: ChoreId) -> Option<&Chore> {
        self.active
            .get(id)
            .and_then(Chore::successor_id)
            .and_then(|s| self.active.get(s))
    }

    /// The chore to pick up after `id`, once `id` has finished.
    ///
    /// `id` and its successor are looked up in the active set first, then in
    /// the archive.
    ///
    /// # Errors
    ///
    /// [`ChoreError::NotFound`] if `id` is in neither store, or
    /// [`ChoreError::Store`] if the archive cannot be read.
    pub fn next_chore(&self, id: ChoreId) -> Result<Option<Chore>, ChoreError> {
        let owner = match self.active.get(id) {
            Some(c) => c.clone(),
            None => self.find_archived(id)?.ok_or(ChoreError::NotFound(id))?,
        };
        let Some(successor) = owner.actionable_successor() else {
            return Ok(None);
        };
        match self.active.get(successor) {
            Some(c) => Ok(Some(c.clone())),
            None => self.find_archived(successor),
        }
    }

    fn find_archived(&self, id: ChoreId) -> Result<Option<Chore>, ChoreError> {
        Ok(self
            .store
            .read_archive()?
            .into_iter()
            .find(|r| r.id == id)
            .map(Chore::from_record))
    }

    // -----------------------------------------------------------------------
    // Integrity
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns [`ChoreError::Store`] if either store cannot be read.
    pub fn validate_integrity(&self) -> Result<LocationReport, ChoreError> {
        Ok(self.lifecycle.validator().validate_locations()?)
    }

    /// Reconcile the stores, re-validate, and reload the in-memory set.
    ///
    /// # Errors
    ///
    /// Returns [`ChoreError::Store`] if a store cannot be read or written.
    pub fn repair(&mut self) -> Result<RepairReport, ChoreError> {
        let cleanup = self.lifecycle.archival().reconcile()?;
        let validation = self.lifecycle.validator().validate_locations()?;
        self.reload()?;
        info!(
            cleaned = cleanup.cleaned_count,
            remaining = cleanup.remaining_active,
            valid = validation.valid,
            "repair finished"
        );
        Ok(RepairReport {
            repaired: validation.valid,
            cleanup,
            validation,
        })
    }

    // -----------------------------------------------------------------------
    // Status / hook log
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn status_summary(&self) -> StatusSummary {
        let mut counts = BTreeMap::new();
        for chore in self.active.iter() {
            *counts.entry(chore.phase()).or_insert(0) += 1;
        }
        StatusSummary { counts }
    }

    /// Hook actions that failed since the log was last drained.
    #[must_use]
    pub fn hook_failures(&self) -> &[HookFailure] {
        &self.hook_failures
    }

    pub fn take_hook_failures(&mut self) -> Vec<HookFailure> {
        std::mem::take(&mut self.hook_failures)
    }

    fn record_failures(&mut self, failures: Vec<HookFailure>) {
        for failure in &failures {
            warn!(
                chore = %failure.chore_id,
                action = %failure.action,
                message = %failure.message,
                "workspace hook failed"
            );
        }
        self.hook_failures.extend(failures);
    }

    fn persist(&self) -> Result<(), ChoreError> {
        Ok(self.lifecycle.archival().persist_active(&self.active)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::HookAction;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Created(ChoreId),
        Changed(ChoreId, Phase, Phase),
        Deleted(ChoreId),
    }

    struct Recorder {
        events: Arc<Mutex<Vec<Event>>>,
        fail_on_create: bool,
    }

    impl ChoreObserver for Recorder {
        fn on_created(&mut self, chore: &Chore) -> Vec<HookFailure> {
            self.events.lock().unwrap().push(Event::Created(chore.id()));
            if self.fail_on_create {
                vec![HookFailure::new(
                    chore.id(),
                    HookAction::CreateWorkerWindow,
                    "tmux unavailable",
                )]
            } else {
                Vec::new()
            }
        }

        fn on_phase_changed(&mut self, chore: &Chore, from: Phase, to: Phase) -> Vec<HookFailure> {
            self.events
                .lock()
                .unwrap()
                .push(Event::Changed(chore.id(), from, to));
            Vec::new()
        }

        fn on_deleted(&mut self, id: ChoreId) -> Vec<HookFailure> {
            self.events.lock().unwrap().push(Event::Deleted(id));
            Vec::new()
        }
    }

    fn open(dir: &TempDir) -> Repository {
        let store = ChoreStore::from_active(dir.path().join("chores.jsonl"));
        Repository::open(store, Arc::new(IdGenerator::new(1).unwrap())).unwrap()
    }

    fn recording(dir: &TempDir, fail_on_create: bool) -> (Repository, Arc<Mutex<Vec<Event>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let repo = open(dir).with_observer(Box::new(Recorder {
            events: Arc::clone(&events),
            fail_on_create,
        }));
        (repo, events)
    }

    #[test]
    fn create_persists_and_notifies() {
        let dir = TempDir::new().unwrap();
        let (mut repo, events) = recording(&dir, false);

        let chore = repo.create("A", "first", None).unwrap();
        assert_eq!(chore.phase(), Phase::Design);
        assert_eq!(repo.read(chore.id()), Some(&chore));
        assert_eq!(repo.store().read_active().unwrap().len(), 1);
        assert_eq!(*events.lock().unwrap(), vec![Event::Created(chore.id())]);
    }

    #[test]
    fn create_with_unknown_parent_fails() {
        let dir = TempDir::new().unwrap();
        let mut repo = open(&dir);
        let err = repo.create("orphan", "", Some(ChoreId::new(5))).unwrap_err();
        assert!(matches!(err, ChoreError::ParentNotFound(_)));
        assert!(repo.list_all().is_empty());
    }

    #[test]
    fn update_fields_without_phase() {
        let dir = TempDir::new().unwrap();
        let mut repo = open(&dir);
        let id = repo.create("A", "", None).unwrap().id();

        let updated = repo
            .update(
                id,
                ChoreUpdate {
                    name: Some("A2".into()),
                    progress_info: Some("halfway".into()),
                    ..ChoreUpdate::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "A2");
        assert_eq!(updated.phase(), Phase::Design);

        let reopened = open(&dir);
        let stored = reopened.read(id).unwrap();
        assert_eq!(stored.name, "A2");
        assert_eq!(stored.progress_info.as_deref(), Some("halfway"));
    }

    #[test]
    fn invalid_phase_update_touches_no_field() {
        let dir = TempDir::new().unwrap();
        let mut repo = open(&dir);
        let id = repo.create("A", "", None).unwrap().id();

        let err = repo
            .update(
                id,
                ChoreUpdate {
                    name: Some("renamed".into()),
                    phase: Some(Phase::Plan),
                    ..ChoreUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ChoreError::Transition(_)));
        assert_eq!(repo.read(id).unwrap().name, "A");
    }

    #[test]
    fn terminal_update_returns_none_and_archives() {
        let dir = TempDir::new().unwrap();
        let (mut repo, events) = recording(&dir, false);
        let id = repo.create("A", "", None).unwrap().id();

        for _ in 0..7 {
            repo.advance(id, NoteUpdate::default()).unwrap();
        }
        assert_eq!(repo.read(id).unwrap().phase(), Phase::WorkReview);

        let result = repo
            .update(
                id,
                ChoreUpdate {
                    phase: Some(Phase::WorkDone),
                    review_info: Some("lgtm".into()),
                    ..ChoreUpdate::default()
                },
            )
            .unwrap();
        assert!(result.is_none());
        assert!(repo.read(id).is_none());

        let archived = repo.archived().unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].review_info.as_deref(), Some("lgtm"));
        assert_eq!(
            events.lock().unwrap().last(),
            Some(&Event::Changed(id, Phase::WorkReview, Phase::WorkDone))
        );
    }

    #[test]
    fn delete_cascades_children_first() {
        let dir = TempDir::new().unwrap();
        let (mut repo, events) = recording(&dir, false);
        let parent = repo.create("P", "", None).unwrap().id();
        let child = repo.create("C", "", Some(parent)).unwrap().id();
        let grandchild = repo.create("G", "", Some(child)).unwrap().id();
        let other = repo.create("O", "", None).unwrap().id();

        let deleted = repo.delete(parent).unwrap();
        assert_eq!(deleted, vec![grandchild, child, parent]);
        assert_eq!(repo.list_all().len(), 1);
        assert!(repo.read(other).is_some());

        let deletes: Vec<Event> = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, Event::Deleted(_)))
            .cloned()
            .collect();
        assert_eq!(
            deletes,
            vec![
                Event::Deleted(grandchild),
                Event::Deleted(child),
                Event::Deleted(parent)
            ]
        );
        assert_eq!(open(&dir).list_all().len(), 1);
    }

    #[test]
    fn delete_survives_hand_edited_parent_cycles() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("chores.jsonl"),
            concat!(
                r#"{"id":1,"name":"self","phase":"design","parent_id":1}"#,
                "\n",
                r#"{"id":2,"name":"a","phase":"design","parent_id":3}"#,
                "\n",
                r#"{"id":3,"name":"b","phase":"design","parent_id":2}"#,
                "\n",
            ),
        )
        .unwrap();
        let mut repo = open(&dir);
        assert!(repo.active().can_advance(ChoreId::new(1)));

        assert_eq!(repo.delete(ChoreId::new(1)).unwrap(), vec![ChoreId::new(1)]);
        let deleted = repo.delete(ChoreId::new(2)).unwrap();
        assert_eq!(deleted, vec![ChoreId::new(3), ChoreId::new(2)]);
        assert!(open(&dir).list_all().is_empty());
    }

    #[test]
    fn hook_failures_are_logged_not_raised() {
        let dir = TempDir::new().unwrap();
        let (mut repo, _events) = recording(&dir, true);

        let chore = repo.create("A", "", None).unwrap();
        assert!(repo.read(chore.id()).is_some());
        assert_eq!(repo.hook_failures().len(), 1);
        assert_eq!(repo.hook_failures()[0].action, HookAction::CreateWorkerWindow);

        let drained = repo.take_hook_failures();
        assert_eq!(drained.len(), 1);
        assert!(repo.hook_failures().is_empty());
    }

    #[test]
    fn successor_is_set_once_and_actionable_after_done() {
        let dir = TempDir::new().unwrap();
        let mut repo = open(&dir);
        let first = repo.create("first", "", None).unwrap().id();
        let second = repo.create("second", "", None).unwrap().id();

        assert!(matches!(
            repo.set_successor(first, first),
            Err(ChoreError::SuccessorConflict { .. })
        ));
        assert!(matches!(
            repo.set_successor(first, ChoreId::new(1)),
            Err(ChoreError::SuccessorConflict { .. })
        ));
        repo.set_successor(first, second).unwrap();
        assert!(matches!(
            repo.set_successor(first, second),
            Err(ChoreError::SuccessorConflict { .. })
        ));

        assert_eq!(repo.successor_of(first).map(Chore::id), Some(second));
        assert_eq!(repo.next_chore(first).unwrap(), None);

        while repo.read(first).is_some() {
            repo.advance(first, NoteUpdate::default()).unwrap();
        }
        let next = repo.next_chore(first).unwrap().unwrap();
        assert_eq!(next.id(), second);
    }

    #[test]
    fn repair_reconciles_and_reloads() {
        let dir = TempDir::new().unwrap();
        let mut repo = open(&dir);
        let keep = repo.create("keep", "", None).unwrap();
        let stale = repo.create("stale", "", None).unwrap();

        let mut stale_done = stale.to_record();
        stale_done.phase = Phase::WorkDone;
        repo.store()
            .rewrite_active(&[keep.to_record(), stale_done])
            .unwrap();
        assert!(!repo.validate_integrity().unwrap().valid);

        let report = repo.repair().unwrap();
        assert!(report.repaired);
        assert_eq!(report.cleanup.cleaned_count, 1);
        assert_eq!(report.cleanup.remaining_active, 1);
        assert!(repo.read(stale.id()).is_none());
        assert!(repo.read(keep.id()).is_some());
    }

    #[test]
    fn status_summary_uses_short_labels() {
        let dir = TempDir::new().unwrap();
        let mut repo = open(&dir);
        assert_eq!(repo.status_summary().to_string(), "Chores[none]");

        let a = repo.create("a", "", None).unwrap().id();
        repo.create("b", "", None).unwrap();
        repo.create("c", "", None).unwrap();
        for _ in 0..6 {
            repo.advance(a, NoteUpdate::default()).unwrap();
        }

        let summary = repo.status_summary();
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.to_string(), "Chores[DSN:2 WRK:1]");
    }
}
