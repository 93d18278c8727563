//! Moving finished chores from the active store to the archive store.
//!
//! [`ArchivalManager::archive`] and [`ArchivalManager::remove_from_active`]
//! are the two halves of one move; single-store residency only holds once
//! both have run and the active set has been persisted.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::info;

use crate::active::ActiveSet;
use crate::error::ChoreError;
use crate::integrity::ValidationError;
use crate::model::{Chore, ChoreId};
use crate::store::{ChoreStore, StoreError};

/// Result of [`ArchivalManager::reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub cleaned_count: usize,
    pub remaining_active: usize,
}

#[derive(Debug, Clone)]
pub struct ArchivalManager {
    store: ChoreStore,
}

impl ArchivalManager {
    #[must_use]
    pub const fn new(store: ChoreStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub const fn store(&self) -> &ChoreStore {
        &self.store
    }

    /// Append a finished chore to the archive store.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotTerminal`] for an unfinished chore, or a
    /// store error if the append fails.
    pub fn archive(&self, chore: &Chore) -> Result<(), ChoreError> {
        if !chore.is_complete() {
            return Err(ValidationError::NotTerminal {
                id: chore.id(),
                phase: chore.phase(),
            }
            .into());
        }
        self.store.append_archive(&chore.to_record())?;
        info!(id = %chore.id(), "archived chore");
        Ok(())
    }

    /// Drop a chore from the in-memory active set. The store file is not touched.
    #[allow(clippy::unused_self)]
    pub fn remove_from_active(&self, id: ChoreId, active: &mut ActiveSet) -> Option<Chore> {
        active.remove(id)
    }

    /// Rewrite the active store from the in-memory set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the rewrite fails.
    pub fn persist_active(&self, active: &ActiveSet) -> Result<(), StoreError> {
        self.store.rewrite_active(&active.records())
    }

    /// Self-healing pass over the stores.
    ///
    /// Every active record that is terminal or already archived is archived
    /// (unless already present) and dropped from the active store. Running it
    /// on a consistent store changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if either store cannot be read or written.
    pub fn reconcile(&self) -> Result<ReconcileReport, StoreError> {
        let active = self.store.read_active()?;
        let mut archived: BTreeSet<ChoreId> =
            self.store.read_archive()?.iter().map(|r| r.id).collect();

        let mut kept = Vec::with_capacity(active.len());
        let mut cleaned_count = 0;
        for record in active {
            if record.phase.is_terminal() || archived.contains(&record.id) {
                if archived.insert(record.id) {
                    self.store.append_archive(&record)?;
                }
                info!(id = %record.id, "reconcile removed chore from active store");
                cleaned_count += 1;
            } else {
                kept.push(record);
            }
        }

        if cleaned_count > 0 {
            self.store.rewrite_active(&kept)?;
        }

        Ok(ReconcileReport {
            cleaned_count,
            remaining_active: kept.len(),
        })
    }
}
