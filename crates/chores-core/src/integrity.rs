//! Read-only consistency scan over the active and archive stores.
//!
//! A chore must live in exactly one store, and its location must agree with
//! its phase: only `work_done` chores belong in the archive, and no
//! `work_done` chore should remain active once its transition has committed.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use crate::error::ErrorCode;
use crate::model::{ChoreId, Phase};
use crate::store::{ChoreStore, StoreError};

/// Integrity failure or an operation attempted in the wrong phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("chore {id} is in {phase}; only work_done chores can be archived")]
    NotTerminal { id: ChoreId, phase: Phase },

    #[error("integrity check failed: {}", .issues.join("; "))]
    Integrity { issues: Vec<String> },
}

impl ValidationError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotTerminal { .. } => ErrorCode::WrongPhase,
            Self::Integrity { .. } => ErrorCode::IntegrityViolation,
        }
    }
}

/// Result of [`IntegrityValidator::validate_locations`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationReport {
    pub active_count: usize,
    pub completed_count: usize,
    pub dual_location_count: usize,
    pub issues: Vec<String>,
    pub valid: bool,
}

impl LocationReport {
    /// Convert an invalid report into the matching error.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Integrity`] when the report is not valid.
    pub fn into_result(self) -> Result<Self, ValidationError> {
        if self.valid {
            Ok(self)
        } else {
            Err(ValidationError::Integrity {
                issues: self.issues,
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntegrityValidator {
    store: ChoreStore,
}

impl IntegrityValidator {
    #[must_use]
    pub const fn new(store: ChoreStore) -> Self {
        Self { store }
    }

    /// Scan both stores and report every location violation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if either store cannot be read.
    pub fn validate_locations(&self) -> Result<LocationReport, StoreError> {
        let mut issues = Vec::new();

        let mut active_ids = BTreeSet::new();
        for record in self.store.read_active()? {
            active_ids.insert(record.id);
            if record.phase.is_terminal() {
                issues.push(format!("Completed chore {} in active file", record.id));
            }
        }

        let mut completed_ids = BTreeSet::new();
        for record in self.store.read_archive()? {
            completed_ids.insert(record.id);
            if !record.phase.is_terminal() {
                issues.push(format!("Non-completed chore {} in completed file", record.id));
            }
        }

        let dual: Vec<ChoreId> = active_ids.intersection(&completed_ids).copied().collect();
        for id in &dual {
            issues.push(format!("Chore {id} exists in both active and completed files"));
        }

        for issue in &issues {
            warn!(%issue, "integrity issue");
        }

        Ok(LocationReport {
            active_count: active_ids.len(),
            completed_count: completed_ids.len(),
            dual_location_count: dual.len(),
            valid: issues.is_empty(),
            issues,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChoreRecord;
    use tempfile::TempDir;

    fn record(id: u64, phase: Phase) -> ChoreRecord {
        ChoreRecord {
            id: ChoreId::new(id),
            name: format!("c{id}"),
            description: String::new(),
            phase,
            successor_id: None,
            progress_info: None,
            review_info: None,
            parent_id: None,
        }
    }

    #[test]
    fn empty_stores_are_valid() {
        let dir = TempDir::new().unwrap();
        let validator = IntegrityValidator::new(ChoreStore::from_active(dir.path().join("c.jsonl")));
        let report = validator.validate_locations().unwrap();
        assert!(report.valid);
        assert_eq!(report.active_count, 0);
        assert_eq!(report.completed_count, 0);
    }

    #[test]
    fn reports_every_kind_of_violation() {
        let dir = TempDir::new().unwrap();
        let store = ChoreStore::from_active(dir.path().join("c.jsonl"));
        store
            .rewrite_active(&[record(1, Phase::Work), record(2, Phase::WorkDone), record(3, Phase::Plan)])
            .unwrap();
        store.append_archive(&record(3, Phase::WorkDone)).unwrap();
        store.append_archive(&record(4, Phase::PlanReview)).unwrap();

        let report = IntegrityValidator::new(store).validate_locations().unwrap();
        assert!(!report.valid);
        assert_eq!(report.active_count, 3);
        assert_eq!(report.completed_count, 2);
        assert_eq!(report.dual_location_count, 1);
        assert_eq!(
            report.issues,
            vec![
                "Completed chore 2 in active file".to_string(),
                "Non-completed chore 4 in completed file".to_string(),
                "Chore 3 exists in both active and completed files".to_string(),
            ]
        );

        let err = report.into_result().unwrap_err();
        assert_eq!(err.code(), ErrorCode::IntegrityViolation);
    }
}
