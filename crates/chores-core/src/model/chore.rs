use serde::{Deserialize, Serialize};

use super::{ChoreId, Phase};
use crate::id::{Clock, IdError, IdGenerator};

/// One line of the active or archive store.
///
/// Older stores wrote the phase as `status` and the successor as
/// `next_chore_id`; both spellings are accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoreRecord {
    pub id: ChoreId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "status")]
    pub phase: Phase,
    #[serde(default, alias = "next_chore_id", skip_serializing_if = "Option::is_none")]
    pub successor_id: Option<ChoreId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ChoreId>,
}

/// A unit of work moving through the phase workflow.
///
/// `id` and `parent_id` are fixed at construction. `phase` only changes
/// through [`crate::transition`]. `children` is derived state: it is rebuilt
/// from `parent_id` links whenever the active set is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chore {
    id: ChoreId,
    pub name: String,
    pub description: String,
    phase: Phase,
    pub progress_info: Option<String>,
    pub review_info: Option<String>,
    successor_id: Option<ChoreId>,
    parent_id: Option<ChoreId>,
    children: Vec<ChoreId>,
}

impl Chore {
    /// Create a brand-new chore in the first phase with a freshly generated id.
    ///
    /// # Errors
    ///
    /// Propagates [`IdError`] from the generator.
    pub fn create<C: Clock>(
        ids: &IdGenerator<C>,
        name: impl Into<String>,
        description: impl Into<String>,
        parent_id: Option<ChoreId>,
    ) -> Result<Self, IdError> {
        Ok(Self {
            id: ids.next_id()?,
            name: name.into(),
            description: description.into(),
            phase: Phase::FIRST,
            progress_info: None,
            review_info: None,
            successor_id: None,
            parent_id,
            children: Vec::new(),
        })
    }

    /// Rebuild a chore from a persisted record without touching the generator.
    #[must_use]
    pub fn from_record(record: ChoreRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            phase: record.phase,
            progress_info: record.progress_info,
            review_info: record.review_info,
            successor_id: record.successor_id,
            parent_id: record.parent_id,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn to_record(&self) -> ChoreRecord {
        ChoreRecord {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            phase: self.phase,
            successor_id: self.successor_id,
            progress_info: self.progress_info.clone(),
            review_info: self.review_info.clone(),
            parent_id: self.parent_id,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ChoreId {
        self.id
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    #[must_use]
    pub const fn parent_id(&self) -> Option<ChoreId> {
        self.parent_id
    }

    #[must_use]
    pub const fn successor_id(&self) -> Option<ChoreId> {
        self.successor_id
    }

    /// The successor link, but only once this chore has finished.
    #[must_use]
    pub const fn actionable_successor(&self) -> Option<ChoreId> {
        if self.phase.is_terminal() {
            self.successor_id
        } else {
            None
        }
    }

    #[must_use]
    pub fn children(&self) -> &[ChoreId] {
        &self.children
    }

    pub(crate) const fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) const fn set_successor(&mut self, successor: ChoreId) {
        self.successor_id = Some(successor);
    }

    pub(crate) fn add_child(&mut self, child: ChoreId) {
        if let Err(pos) = self.children.binary_search(&child) {
            self.children.insert(pos, child);
        }
    }

    pub(crate) fn remove_child(&mut self, child: ChoreId) {
        self.children.retain(|c| *c != child);
    }
}

impl std::fmt::Display for Chore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Chore({}, '{}', {})", self.id, self.name, self.phase)
    }
}
