//! Chore data model: ids, phases and the chore entity itself.

pub mod chore;
pub mod chore_id;
pub mod phase;

pub use chore::{Chore, ChoreRecord};
pub use chore_id::ChoreId;
pub use phase::{InvalidTransition, ParsePhaseError, Phase, Role};
