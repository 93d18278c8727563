//! chores-core: the chore model, phase state machine and persistence.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums per concern, each mapped to a stable
//!   [`error::ErrorCode`]. Config loading uses `anyhow::Result`.
//! - **Logging**: `tracing` macros. Committed changes log at `info`, store
//!   I/O at `debug`, integrity issues and hook failures at `warn`.

pub mod active;
pub mod archive;
pub mod config;
pub mod error;
pub mod id;
pub mod integrity;
pub mod lifecycle;
pub mod model;
pub mod observer;
pub mod repository;
pub mod store;
pub mod transition;

pub use error::{ChoreError, ErrorCode};
pub use model::{Chore, ChoreId, ChoreRecord, Phase, Role};
pub use repository::Repository;
