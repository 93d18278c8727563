//! tmux orchestration for chores.
//!
//! Each chore gets a worker window in a resolved session; review phases add
//! a reviewer pane beside the worker. [`hooks::LifecycleHooks`] plugs into
//! [`chores_core::Repository`] as its observer, so windows follow the
//! chore's phase without the caller doing anything.
//!
//! All tmux access goes through the [`command::Multiplexer`] trait. The real
//! implementation is [`command::TmuxCli`]; [`fake::FakeTmux`] keeps state in
//! memory for tests.

pub mod binary;
pub mod command;
pub mod error;
pub mod fake;
pub mod hooks;
pub mod naming;
pub mod session;
pub mod workspace;

pub use command::{Multiplexer, TmuxCli};
pub use error::TmuxError;
pub use hooks::LifecycleHooks;
pub use session::{ResolvedSession, SessionResolver};
pub use workspace::{OrchestrationError, OrchestratorOptions, WorkspaceOrchestrator};
