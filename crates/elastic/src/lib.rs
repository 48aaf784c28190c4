//! Elastic - Fault-tolerant execution driver
//!
//! Drives a long-running distributed computation through worker failures
//! and membership changes. Progress lives in a committable [`State`]; the
//! [`ElasticRunner`] restores, resets, and retries so the caller never
//! writes recovery logic.

pub mod object_state;
pub mod runner;
pub mod state;

pub use object_state::ObjectState;
pub use runner::{ElasticRunner, RunStats};
pub use state::{ResetCallback, State, StateCore};
