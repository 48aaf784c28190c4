//! Runtime Core - Foundation for the elastic execution runtime
//!
//! Provides core types, error handling, configuration, and the membership
//! notification machinery for fault-tolerant distributed computations.

pub mod config;
pub mod error;
pub mod membership;
pub mod types;

pub use config::{CallbackErrorPolicy, ElasticConfig};
pub use error::{Error, Recovery, Result};
pub use membership::{HostUpdateListener, HostUpdates, ListenerGuard, MembershipNotifier};
pub use types::*;
