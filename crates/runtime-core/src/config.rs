//! Runtime configuration types

use crate::types::Rank;
use serde::{Deserialize, Serialize};

/// Configuration for elastic state tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticConfig {
    /// Rank that acts as the source of truth when state is synchronized
    pub sync_source: Rank,

    /// How reset callback failures are handled
    pub on_callback_error: CallbackErrorPolicy,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            sync_source: 0,
            on_callback_error: CallbackErrorPolicy::Abort,
        }
    }
}

/// Policy for handling a failing reset callback
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallbackErrorPolicy {
    /// Stop at the first failing callback; remaining callbacks do not run
    Abort,

    /// Run every callback, then report all collected failures together
    RunAll,
}
