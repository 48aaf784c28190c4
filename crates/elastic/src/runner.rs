//! Resilient run loop
//!
//! Wraps a user computation and drives it through failure, reset, and
//! restart cycles until it returns or fails unrecoverably.

use chrono::{DateTime, Utc};
use runtime_core::{MembershipNotifier, Recovery, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::state::State;

/// Counters describing one resilient run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Worker failures recovered by restore + reset + retry
    pub worker_failures: u64,

    /// Membership changes recovered by reset + re-sync + retry
    pub membership_changes: u64,

    /// Reset cycles performed (external reset plus state callbacks)
    pub resets: u64,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,
}

/// Drives a user computation through recovery cycles
///
/// The runner registers the state's listener with the membership notifier
/// for exactly the duration of one [`run`](ElasticRunner::run) invocation,
/// then loops: reset if required, synchronize state across the group,
/// invoke the computation, and classify any failure into a recovery action.
pub struct ElasticRunner<'a> {
    notifier: &'a MembershipNotifier,
    stats: RunStats,
}

impl<'a> ElasticRunner<'a> {
    /// Create a runner against the given notifier
    pub fn new(notifier: &'a MembershipNotifier) -> Self {
        Self {
            notifier,
            stats: RunStats::default(),
        }
    }

    /// Counters from the most recent run
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Run `func` to completion, recovering from transient failures
    ///
    /// `reset` rebuilds resources tied to cluster topology (for example a
    /// partition plan) and runs before the state's own reset callbacks.
    ///
    /// A worker failure restores the last committed state before retrying;
    /// a membership change retries without restore, since the last commit
    /// is already the agreed recovery point. Anything else propagates, and
    /// the listener registration is released on every exit path.
    pub fn run<S, T, R, F>(&mut self, state: &mut S, mut reset: R, mut func: F) -> Result<T>
    where
        S: State,
        R: FnMut() -> Result<()>,
        F: FnMut(&mut S) -> Result<T>,
    {
        let _listener = self
            .notifier
            .register_scoped(Arc::new(state.core().listener()));
        self.stats = RunStats {
            started_at: Some(Utc::now()),
            ..RunStats::default()
        };

        let mut reset_required = false;
        loop {
            if reset_required {
                reset()?;
                state.on_reset()?;
                self.stats.resets += 1;
                reset_required = false;
            }

            state.sync()?;

            match func(state) {
                Ok(value) => {
                    info!(
                        resets = self.stats.resets,
                        worker_failures = self.stats.worker_failures,
                        membership_changes = self.stats.membership_changes,
                        "Computation returned"
                    );
                    return Ok(value);
                }
                Err(err) => match err.recovery() {
                    Recovery::Restore => {
                        warn!(error = %err, "Worker failure, restoring last committed state");
                        state.restore()?;
                        self.stats.worker_failures += 1;
                        reset_required = true;
                    }
                    Recovery::Resync => {
                        info!("Membership changed, restarting without restore");
                        self.stats.membership_changes += 1;
                        reset_required = true;
                    }
                    Recovery::Fatal => {
                        error!(error = %err, "Unrecoverable failure");
                        return Err(err);
                    }
                },
            }
        }
    }
}
