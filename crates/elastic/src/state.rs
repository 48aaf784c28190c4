//! Tracked state for elastic computations
//!
//! A [`State`] owns the in-memory progress of one participant: it can be
//! saved, restored, and synchronized across the group, and it carries the
//! pending membership updates delivered by the notifier.

use runtime_core::{
    CallbackErrorPolicy, ElasticConfig, Error, HostUpdates, Result, Timestamp,
};
use tracing::{debug, info};

/// A reset callback, run after a worker is added or removed
///
/// A common use is rescaling the learning rate to the new group size.
pub type ResetCallback = Box<dyn FnMut() -> Result<()> + Send>;

/// Bookkeeping shared by every [`State`] implementation
///
/// Holds the pending membership-update queue, the high-water timestamp, and
/// the ordered reset-callback list.
pub struct StateCore {
    host_updates: HostUpdates,
    last_updated_timestamp: Timestamp,
    reset_callbacks: Vec<ResetCallback>,
    config: ElasticConfig,
}

impl StateCore {
    /// Create with the default configuration
    pub fn new() -> Self {
        Self::with_config(ElasticConfig::default())
    }

    /// Create with an explicit configuration
    pub fn with_config(config: ElasticConfig) -> Self {
        Self {
            host_updates: HostUpdates::new(),
            last_updated_timestamp: 0,
            reset_callbacks: Vec::new(),
            config,
        }
    }

    /// Configuration this state was built with
    pub fn config(&self) -> &ElasticConfig {
        &self.config
    }

    /// Handle to register with a notifier
    ///
    /// The handle shares this state's pending queue; the notifier appends
    /// from its own thread while the owning worker drains during commit.
    pub fn listener(&self) -> HostUpdates {
        self.host_updates.clone()
    }

    /// Highest membership timestamp accepted so far
    pub fn last_updated_timestamp(&self) -> Timestamp {
        self.last_updated_timestamp
    }

    /// Append callbacks to the reset list; insertion order is execution order
    pub fn register_reset_callbacks(&mut self, callbacks: Vec<ResetCallback>) {
        self.reset_callbacks.extend(callbacks);
    }

    /// Drain pending membership updates
    ///
    /// Advances the high-water timestamp to the maximum drained value and
    /// returns whether anything newer than it was seen.
    pub(crate) fn drain_host_updates(&mut self) -> bool {
        let mut updated = false;
        for timestamp in self.host_updates.drain() {
            if timestamp > self.last_updated_timestamp {
                self.last_updated_timestamp = timestamp;
                updated = true;
            }
        }
        updated
    }

    /// Run every registered reset callback per the configured policy
    pub(crate) fn run_reset_callbacks(&mut self) -> Result<()> {
        match self.config.on_callback_error {
            CallbackErrorPolicy::Abort => {
                for callback in &mut self.reset_callbacks {
                    callback()?;
                }
                Ok(())
            }
            CallbackErrorPolicy::RunAll => {
                let mut failures = Vec::new();
                for callback in &mut self.reset_callbacks {
                    if let Err(err) = callback() {
                        failures.push(err.to_string());
                    }
                }
                if failures.is_empty() {
                    Ok(())
                } else {
                    Err(Error::ResetCallbackFailed {
                        message: failures.join("; "),
                    })
                }
            }
        }
    }
}

impl Default for StateCore {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory progress tracked across the group
///
/// Implementations override the four state operations; the commit and
/// membership-check protocol is provided.
pub trait State {
    /// Shared bookkeeping
    fn core(&self) -> &StateCore;

    /// Shared bookkeeping, mutable
    fn core_mut(&mut self) -> &mut StateCore;

    /// Snapshot current progress so it can be restored later
    fn save(&mut self) -> Result<()> {
        Err(Error::not_implemented("save"))
    }

    /// Revert to the last saved snapshot, discarding uncommitted mutation
    fn restore(&mut self) -> Result<()> {
        Err(Error::not_implemented("restore"))
    }

    /// Align this state with every other participant's
    fn sync(&mut self) -> Result<()> {
        Err(Error::not_implemented("sync"))
    }

    /// Collectively agree on whether membership changed
    ///
    /// Takes this participant's local observation and returns the group
    /// decision, identical on every rank.
    fn sync_membership(&self, _locally_updated: bool) -> Result<bool> {
        Err(Error::not_implemented("sync_membership"))
    }

    /// Append callbacks invoked after a reset event (worker added or removed)
    fn register_reset_callbacks(&mut self, callbacks: Vec<ResetCallback>) {
        self.core_mut().register_reset_callbacks(callbacks);
    }

    /// Fire every registered reset callback in registration order
    fn on_reset(&mut self) -> Result<()> {
        self.core_mut().run_reset_callbacks()
    }

    /// Commit tracked progress and check for membership changes
    ///
    /// Commits are heavy (potentially copying data out of accelerator
    /// memory), so committing less often than once per unit of work trades
    /// lost steps on failure against per-step overhead.
    ///
    /// # Errors
    /// Returns [`Error::MembershipChanged`] once the group agrees the host
    /// set changed; the run loop treats that as a restart signal, not a
    /// fault.
    fn commit(&mut self) -> Result<()> {
        self.save()?;
        self.check_host_updates()
    }

    /// Drain local updates, then agree globally whether membership changed
    ///
    /// Each participant may observe a different local queue, so the local
    /// answer is reduced across the group before anyone raises: either
    /// every rank sees the signal on this round or none does.
    fn check_host_updates(&mut self) -> Result<()> {
        let locally_updated = self.core_mut().drain_host_updates();
        let updated = self.sync_membership(locally_updated)?;
        if updated {
            info!(
                last_updated_timestamp = self.core().last_updated_timestamp(),
                "Membership change agreed across group"
            );
            Err(Error::MembershipChanged)
        } else {
            debug!("No membership change this round");
            Ok(())
        }
    }
}
