//! State over a flat set of named values

use bytes::Bytes;
use collective::Collective;
use runtime_core::{ElasticConfig, Error, Result, TrackedValue, TrackedValues};
use std::sync::Arc;
use tracing::debug;

use crate::state::{State, StateCore};

/// Concrete [`State`] tracking an explicit name-to-value mapping
///
/// The tracked name set is fixed at construction; live values are mutated
/// through [`ObjectState::set`], snapshotted by `save`, and aligned across
/// the group by `sync`, which broadcasts the saved mapping from the
/// configured source rank.
pub struct ObjectState {
    core: StateCore,
    collective: Arc<dyn Collective>,
    live: TrackedValues,
    saved: TrackedValues,
}

impl ObjectState {
    /// Create with the default configuration
    ///
    /// The initial mapping becomes both the live values and the first
    /// saved snapshot.
    pub fn new(collective: Arc<dyn Collective>, initial: TrackedValues) -> Self {
        Self::with_config(collective, initial, ElasticConfig::default())
    }

    /// Create with an explicit configuration
    pub fn with_config(
        collective: Arc<dyn Collective>,
        initial: TrackedValues,
        config: ElasticConfig,
    ) -> Self {
        Self {
            core: StateCore::with_config(config),
            collective,
            live: initial.clone(),
            saved: initial,
        }
    }

    /// Current live value of a tracked attribute
    pub fn get(&self, name: &str) -> Option<&TrackedValue> {
        self.live.get(name)
    }

    /// Live value as an unsigned counter
    pub fn get_uint(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(TrackedValue::as_uint)
    }

    /// Live value as a float
    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(TrackedValue::as_float)
    }

    /// Live value as a boolean
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(TrackedValue::as_bool)
    }

    /// Overwrite the live value of a tracked attribute
    ///
    /// # Errors
    /// Returns [`Error::UnknownAttribute`] for names outside the set fixed
    /// at construction.
    pub fn set(&mut self, name: &str, value: impl Into<TrackedValue>) -> Result<()> {
        match self.live.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(Error::UnknownAttribute {
                name: name.to_string(),
            }),
        }
    }

    /// Names tracked by this state, in order
    pub fn tracked_names(&self) -> impl Iterator<Item = &str> {
        self.live.keys().map(String::as_str)
    }

    fn encode(values: &TrackedValues) -> Result<Bytes> {
        let payload = bincode::serialize(values).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Bytes::from(payload))
    }

    fn decode(payload: &[u8]) -> Result<TrackedValues> {
        bincode::deserialize(payload).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl State for ObjectState {
    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn save(&mut self) -> Result<()> {
        self.saved = self.live.clone();
        debug!(attributes = self.saved.len(), "Saved tracked state");
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        self.live = self.saved.clone();
        debug!(attributes = self.live.len(), "Restored last saved state");
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        if self.saved.is_empty() {
            return Ok(());
        }

        let source = self.core.config().sync_source;
        let payload = Self::encode(&self.saved)?;
        let merged = self.collective.broadcast(payload, source)?;
        self.saved = Self::decode(&merged)?;
        self.live = self.saved.clone();
        debug!(
            source = source,
            attributes = self.live.len(),
            "Synchronized tracked state across group"
        );
        Ok(())
    }

    fn sync_membership(&self, locally_updated: bool) -> Result<bool> {
        self.collective.all_or(locally_updated)
    }
}
