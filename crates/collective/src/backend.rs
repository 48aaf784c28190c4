//! Collective backend trait definition
//!
//! Defines the interface the runtime consumes from the underlying
//! collective communication substrate.

use bytes::Bytes;
use runtime_core::{Rank, Result};

/// Interface to a group of participants making synchronized collective calls
///
/// Every operation is collective: each live participant must invoke it, in
/// the same relative order as every other participant. A mismatched call
/// sequence blocks the group indefinitely; timeout and failure detection
/// belong to the transport layer, which surfaces them as worker failures.
pub trait Collective: Send + Sync {
    /// Rank of this participant within the group
    fn rank(&self) -> Rank;

    /// Number of participants in the group
    fn world_size(&self) -> usize;

    /// Send `payload` from `source` to every participant
    ///
    /// # Arguments
    /// * `payload` - Payload to distribute; ignored on non-source ranks
    /// * `source` - Rank whose payload wins
    ///
    /// # Returns
    /// The source's payload, identical on every participant
    ///
    /// # Errors
    /// Returns error if the payload cannot be transmitted or `source` is
    /// outside the group
    fn broadcast(&self, payload: Bytes, source: Rank) -> Result<Bytes>;

    /// Reduce a boolean across the group with logical OR
    ///
    /// # Arguments
    /// * `value` - This participant's local observation
    ///
    /// # Returns
    /// `true` on every participant if any participant contributed `true`
    fn all_or(&self, value: bool) -> Result<bool>;
}
