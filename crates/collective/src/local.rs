//! In-process collective group
//!
//! Rendezvous-based implementation of [`Collective`] for participants that
//! are threads of one process. Used by tests, benches, and the simulation
//! binary; production deployments plug a real transport in behind the same
//! trait.

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};
use runtime_core::{Error, Rank, Result};
use std::sync::Arc;
use tracing::trace;

use crate::Collective;

/// Per-round rendezvous bookkeeping
///
/// A round is one collective call. All participants arrive, the last
/// arrival opens the release phase, all participants read, and the last
/// departure resets the slot for the next round.
#[derive(Default)]
struct Round {
    generation: u64,
    arrived: usize,
    departed: usize,
    open: bool,
    payload: Option<Bytes>,
    flag: bool,
}

struct GroupInner {
    world_size: usize,
    round: Mutex<Round>,
    cv: Condvar,
}

/// An in-process group of collective participants
///
/// Hands out one [`LocalCollective`] per rank; all handles share the same
/// rendezvous state.
pub struct LocalGroup {
    inner: Arc<GroupInner>,
}

impl LocalGroup {
    /// Create a group with `world_size` participants
    pub fn new(world_size: usize) -> Self {
        assert!(world_size > 0, "group must have at least one participant");
        Self {
            inner: Arc::new(GroupInner {
                world_size,
                round: Mutex::new(Round::default()),
                cv: Condvar::new(),
            }),
        }
    }

    /// Handle for the participant at `rank`
    pub fn member(&self, rank: Rank) -> LocalCollective {
        assert!(
            (rank as usize) < self.inner.world_size,
            "rank {} outside group of {}",
            rank,
            self.inner.world_size
        );
        LocalCollective {
            rank,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Handles for every rank, in rank order
    pub fn members(&self) -> Vec<LocalCollective> {
        (0..self.inner.world_size as Rank)
            .map(|rank| self.member(rank))
            .collect()
    }

    /// Number of participants in the group
    pub fn world_size(&self) -> usize {
        self.inner.world_size
    }
}

/// One participant's handle to a [`LocalGroup`]
pub struct LocalCollective {
    rank: Rank,
    inner: Arc<GroupInner>,
}

impl LocalCollective {
    /// Run one collective round: contribute, wait for the group, read
    fn rendezvous<T>(
        &self,
        contribute: impl FnOnce(&mut Round),
        read: impl FnOnce(&Round) -> T,
    ) -> T {
        let mut round = self.inner.round.lock();

        // The previous round may still be draining; wait for its reset.
        while round.open {
            self.inner.cv.wait(&mut round);
        }

        let generation = round.generation;
        contribute(&mut round);
        round.arrived += 1;
        trace!(
            rank = self.rank,
            generation = generation,
            arrived = round.arrived,
            "Arrived at rendezvous"
        );

        if round.arrived == self.inner.world_size {
            round.open = true;
            self.inner.cv.notify_all();
        } else {
            while !(round.open && round.generation == generation) {
                self.inner.cv.wait(&mut round);
            }
        }

        let out = read(&round);

        round.departed += 1;
        if round.departed == self.inner.world_size {
            round.generation = round.generation.wrapping_add(1);
            round.arrived = 0;
            round.departed = 0;
            round.open = false;
            round.payload = None;
            round.flag = false;
            self.inner.cv.notify_all();
        }
        out
    }
}

impl Collective for LocalCollective {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.inner.world_size
    }

    fn broadcast(&self, payload: Bytes, source: Rank) -> Result<Bytes> {
        if source as usize >= self.inner.world_size {
            return Err(Error::Internal {
                message: format!(
                    "broadcast source {} outside group of {}",
                    source, self.inner.world_size
                ),
            });
        }

        let is_source = self.rank == source;
        let value = self.rendezvous(
            |round| {
                if is_source {
                    round.payload = Some(payload.clone());
                }
            },
            |round| round.payload.clone(),
        );

        value.ok_or_else(|| Error::Internal {
            message: format!("broadcast source {} contributed no payload", source),
        })
    }

    fn all_or(&self, value: bool) -> Result<bool> {
        Ok(self.rendezvous(|round| round.flag |= value, |round| round.flag))
    }
}
