//! Collective - Group communication primitives for the elastic runtime
//!
//! Defines the narrow interface the runtime needs from a collective
//! communication substrate, plus an in-process implementation for tests,
//! benches, and simulation.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use collective::{Collective, LocalGroup};
//!
//! # fn example() -> runtime_core::Result<()> {
//! let group = LocalGroup::new(1);
//! let member = group.member(0);
//! let value = member.broadcast(Bytes::from_static(b"state"), 0)?;
//! assert_eq!(&value[..], b"state");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod backend;
mod local;

pub use backend::Collective;
pub use local::{LocalCollective, LocalGroup};
