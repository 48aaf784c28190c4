//! Core type definitions for the elastic execution runtime

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rank of a participant within the distributed group
pub type Rank = u32;

/// Logical timestamp of a membership event, strictly increasing per notifier
pub type Timestamp = u64;

/// Ordered mapping from attribute name to tracked value
pub type TrackedValues = BTreeMap<String, TrackedValue>;

/// A value tracked by a state object
///
/// Attributes are an explicit tagged union rather than arbitrary objects so
/// that every participant serializes them identically for broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackedValue {
    /// Unsigned counter (step, epoch)
    Uint(u64),

    /// Signed integer
    Int(i64),

    /// Floating point scalar (learning rate, loss)
    Float(f64),

    /// Boolean flag
    Bool(bool),

    /// UTF-8 text
    Text(String),

    /// Opaque binary blob (serialized model or optimizer state)
    Bytes(Vec<u8>),
}

impl TrackedValue {
    /// Interpret as an unsigned counter
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            TrackedValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Interpret as a signed integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            TrackedValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Interpret as a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            TrackedValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Interpret as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TrackedValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Interpret as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TrackedValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Interpret as a binary blob
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TrackedValue::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

impl From<u64> for TrackedValue {
    fn from(v: u64) -> Self {
        TrackedValue::Uint(v)
    }
}

impl From<i64> for TrackedValue {
    fn from(v: i64) -> Self {
        TrackedValue::Int(v)
    }
}

impl From<f64> for TrackedValue {
    fn from(v: f64) -> Self {
        TrackedValue::Float(v)
    }
}

impl From<bool> for TrackedValue {
    fn from(v: bool) -> Self {
        TrackedValue::Bool(v)
    }
}

impl From<&str> for TrackedValue {
    fn from(v: &str) -> Self {
        TrackedValue::Text(v.to_string())
    }
}

impl From<String> for TrackedValue {
    fn from(v: String) -> Self {
        TrackedValue::Text(v)
    }
}

impl From<Vec<u8>> for TrackedValue {
    fn from(v: Vec<u8>) -> Self {
        TrackedValue::Bytes(v)
    }
}
