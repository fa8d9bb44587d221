//! Fingerprints for produced metadata
//!
//! Same input must give the same graph; comparing fingerprints is the cheap
//! way to check that across runs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::Result;

/// SHA256 fingerprint of canonical JSON
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute fingerprint from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Fingerprint of a serialisable value. Objects go through
    /// `serde_json::Value`, whose maps are key-sorted.
    pub fn of<T: Serialize>(value: &T) -> Result<Self> {
        let canonical = serde_json::to_value(value)?;
        Ok(Self::from_bytes(serde_json::to_string(&canonical)?.as_bytes()))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }

    pub fn matches<T: Serialize>(&self, value: &T) -> bool {
        Self::of(value).map(|f| f == *self).unwrap_or(false)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
