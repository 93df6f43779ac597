//! # Snapshot Format
//!
//! Binary serialization for the frozen memory of a finished computation.
//! File I/O operations are in the app layer.
//!
//! Format: Header (5 bytes) + postcard-serialized snapshot.
//! - 4 bytes: Magic ("BSTP")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is parsed.

use crate::memory::Memory;
use crate::primitives::{SNAPSHOT_FORMAT_VERSION, SNAPSHOT_MAGIC};
use crate::{ComputeError, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Maximum accepted snapshot size.
///
/// Checked before deserialization so a corrupted length prefix cannot
/// trigger a huge allocation.
pub const MAX_SNAPSHOT_PAYLOAD_SIZE: usize = 64 * 1024 * 1024; // 64 MB

const HEADER_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The header preceding every snapshot payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *SNAPSHOT_MAGIC,
            version: SNAPSHOT_FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if &self.magic != SNAPSHOT_MAGIC {
            return Err(ComputeError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != SNAPSHOT_FORMAT_VERSION {
            return Err(ComputeError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ComputeError> {
        match bytes {
            [a, b, c, d, version, ..] => Ok(Self {
                magic: [*a, *b, *c, *d],
                version: *version,
            }),
            _ => Err(ComputeError::SerializationError(
                "Header too short".to_string(),
            )),
        }
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Everything a finished computation's memory holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub values: BTreeMap<String, Value>,
    pub iteration: u64,
    pub runtime_ms: u64,
}

impl From<&Memory> for MemorySnapshot {
    fn from(memory: &Memory) -> Self {
        Self {
            values: memory.as_map(),
            iteration: memory.iteration(),
            runtime_ms: u64::try_from(memory.runtime().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl From<MemorySnapshot> for Memory {
    /// The restored memory is frozen.
    fn from(snapshot: MemorySnapshot) -> Self {
        Memory::frozen(
            snapshot.values,
            snapshot.iteration,
            Duration::from_millis(snapshot.runtime_ms),
        )
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a memory to bytes (header + payload).
pub fn memory_to_bytes(memory: &Memory) -> Result<Vec<u8>, ComputeError> {
    let header = SnapshotHeader::new();
    let payload = postcard::to_stdvec(&MemorySnapshot::from(memory))
        .map_err(|e| ComputeError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a snapshot. The returned memory is frozen.
pub fn memory_from_bytes(bytes: &[u8]) -> Result<Memory, ComputeError> {
    if bytes.len() > MAX_SNAPSHOT_PAYLOAD_SIZE {
        return Err(ComputeError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_PAYLOAD_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(HEADER_SIZE..).unwrap_or_default();
    let snapshot: MemorySnapshot = postcard::from_bytes(payload).map_err(|e| {
        ComputeError::SerializationError(format!("Failed to deserialize snapshot: {}", e))
    })?;
    Ok(Memory::from(snapshot))
}

// =============================================================================
// TESTS
// =============================================================================
