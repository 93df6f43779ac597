//! # Formats
//!
//! Byte-level encodings produced by the engine. Pure transformations only;
//! reading and writing files is left to the app.

mod persistence;

pub use persistence::{
    MAX_SNAPSHOT_PAYLOAD_SIZE, MemorySnapshot, SnapshotHeader, memory_from_bytes, memory_to_bytes,
};
