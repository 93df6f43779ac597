//! # Engine Primitives
//!
//! Hardcoded runtime constants for the bulkstep engine.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! `ComputerConfig` may choose tighter bounds, never looser ones.

/// Name under which the in-process computer is registered.
///
/// Graphs list the computers they support by name; `open_computer` resolves
/// a request against that list.
pub const STANDARD_COMPUTER: &str = "standard";

/// Magic bytes for the memory snapshot header.
///
/// - Snapshot = Magic Bytes ("BSTP") + Version (u8) before payload.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"BSTP";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const SNAPSHOT_FORMAT_VERSION: u8 = 1;

/// Upper bound on supersteps when the configuration does not set one.
///
/// A vertex program whose `terminate` never returns true is aborted once
/// this many supersteps have completed.
pub const DEFAULT_MAX_SUPERSTEPS: u64 = 10_000;

/// Hard cap on worker partitions per computation.
pub const MAX_WORKERS: usize = 256;

/// Minimum number of vertices a partition is given before another is opened.
///
/// Small graphs run in fewer partitions than there are workers.
pub const MIN_PARTITION_SIZE: usize = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_magic_correct() {
        assert_eq!(SNAPSHOT_MAGIC, b"BSTP");
    }

    #[test]
    fn default_superstep_bound_is_positive() {
        assert!(DEFAULT_MAX_SUPERSTEPS > 0);
        assert!(MAX_WORKERS >= 1);
    }
}
