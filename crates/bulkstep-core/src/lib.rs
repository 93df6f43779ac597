//! # bulkstep-core
//!
//! The vertex-centric graph computation engine for bulkstep - THE LOGIC.
//!
//! A vertex program runs over every vertex of a graph in synchronized
//! supersteps. Vertices exchange messages along their edges and fold values
//! into a shared, barrier-synchronized memory. Once the program terminates,
//! any number of map-reduce jobs summarize the resulting graph into memory.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Consumes the graph only through the `Graph` trait; no storage backend is assumed
//! - Runs in one process, parallel across vertex partitions (`rayon`)
//! - Is deterministic: `BTreeMap` ordering, partition-ordered barrier merges, no floats
//! - Never panics on user error; every violation is a `ComputeError`
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod algorithms;
pub mod computer;
pub mod formats;
pub mod mapreduce;
pub mod memory;
pub mod messenger;
pub mod primitives;
pub mod program;
pub mod structure;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Cardinality, ComputeError, Direction, EdgeId, ErrorKind, Isolation, Value, VertexId,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use computer::{
    ComputerConfig, ComputerFeatures, ComputerHandle, ComputerResult, GraphComputer,
    StandardComputer, open_computer,
};
pub use mapreduce::{KeyValue, MapEmitter, MapReduce, ReduceEmitter};
pub use memory::{Memory, WorkerMemory};
pub use messenger::{MessageCombiner, MessageScope, Messenger};
pub use program::{ComputeVertex, VertexProgram};

// =============================================================================
// RE-EXPORTS: Structure
// =============================================================================

pub use structure::{
    EdgeRef, Graph, MemGraph, SerializableEdge, SerializableGraph, SerializableVertex, modern,
};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{MemorySnapshot, SnapshotHeader, memory_from_bytes, memory_to_bytes};
