//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the bulkstep engine:
//! - Element identifiers (`VertexId`, `EdgeId`)
//! - The dynamic `Value` used by properties, memory, messages and map-reduce keys
//! - Adjacency and cardinality selectors (`Direction`, `Cardinality`)
//! - Isolation levels (`Isolation`)
//! - Error types (`ComputeError`, `ErrorKind`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Use saturating arithmetic for accumulators

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ELEMENT IDENTIFIERS
// =============================================================================

/// Opaque, totally ordered identifier of a vertex.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct VertexId(pub u64);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v[{}]", self.0)
    }
}

/// Opaque, totally ordered identifier of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e[{}]", self.0)
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// A dynamically typed value.
///
/// The same type flows through vertex properties, memory entries, messages
/// and map-reduce keys/values, so the engine never needs to know the user's
/// types. Variant order defines the cross-type ordering used when sorting keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    /// The "null object": the key emitted when a map function emits a bare value.
    Null,
    Bool(bool),
    Long(i64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// Name of the variant, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Long(_) => "long",
            Value::String(_) => "string",
            Value::List(_) => "list",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Long(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Long(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<VertexId> for Value {
    fn from(id: VertexId) -> Self {
        Value::Long(id.0 as i64)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

// =============================================================================
// ADJACENCY & CARDINALITY
// =============================================================================

/// Edge direction relative to a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Out,
    In,
    Both,
}

/// How a property write treats existing values under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// Replace all existing values with the new one.
    Single,
    /// Append the new value to the existing ones.
    List,
}

// =============================================================================
// ISOLATION
// =============================================================================

/// Consistency guarantee for memory and message visibility across supersteps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// Writes from superstep n are visible only at n+1, fully materialized.
    Bsp,
    /// A worker additionally observes its own memory writes within the same
    /// superstep. Other workers still only see them after the barrier.
    DirtyBsp,
}

impl fmt::Display for Isolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Isolation::Bsp => write!(f, "BSP"),
            Isolation::DirtyBsp => write!(f, "DIRTY_BSP"),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Coarse classification of [`ComputeError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The computer was configured or submitted incorrectly.
    Configuration,
    /// A write targeted an undeclared or malformed key.
    KeyViolation,
    /// Memory was mutated after the result was delivered.
    ImmutabilityViolation,
    /// Adjacency was accessed where it is not allowed.
    AccessViolation,
    /// A memory key or property was never set.
    NotFound,
    /// The graph cannot provide the requested computer.
    UnsupportedComputer,
    /// The computation aborted while running.
    Execution,
    /// Snapshot encoding or decoding failed.
    Serialization,
    /// Reading or writing a file failed.
    Io,
}

/// Errors surfaced by the engine.
///
/// Messages are stable: callers and tests match on the exact text.
/// The engine never panics; every violation is reported through this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputeError {
    #[error("The provided isolation is not supported by this graph computer: {0}")]
    IsolationNotSupported(Isolation),

    #[error("The computer has no vertex program or map reducers to execute")]
    ComputerHasNoVertexProgramNorMapReducers,

    #[error("This computer has already had a vertex program submitted to it")]
    ComputerHasAlreadyBeenSubmittedAVertexProgram,

    #[error("This graph computer has already been submitted and can not be executed again")]
    AlreadySubmitted,

    #[error("The provided key is not an element compute key: {0}")]
    ProvidedKeyIsNotAnElementComputeKey(String),

    #[error("The provided key is not a memory compute key: {0}")]
    ProvidedKeyIsNotAMemoryComputeKey(String),

    #[error("Graph computer memory key can not be the empty string")]
    MemoryKeyCanNotBeEmpty,

    #[error("Graph computer memory value can not be null")]
    MemoryValueCanNotBeNull,

    #[error("The memory key {key} can not be reduced with {operation}")]
    IncompatibleMemoryReduction { key: String, operation: String },

    #[error("The memory is immutable and can not be modified in this context")]
    MemoryIsCurrentlyImmutable,

    #[error("The incident and adjacent elements of a vertex can not be accessed in MapReduce")]
    IncidentAndAdjacentElementsCanNotBeAccessedInMapReduce,

    #[error("The memory does not have a value for provided key: {0}")]
    MemoryDoesNotExist(String),

    #[error("The vertex {vertex} does not have a value for property: {key}")]
    PropertyDoesNotExist { vertex: VertexId, key: String },

    #[error("The vertex does not exist: {0}")]
    VertexDoesNotExist(VertexId),

    #[error("The edge already exists: {0}")]
    EdgeAlreadyExists(EdgeId),

    #[error("The memory key is already written by another job or the vertex program: {0}")]
    MemoryKeyAlreadyInUse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Graph does not support the provided graph computer: {0}")]
    GraphDoesNotSupportProvidedGraphComputer(String),

    #[error("Only one graph computer can be provided: {0:?}")]
    OnlyOneOrNoGraphComputerClass(Vec<String>),

    #[error("The vertex program did not terminate within {0} supersteps")]
    SuperstepLimitExceeded(u64),

    #[error("The computation panicked: {0}")]
    ComputationPanicked(String),

    #[error("The computation could not be started: {0}")]
    ExecutorUnavailable(String),

    #[error("The computation did not finish within {0} ms")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl ComputeError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComputeError::IsolationNotSupported(_)
            | ComputeError::ComputerHasNoVertexProgramNorMapReducers
            | ComputeError::ComputerHasAlreadyBeenSubmittedAVertexProgram
            | ComputeError::AlreadySubmitted
            | ComputeError::EdgeAlreadyExists(_)
            | ComputeError::InvalidConfiguration(_) => ErrorKind::Configuration,
            ComputeError::ProvidedKeyIsNotAnElementComputeKey(_)
            | ComputeError::ProvidedKeyIsNotAMemoryComputeKey(_)
            | ComputeError::MemoryKeyCanNotBeEmpty
            | ComputeError::MemoryValueCanNotBeNull
            | ComputeError::IncompatibleMemoryReduction { .. }
            | ComputeError::MemoryKeyAlreadyInUse(_) => ErrorKind::KeyViolation,
            ComputeError::MemoryIsCurrentlyImmutable => ErrorKind::ImmutabilityViolation,
            ComputeError::IncidentAndAdjacentElementsCanNotBeAccessedInMapReduce => {
                ErrorKind::AccessViolation
            }
            ComputeError::MemoryDoesNotExist(_)
            | ComputeError::PropertyDoesNotExist { .. }
            | ComputeError::VertexDoesNotExist(_) => ErrorKind::NotFound,
            ComputeError::GraphDoesNotSupportProvidedGraphComputer(_)
            | ComputeError::OnlyOneOrNoGraphComputerClass(_) => ErrorKind::UnsupportedComputer,
            ComputeError::SuperstepLimitExceeded(_)
            | ComputeError::ComputationPanicked(_)
            | ComputeError::ExecutorUnavailable(_)
            | ComputeError::Timeout(_) => ErrorKind::Execution,
            ComputeError::SerializationError(_) => ErrorKind::Serialization,
            ComputeError::IoError(_) => ErrorKind::Io,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
