//! # Vertex Program
//!
//! A vertex program is declared up front as a [`VertexProgram`] value: three
//! callbacks (`setup`, `execute`, `terminate`) plus the keys it may mutate.
//! The engine enforces those declarations through [`ComputeVertex`] and
//! [`WorkerMemory`].
//!
//! ```
//! use bulkstep_core::{Value, VertexProgram};
//!
//! let program = VertexProgram::new("name-length")
//!     .with_execute(|vertex, _messenger, memory| {
//!         let name = vertex.value("name")?;
//!         let length = name.as_str().map(str::len).unwrap_or(0);
//!         vertex.set_property("nameLength", Value::from(length))?;
//!         memory.incr("total", length as i64)
//!     })
//!     .with_terminate(|_memory| Ok(true))
//!     .with_element_compute_keys(["nameLength"])
//!     .with_memory_compute_keys(["total"]);
//! assert_eq!(program.to_string(), "vertexprogram[name-length]");
//! ```

use crate::memory::{Memory, WorkerMemory};
use crate::messenger::{MessageCombiner, Messenger};
use crate::structure::{EdgeRef, Graph};
use crate::{Cardinality, ComputeError, Direction, Value, VertexId};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub type SetupFn = Arc<dyn Fn(&Memory) -> Result<(), ComputeError> + Send + Sync>;

pub type ExecuteFn = Arc<
    dyn Fn(&ComputeVertex<'_>, &mut Messenger<'_>, &mut WorkerMemory<'_>) -> Result<(), ComputeError>
        + Send
        + Sync,
>;

pub type TerminateFn = Arc<dyn Fn(&Memory) -> Result<bool, ComputeError> + Send + Sync>;

/// Declaration of a vertex-centric computation.
///
/// Defaults: `setup` and `execute` do nothing, `terminate` stops after the
/// first superstep, and no keys are writable.
#[derive(Clone)]
pub struct VertexProgram {
    /// Name used in diagnostics.
    pub name: String,
    /// Runs once, before the first superstep, with direct memory access.
    pub setup: SetupFn,
    /// Runs once per vertex per superstep.
    pub execute: ExecuteFn,
    /// Runs once after every barrier; `true` ends the superstep loop.
    pub terminate: TerminateFn,
    /// Vertex property keys `execute` may write.
    pub element_compute_keys: BTreeSet<String>,
    /// Memory keys `setup`, `execute` and `terminate` may write.
    pub memory_compute_keys: BTreeSet<String>,
    /// Optional fold for messages bound to the same vertex.
    pub message_combiner: Option<MessageCombiner>,
}

impl Default for VertexProgram {
    fn default() -> Self {
        Self::new("vertexprogram")
    }
}

impl VertexProgram {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            setup: Arc::new(|_| Ok(())),
            execute: Arc::new(|_, _, _| Ok(())),
            terminate: Arc::new(|_| Ok(true)),
            element_compute_keys: BTreeSet::new(),
            memory_compute_keys: BTreeSet::new(),
            message_combiner: None,
        }
    }

    #[must_use]
    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&Memory) -> Result<(), ComputeError> + Send + Sync + 'static,
    {
        self.setup = Arc::new(setup);
        self
    }

    #[must_use]
    pub fn with_execute<F>(mut self, execute: F) -> Self
    where
        F: Fn(&ComputeVertex<'_>, &mut Messenger<'_>, &mut WorkerMemory<'_>) -> Result<(), ComputeError>
            + Send
            + Sync
            + 'static,
    {
        self.execute = Arc::new(execute);
        self
    }

    #[must_use]
    pub fn with_terminate<F>(mut self, terminate: F) -> Self
    where
        F: Fn(&Memory) -> Result<bool, ComputeError> + Send + Sync + 'static,
    {
        self.terminate = Arc::new(terminate);
        self
    }

    #[must_use]
    pub fn with_element_compute_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.element_compute_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_memory_compute_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.memory_compute_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_message_combiner<F>(mut self, combiner: F) -> Self
    where
        F: Fn(Value, Value) -> Value + Send + Sync + 'static,
    {
        self.message_combiner = Some(Arc::new(combiner));
        self
    }
}

impl fmt::Debug for VertexProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexProgram")
            .field("name", &self.name)
            .field("element_compute_keys", &self.element_compute_keys)
            .field("memory_compute_keys", &self.memory_compute_keys)
            .field("message_combiner", &self.message_combiner.is_some())
            .finish()
    }
}

impl fmt::Display for VertexProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vertexprogram[{}]", self.name)
    }
}

// =============================================================================
// COMPUTE VERTEX
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Access<'a> {
    /// Inside `execute`: declared keys are writable, adjacency is readable.
    Program { element_keys: &'a BTreeSet<String> },
    /// Inside map/combine/reduce: read-only, no adjacency.
    MapReduce,
}

/// The vertex handed to user callbacks.
#[derive(Clone, Copy)]
pub struct ComputeVertex<'a> {
    id: VertexId,
    graph: &'a dyn Graph,
    access: Access<'a>,
}

impl fmt::Debug for ComputeVertex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeVertex")
            .field("id", &self.id)
            .field("access", &self.access)
            .finish()
    }
}

impl<'a> ComputeVertex<'a> {
    pub(crate) fn for_program(
        id: VertexId,
        graph: &'a dyn Graph,
        element_keys: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            id,
            graph,
            access: Access::Program { element_keys },
        }
    }

    pub(crate) fn for_map_reduce(id: VertexId, graph: &'a dyn Graph) -> Self {
        Self {
            id,
            graph,
            access: Access::MapReduce,
        }
    }

    #[must_use]
    pub fn id(&self) -> VertexId {
        self.id
    }

    pub fn label(&self) -> Result<String, ComputeError> {
        self.graph.label(self.id)
    }

    /// Property keys present on the vertex.
    pub fn keys(&self) -> Result<Vec<String>, ComputeError> {
        self.graph.property_keys(self.id)
    }

    /// The first value under `key`, or `None`.
    pub fn property(&self, key: &str) -> Result<Option<Value>, ComputeError> {
        Ok(self.graph.properties(self.id, key)?.into_iter().next())
    }

    /// Every value under `key`.
    pub fn properties(&self, key: &str) -> Result<Vec<Value>, ComputeError> {
        self.graph.properties(self.id, key)
    }

    /// The first value under `key`; fails if there is none.
    pub fn value(&self, key: &str) -> Result<Value, ComputeError> {
        self.property(key)?
            .ok_or_else(|| ComputeError::PropertyDoesNotExist {
                vertex: self.id,
                key: key.to_string(),
            })
    }

    /// Replace the value under a declared element compute key.
    pub fn set_property(&self, key: &str, value: impl Into<Value>) -> Result<(), ComputeError> {
        self.write(Cardinality::Single, key, value.into())
    }

    /// Append a value under a declared element compute key.
    pub fn add_property(&self, key: &str, value: impl Into<Value>) -> Result<(), ComputeError> {
        self.write(Cardinality::List, key, value.into())
    }

    fn write(&self, cardinality: Cardinality, key: &str, value: Value) -> Result<(), ComputeError> {
        match self.access {
            Access::Program { element_keys } if element_keys.contains(key) => {
                self.graph.set_property(self.id, cardinality, key, value)
            }
            _ => Err(ComputeError::ProvidedKeyIsNotAnElementComputeKey(
                key.to_string(),
            )),
        }
    }

    /// Incident edges. Not available inside map-reduce.
    pub fn edges(
        &self,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<EdgeRef>, ComputeError> {
        match self.access {
            Access::Program { .. } => self.graph.edges(self.id, direction, label),
            Access::MapReduce => {
                Err(ComputeError::IncidentAndAdjacentElementsCanNotBeAccessedInMapReduce)
            }
        }
    }

    /// Adjacent vertex ids. Not available inside map-reduce.
    pub fn adjacent(
        &self,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<VertexId>, ComputeError> {
        Ok(self
            .edges(direction, label)?
            .iter()
            .map(|edge| edge.other(self.id))
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
