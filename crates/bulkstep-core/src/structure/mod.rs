//! # Graph Structure
//!
//! The graph the engine computes over is an external collaborator. This
//! module fixes the contract the engine relies on (`Graph`) and ships one
//! in-memory implementation (`MemGraph`) plus the classic "modern" fixture.
//!
//! The engine needs no more than:
//! - enumerate vertices
//! - get / set / test vertex properties with cardinality semantics
//! - iterate incident edges by direction and label
//!
//! All methods take `&self`: vertices of one superstep are executed from
//! many threads at once, so implementations synchronize property writes
//! internally (one writer per vertex per superstep).

mod fixtures;
mod mem_graph;
mod serial;

pub use fixtures::modern;
pub use mem_graph::MemGraph;
pub use serial::{SerializableEdge, SerializableGraph, SerializableVertex};

use crate::primitives::STANDARD_COMPUTER;
use crate::{Cardinality, ComputeError, Direction, EdgeId, Value, VertexId};
use std::collections::BTreeMap;

// =============================================================================
// EDGE VIEW
// =============================================================================

/// An edge as seen from one of its endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRef {
    pub id: EdgeId,
    pub label: String,
    pub out_vertex: VertexId,
    pub in_vertex: VertexId,
    pub properties: BTreeMap<String, Value>,
}

impl EdgeRef {
    /// The endpoint opposite to `from`. A self-loop returns `from`.
    #[must_use]
    pub fn other(&self, from: VertexId) -> VertexId {
        if self.out_vertex == from {
            self.in_vertex
        } else {
            self.out_vertex
        }
    }
}

// =============================================================================
// GRAPH TRAIT
// =============================================================================

/// The storage contract consumed by the computation engine.
///
/// All fallible operations return `Result<T, ComputeError>` so in-memory and
/// persistent backends can be driven uniformly.
pub trait Graph: Send + Sync {
    /// All vertex ids, in ascending order.
    fn vertex_ids(&self) -> Vec<VertexId>;

    /// Number of vertices.
    fn vertex_count(&self) -> usize {
        self.vertex_ids().len()
    }

    /// Check if the graph contains a vertex.
    fn contains_vertex(&self, id: VertexId) -> bool;

    /// The label of a vertex.
    fn label(&self, id: VertexId) -> Result<String, ComputeError>;

    /// Property keys present on a vertex.
    fn property_keys(&self, id: VertexId) -> Result<Vec<String>, ComputeError>;

    /// All values stored under `key` (empty if absent).
    fn properties(&self, id: VertexId, key: &str) -> Result<Vec<Value>, ComputeError>;

    /// Write a property value with the given cardinality.
    fn set_property(
        &self,
        id: VertexId,
        cardinality: Cardinality,
        key: &str,
        value: Value,
    ) -> Result<(), ComputeError>;

    /// Incident edges in `direction`, optionally restricted to one label.
    fn edges(
        &self,
        id: VertexId,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<EdgeRef>, ComputeError>;

    /// Names of the graph computers this graph can run.
    fn supported_computers(&self) -> Vec<String> {
        vec![STANDARD_COMPUTER.to_string()]
    }
}
