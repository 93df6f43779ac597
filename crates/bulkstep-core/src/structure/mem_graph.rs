//! In-memory graph backend.
//!
//! Uses `BTreeMap` exclusively for deterministic iteration order. Each
//! vertex owns its property map behind its own lock, so concurrent writes
//! to disjoint vertices never contend.

use super::{EdgeRef, Graph};
use crate::primitives::STANDARD_COMPUTER;
use crate::{Cardinality, ComputeError, Direction, EdgeId, Value, VertexId};
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug)]
struct VertexRecord {
    label: String,
    properties: RwLock<BTreeMap<String, Vec<Value>>>,
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    label: String,
    out_vertex: VertexId,
    in_vertex: VertexId,
    properties: BTreeMap<String, Value>,
}

/// The main in-memory graph.
#[derive(Debug)]
pub struct MemGraph {
    /// Vertex storage: VertexId -> record
    vertices: BTreeMap<VertexId, VertexRecord>,

    /// Edge storage: EdgeId -> record
    edges: BTreeMap<EdgeId, EdgeRecord>,

    /// Outgoing adjacency: vertex -> edges leaving it
    out_index: BTreeMap<VertexId, Vec<EdgeId>>,

    /// Incoming adjacency: vertex -> edges entering it
    in_index: BTreeMap<VertexId, Vec<EdgeId>>,

    /// Graph computers this graph advertises
    computers: Vec<String>,
}

impl Default for MemGraph {
    fn default() -> Self {
        Self {
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            out_index: BTreeMap::new(),
            in_index: BTreeMap::new(),
            computers: vec![STANDARD_COMPUTER.to_string()],
        }
    }
}

impl MemGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list of computers this graph advertises.
    #[must_use]
    pub fn with_computers<I, S>(mut self, computers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.computers = computers.into_iter().map(Into::into).collect();
        self
    }

    /// Insert a vertex. If the id already exists, the existing vertex is kept.
    pub fn add_vertex(&mut self, id: VertexId, label: impl Into<String>) -> VertexId {
        self.vertices.entry(id).or_insert_with(|| VertexRecord {
            label: label.into(),
            properties: RwLock::new(BTreeMap::new()),
        });
        id
    }

    /// Insert an edge between two existing vertices. Edge ids are unique.
    pub fn add_edge(
        &mut self,
        id: EdgeId,
        out_vertex: VertexId,
        label: impl Into<String>,
        in_vertex: VertexId,
    ) -> Result<EdgeId, ComputeError> {
        for endpoint in [out_vertex, in_vertex] {
            if !self.vertices.contains_key(&endpoint) {
                return Err(ComputeError::VertexDoesNotExist(endpoint));
            }
        }
        if self.edges.contains_key(&id) {
            return Err(ComputeError::EdgeAlreadyExists(id));
        }
        self.edges.insert(
            id,
            EdgeRecord {
                label: label.into(),
                out_vertex,
                in_vertex,
                properties: BTreeMap::new(),
            },
        );
        self.out_index.entry(out_vertex).or_default().push(id);
        self.in_index.entry(in_vertex).or_default().push(id);
        Ok(id)
    }

    /// Set a property on an existing edge. Unknown edges are ignored.
    pub fn set_edge_property(&mut self, id: EdgeId, key: impl Into<String>, value: Value) {
        if let Some(edge) = self.edges.get_mut(&id) {
            edge.properties.insert(key.into(), value);
        }
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All edges in id order.
    pub fn all_edges(&self) -> impl Iterator<Item = EdgeRef> + '_ {
        self.edges.iter().map(|(id, edge)| to_ref(*id, edge))
    }

    fn record(&self, id: VertexId) -> Result<&VertexRecord, ComputeError> {
        self.vertices
            .get(&id)
            .ok_or(ComputeError::VertexDoesNotExist(id))
    }

    fn collect_edges(
        &self,
        index: &BTreeMap<VertexId, Vec<EdgeId>>,
        id: VertexId,
        label: Option<&str>,
        out: &mut Vec<EdgeRef>,
    ) {
        let Some(ids) = index.get(&id) else {
            return;
        };
        for edge_id in ids {
            if let Some(edge) = self.edges.get(edge_id)
                && label.is_none_or(|l| l == edge.label)
            {
                out.push(to_ref(*edge_id, edge));
            }
        }
    }
}

fn to_ref(id: EdgeId, edge: &EdgeRecord) -> EdgeRef {
    EdgeRef {
        id,
        label: edge.label.clone(),
        out_vertex: edge.out_vertex,
        in_vertex: edge.in_vertex,
        properties: edge.properties.clone(),
    }
}

impl Graph for MemGraph {
    fn vertex_ids(&self) -> Vec<VertexId> {
        self.vertices.keys().copied().collect()
    }

    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    fn label(&self, id: VertexId) -> Result<String, ComputeError> {
        Ok(self.record(id)?.label.clone())
    }

    fn property_keys(&self, id: VertexId) -> Result<Vec<String>, ComputeError> {
        Ok(self.record(id)?.properties.read().keys().cloned().collect())
    }

    fn properties(&self, id: VertexId, key: &str) -> Result<Vec<Value>, ComputeError> {
        Ok(self
            .record(id)?
            .properties
            .read()
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    fn set_property(
        &self,
        id: VertexId,
        cardinality: Cardinality,
        key: &str,
        value: Value,
    ) -> Result<(), ComputeError> {
        let record = self.record(id)?;
        let mut properties = record.properties.write();
        let values = properties.entry(key.to_string()).or_default();
        if cardinality == Cardinality::Single {
            values.clear();
        }
        values.push(value);
        Ok(())
    }

    fn edges(
        &self,
        id: VertexId,
        direction: Direction,
        label: Option<&str>,
    ) -> Result<Vec<EdgeRef>, ComputeError> {
        self.record(id)?;
        let mut result = Vec::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            self.collect_edges(&self.out_index, id, label, &mut result);
        }
        if matches!(direction, Direction::In | Direction::Both) {
            self.collect_edges(&self.in_index, id, label, &mut result);
        }
        Ok(result)
    }

    fn supported_computers(&self) -> Vec<String> {
        self.computers.clone()
    }
}

// =============================================================================
// TESTS
// =============================================================================
