//! Serializable graph description.
//!
//! The app loads graphs from JSON in this shape and prints computed graphs
//! back in it. Edges referencing unknown vertices are rejected on load.

use super::{Graph, MemGraph};
use crate::{ComputeError, EdgeId, Value, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableVertex {
    pub id: u64,
    pub label: String,
    /// Multi-valued properties are written as several entries under one key.
    #[serde(default)]
    pub properties: BTreeMap<String, Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableEdge {
    pub id: u64,
    pub label: String,
    pub out: u64,
    #[serde(rename = "in")]
    pub in_: u64,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

/// Serializable representation of a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub vertices: Vec<SerializableVertex>,
    #[serde(default)]
    pub edges: Vec<SerializableEdge>,
}

impl From<&MemGraph> for SerializableGraph {
    fn from(graph: &MemGraph) -> Self {
        let vertices = graph
            .vertex_ids()
            .into_iter()
            .map(|id| {
                let label = graph.label(id).unwrap_or_default();
                let mut properties = BTreeMap::new();
                for key in graph.property_keys(id).unwrap_or_default() {
                    let values = graph.properties(id, &key).unwrap_or_default();
                    properties.insert(key, values);
                }
                SerializableVertex {
                    id: id.0,
                    label,
                    properties,
                }
            })
            .collect();

        let edges = graph
            .all_edges()
            .map(|edge| SerializableEdge {
                id: edge.id.0,
                label: edge.label,
                out: edge.out_vertex.0,
                in_: edge.in_vertex.0,
                properties: edge.properties,
            })
            .collect();

        Self { vertices, edges }
    }
}

impl TryFrom<SerializableGraph> for MemGraph {
    type Error = ComputeError;

    fn try_from(sg: SerializableGraph) -> Result<Self, Self::Error> {
        let mut graph = MemGraph::new();

        for vertex in sg.vertices {
            let id = graph.add_vertex(VertexId(vertex.id), vertex.label);
            for (key, values) in vertex.properties {
                for value in values {
                    graph.set_property(id, crate::Cardinality::List, &key, value)?;
                }
            }
        }

        for edge in sg.edges {
            let id = graph.add_edge(
                EdgeId(edge.id),
                VertexId(edge.out),
                edge.label,
                VertexId(edge.in_),
            )?;
            for (key, value) in edge.properties {
                graph.set_edge_property(id, key, value);
            }
        }

        Ok(graph)
    }
}
