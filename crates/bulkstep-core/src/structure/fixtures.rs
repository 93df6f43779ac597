//! The "modern" toy graph: four people, two pieces of software.
//!
//! Edge weights are stored in thousandths since the engine is integer-only.

use super::{Graph, MemGraph};
use crate::{Cardinality, EdgeId, Value, VertexId};

const PEOPLE: [(u64, &str, i64); 4] = [
    (1, "marko", 29),
    (2, "vadas", 27),
    (4, "josh", 32),
    (6, "peter", 35),
];

const SOFTWARE: [(u64, &str, &str); 2] = [(3, "lop", "java"), (5, "ripple", "java")];

const EDGES: [(u64, u64, &str, u64, i64); 6] = [
    (7, 1, "knows", 2, 500),
    (8, 1, "knows", 4, 1000),
    (9, 1, "created", 3, 400),
    (10, 4, "created", 5, 1000),
    (11, 4, "created", 3, 400),
    (12, 6, "created", 3, 200),
];

/// Build the modern graph.
#[must_use]
pub fn modern() -> MemGraph {
    let mut graph = MemGraph::new();

    for (id, name, age) in PEOPLE {
        let v = graph.add_vertex(VertexId(id), "person");
        let _ = graph.set_property(v, Cardinality::Single, "name", Value::from(name));
        let _ = graph.set_property(v, Cardinality::Single, "age", Value::from(age));
    }
    for (id, name, lang) in SOFTWARE {
        let v = graph.add_vertex(VertexId(id), "software");
        let _ = graph.set_property(v, Cardinality::Single, "name", Value::from(name));
        let _ = graph.set_property(v, Cardinality::Single, "lang", Value::from(lang));
    }
    for (id, out, label, into, weight) in EDGES {
        if let Ok(edge) = graph.add_edge(EdgeId(id), VertexId(out), label, VertexId(into)) {
            graph.set_edge_property(edge, "weight", Value::from(weight));
        }
    }

    graph
}
