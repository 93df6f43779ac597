//! # Bundled Algorithms
//!
//! Ready-made programs and jobs, written against the public API only.
//!
//! - [`connected_components`]: min-id label propagation over both edge
//!   directions. Writes `component` on every vertex.
//! - [`component_sizes`]: counts vertices per `component`.
//! - [`property_sum`]: sums a long-valued property over all vertices.

use crate::mapreduce::{KeyValue, MapReduce};
use crate::messenger::MessageScope;
use crate::program::VertexProgram;
use crate::{Direction, Value};

/// Element key written by [`connected_components`].
pub const COMPONENT_KEY: &str = "component";

/// Memory key: whether any vertex changed its component in the last superstep.
pub const CHANGED_KEY: &str = "changed";

/// Default memory key of [`component_sizes`].
pub const COMPONENT_SIZES_KEY: &str = "componentSizes";

/// Weakly connected components by smallest vertex id.
#[must_use]
pub fn connected_components() -> VertexProgram {
    VertexProgram::new("connected-components")
        .with_setup(|memory| memory.set(CHANGED_KEY, false))
        .with_execute(|vertex, messenger, memory| {
            let scope = MessageScope::adjacent(Direction::Both);
            if memory.is_initial_iteration() {
                vertex.set_property(COMPONENT_KEY, vertex.id())?;
                messenger.send(&scope, vertex.id())?;
                return memory.or(CHANGED_KEY, true);
            }

            let current = vertex.value(COMPONENT_KEY)?;
            let smallest = messenger.receive().min().cloned();
            match smallest {
                Some(candidate) if candidate < current => {
                    vertex.set_property(COMPONENT_KEY, candidate.clone())?;
                    messenger.send(&scope, candidate)?;
                    memory.or(CHANGED_KEY, true)
                }
                _ => memory.or(CHANGED_KEY, false),
            }
        })
        .with_terminate(|memory| {
            let changed = memory.get(CHANGED_KEY)?.as_bool().unwrap_or(false);
            memory.set(CHANGED_KEY, false)?;
            Ok(!changed)
        })
        .with_element_compute_keys([COMPONENT_KEY])
        .with_memory_compute_keys([CHANGED_KEY])
        .with_message_combiner(|a, b| a.min(b))
}

/// Vertex count per component, as a list of `[component, size]` pairs.
#[must_use]
pub fn component_sizes() -> MapReduce {
    MapReduce::new(COMPONENT_SIZES_KEY)
        .with_map(|vertex, emitter| {
            if let Some(component) = vertex.property(COMPONENT_KEY)? {
                emitter.emit(component, 1i64);
            }
            Ok(())
        })
        .with_combine(|key, values, emitter| {
            emitter.emit(key.clone(), sum(&values));
            Ok(())
        })
        .with_reduce(|key, values, emitter| {
            emitter.emit(key.clone(), sum(&values));
            Ok(())
        })
        .with_memory(|pairs| {
            Ok(Value::List(
                pairs
                    .into_iter()
                    .map(|KeyValue { key, value }| Value::List(vec![key, value]))
                    .collect(),
            ))
        })
}

/// Sum of every long stored under `property`, written to `memory_key`.
///
/// Vertices without the property contribute nothing; an empty sum is 0.
#[must_use]
pub fn property_sum(property: &str, memory_key: &str) -> MapReduce {
    let property = property.to_string();
    MapReduce::new(memory_key)
        .with_map(move |vertex, emitter| {
            for value in vertex.properties(&property)? {
                if value.as_long().is_some() {
                    emitter.emit_value(value);
                }
            }
            Ok(())
        })
        .with_combine(|_, values, emitter| {
            emitter.emit_value(sum(&values));
            Ok(())
        })
        .with_reduce(|_, values, emitter| {
            emitter.emit_value(sum(&values));
            Ok(())
        })
        .with_memory(|pairs| {
            Ok(pairs
                .into_iter()
                .next()
                .map(|kv| kv.value)
                .unwrap_or(Value::Long(0)))
        })
}

fn sum(values: &[Value]) -> i64 {
    values
        .iter()
        .filter_map(Value::as_long)
        .fold(0, i64::saturating_add)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computer::{ComputerConfig, GraphComputer, StandardComputer};
    use crate::structure::{Graph, MemGraph, modern};
    use crate::{EdgeId, VertexId};
    use std::sync::Arc;

    fn run(
        graph: MemGraph,
        program: Option<VertexProgram>,
        jobs: Vec<MapReduce>,
    ) -> crate::computer::ComputerResult {
        let config = ComputerConfig {
            workers: 3,
            ..ComputerConfig::default()
        };
        let mut computer = StandardComputer::new(Arc::new(graph), config);
        if let Some(program) = program {
            computer.program(program).expect("program");
        }
        for job in jobs {
            computer.map_reduce(job).expect("job");
        }
        computer.submit().expect("submit").join().expect("join")
    }

    fn two_islands() -> MemGraph {
        let mut graph = MemGraph::new();
        for id in [1, 2, 3, 10, 11] {
            graph.add_vertex(VertexId(id), "node");
        }
        for (edge, out, into) in [(100, 2, 3), (101, 3, 1), (102, 11, 10)] {
            graph
                .add_edge(EdgeId(edge), VertexId(out), "link", VertexId(into))
                .expect("edge");
        }
        graph.add_vertex(VertexId(20), "node");
        graph
    }

    #[test]
    fn modern_graph_is_one_component() {
        let result = run(modern(), Some(connected_components()), vec![component_sizes()]);
        for id in result.graph().vertex_ids() {
            assert_eq!(
                result.graph().properties(id, COMPONENT_KEY).expect("component"),
                vec![Value::Long(1)]
            );
        }
        assert_eq!(
            result.memory().get(COMPONENT_SIZES_KEY).expect("sizes"),
            Value::List(vec![Value::List(vec![Value::Long(1), Value::Long(6)])])
        );
    }

    #[test]
    fn islands_get_their_smallest_id() {
        let result = run(two_islands(), Some(connected_components()), vec![component_sizes()]);
        let component = |id: u64| {
            result
                .graph()
                .properties(VertexId(id), COMPONENT_KEY)
                .expect("component")
        };
        assert_eq!(component(2), vec![Value::Long(1)]);
        assert_eq!(component(11), vec![Value::Long(10)]);
        assert_eq!(component(20), vec![Value::Long(20)]);

        let sizes = result.memory().get(COMPONENT_SIZES_KEY).expect("sizes");
        assert_eq!(sizes.as_list().map(<[Value]>::len), Some(3));
    }

    #[test]
    fn propagation_stops_once_stable() {
        let result = run(two_islands(), Some(connected_components()), Vec::new());
        assert_eq!(
            result.memory().get(CHANGED_KEY).expect("changed"),
            Value::Bool(false)
        );
        // chain 2-3-1 needs two hops, one quiet superstep, plus the initial one
        assert!(result.memory().iteration() <= 4);
    }

    #[test]
    fn age_sum_without_program() {
        let result = run(modern(), None, vec![property_sum("age", "ageSum")]);
        assert_eq!(
            result.memory().get("ageSum").expect("ageSum"),
            Value::Long(123)
        );
    }

    #[test]
    fn missing_property_sums_to_zero() {
        let result = run(modern(), None, vec![property_sum("weight", "weightSum")]);
        assert_eq!(
            result.memory().get("weightSum").expect("weightSum"),
            Value::Long(0)
        );
    }
}
