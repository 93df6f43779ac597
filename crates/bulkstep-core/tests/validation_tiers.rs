//! # Validation Tier Tests (T0-T4)
//!
//! If ANY tier fails, the engine is INVALID.
//!
//! ## Tiers
//! - T0: Submission Contract
//! - T1: Memory Contract
//! - T2: Vertex Program Execution
//! - T3: Map-Reduce
//! - T4: Messaging & Isolation

use bulkstep_core::{
    ComputeError, ComputerConfig, ComputerResult, Direction, Graph, GraphComputer, Isolation,
    MapReduce, MemGraph, MessageScope, Value, VertexId, VertexProgram, modern, open_computer,
};
use std::collections::BTreeSet;
use std::sync::Arc;

fn computer() -> Box<dyn GraphComputer> {
    computer_with(ComputerConfig::default())
}

fn computer_with(config: ComputerConfig) -> Box<dyn GraphComputer> {
    open_computer(Arc::new(modern()), &[], config).expect("open computer")
}

fn run(mut computer: Box<dyn GraphComputer>) -> ComputerResult {
    computer.submit().expect("submit").join().expect("join")
}

fn run_program(program: VertexProgram) -> ComputerResult {
    let mut computer = computer();
    computer.program(program).expect("program");
    run(computer)
}

fn long(result: &ComputerResult, key: &str) -> i64 {
    result
        .memory()
        .get(key)
        .expect("memory key")
        .as_long()
        .expect("long value")
}

fn boolean(result: &ComputerResult, key: &str) -> bool {
    result
        .memory()
        .get(key)
        .expect("memory key")
        .as_bool()
        .expect("bool value")
}

// =============================================================================
// TIER T0: SUBMISSION CONTRACT
// =============================================================================

mod t0_submission {
    use super::*;

    /// T0.1: Nothing to run is rejected.
    #[test]
    fn no_program_nor_map_reducers_rejected() {
        let result = computer().submit();
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some("The computer has no vertex program or map reducers to execute".to_string())
        );
    }

    /// T0.2: A computer executes once.
    #[test]
    fn same_computer_never_runs_twice() {
        let mut computer = computer();
        computer.program(VertexProgram::default()).expect("program");
        computer.submit().expect("first").join().expect("join");

        for _ in 0..2 {
            assert_eq!(
                computer.submit().err(),
                Some(ComputeError::AlreadySubmitted)
            );
        }
    }

    /// T0.3: Only one vertex program.
    #[test]
    fn second_program_rejected() {
        let mut computer = computer();
        computer.program(VertexProgram::default()).expect("program");
        assert_eq!(
            computer.program(VertexProgram::default()),
            Err(ComputeError::ComputerHasAlreadyBeenSubmittedAVertexProgram)
        );
    }

    /// T0.4: Unsupported isolation is rejected; display stays stable.
    #[test]
    fn unsupported_isolation_rejected() {
        let mut computer = computer_with(ComputerConfig {
            isolations: [Isolation::Bsp].into(),
            ..ComputerConfig::default()
        });
        let features = computer.features();
        for level in [Isolation::Bsp, Isolation::DirtyBsp] {
            if !features.supports_isolation(level) {
                assert_eq!(
                    computer.isolation(level),
                    Err(ComputeError::IsolationNotSupported(level))
                );
            }
        }
        assert_eq!(computer.to_string(), "graphcomputer[standard,bsp,none,0]");
    }

    /// T0.5: Unknown computer implementations are rejected.
    #[test]
    fn bad_graph_computer_rejected() {
        let result = open_computer(
            Arc::new(modern()),
            &["bad"],
            ComputerConfig::default(),
        );
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some("Graph does not support the provided graph computer: bad".to_string())
        );
    }

    /// T0.6: An empty memory key fails the submission.
    #[test]
    fn empty_memory_key_rejected() {
        let mut computer = computer();
        computer
            .program(VertexProgram::new("empty").with_memory_compute_keys([""]))
            .expect("program");
        assert_eq!(
            computer.submit().err(),
            Some(ComputeError::MemoryKeyCanNotBeEmpty)
        );
    }

    /// T0.7: Writing an undeclared memory key aborts the computation.
    #[test]
    fn undeclared_memory_key_rejected() {
        let mut computer = computer();
        computer
            .program(VertexProgram::new("undeclared").with_setup(|memory| memory.set("a", true)))
            .expect("program");
        let result = computer.submit().expect("submit").join();
        assert_eq!(
            result.err(),
            Some(ComputeError::ProvidedKeyIsNotAMemoryComputeKey("a".into()))
        );
    }
}

// =============================================================================
// TIER T1: MEMORY CONTRACT
// =============================================================================

mod t1_memory {
    use super::*;
    use bulkstep_core::WorkerMemory;

    /// Worker reads must reflect the last barrier only.
    fn check_previous_superstep(memory: &WorkerMemory<'_>) -> Result<(), ComputeError> {
        let iteration = memory.iteration() as i64;
        assert_eq!(memory.get("a")?, Value::Long(6 * iteration));
        assert_eq!(memory.get("b")?, Value::Long(0));
        let first = memory.is_initial_iteration();
        assert_eq!(memory.get("c")?, Value::Bool(first));
        assert_eq!(memory.get("d")?, Value::Bool(!first));
        assert_eq!(memory.get("e")?, Value::Bool(true));
        Ok(())
    }

    /// T1.1: Delivered memory is immutable.
    #[test]
    fn result_memory_is_immutable() {
        let result = run_program(
            VertexProgram::new("noop").with_memory_compute_keys(["set", "incr", "and", "or"]),
        );
        let memory = result.memory();
        let immutable = Err(ComputeError::MemoryIsCurrentlyImmutable);
        assert_eq!(memory.set("set", "test"), immutable);
        assert_eq!(memory.incr("incr", 1), immutable);
        assert_eq!(memory.and("and", true), immutable);
        assert_eq!(memory.or("or", false), immutable);
    }

    /// T1.2: and / or / incr fold per superstep; reads lag by one superstep.
    #[test]
    fn and_or_incr_through_supersteps() {
        let program = VertexProgram::new("abcde")
            .with_setup(|memory| {
                memory.set("a", 0i64)?;
                memory.set("b", 0i64)?;
                memory.set("c", true)?;
                memory.set("d", false)?;
                memory.set("e", true)
            })
            .with_execute(|_, _, memory| {
                check_previous_superstep(memory)?;
                memory.incr("a", 1)?;
                memory.incr("b", 1)?;
                memory.and("c", false)?;
                memory.or("d", true)?;
                memory.and("e", false)?;
                check_previous_superstep(memory)
            })
            .with_terminate(|memory| {
                let iteration = memory.iteration() as i64;
                assert_eq!(memory.get("a")?, Value::Long(6 * (iteration + 1)));
                assert_eq!(memory.get("b")?, Value::Long(6));
                assert_eq!(memory.get("c")?, Value::Bool(false));
                assert_eq!(memory.get("d")?, Value::Bool(true));
                assert_eq!(memory.get("e")?, Value::Bool(false));
                memory.set("b", 0i64)?;
                memory.set("e", true)?;
                Ok(memory.iteration() > 1)
            })
            .with_memory_compute_keys(["a", "b", "c", "d", "e"]);

        let result = run_program(program);
        let memory = result.memory();
        assert_eq!(memory.iteration(), 2);
        assert_eq!(memory.as_map().len(), 5);
        assert_eq!(memory.keys().len(), 5);
        assert_eq!(long(&result, "a"), 18);
        assert_eq!(long(&result, "b"), 0);
        assert!(!boolean(&result, "c"));
        assert!(boolean(&result, "d"));
        assert!(boolean(&result, "e"));
    }

    /// T1.3: Unknown keys are not found; reads are idempotent.
    #[test]
    fn reads_are_idempotent() {
        let result = run_program(
            VertexProgram::new("once")
                .with_setup(|memory| memory.set("a", "x"))
                .with_memory_compute_keys(["a"]),
        );
        let memory = result.memory();
        assert_eq!(
            memory.get("BAD").err().map(|e| e.to_string()),
            Some("The memory does not have a value for provided key: BAD".to_string())
        );
        for _ in 0..3 {
            assert_eq!(memory.get("a").expect("a"), Value::from("x"));
        }
        assert_eq!(memory.as_map(), memory.as_map());
        assert!(memory.is_frozen());
    }

    /// T1.4: Mixing set and incr on one key fails whatever the partitioning.
    #[test]
    fn mixed_reductions_fail_for_every_worker_count() {
        for workers in [1, 2, 6] {
            let mut computer = computer_with(ComputerConfig {
                workers,
                ..ComputerConfig::default()
            });
            computer
                .program(
                    VertexProgram::new("mixed")
                        .with_execute(|vertex, _, memory| {
                            if vertex.id() == VertexId(1) {
                                memory.set("k", 100i64)
                            } else {
                                memory.incr("k", 1)
                            }
                        })
                        .with_memory_compute_keys(["k"]),
                )
                .expect("program");
            let result = computer.submit().expect("submit").join();
            assert_eq!(
                result.err(),
                Some(ComputeError::IncompatibleMemoryReduction {
                    key: "k".to_string(),
                    operation: "incr".to_string(),
                }),
                "workers = {workers}"
            );
        }
    }
}

// =============================================================================
// TIER T2: VERTEX PROGRAM EXECUTION
// =============================================================================

mod t2_vertex_program {
    use super::*;

    fn name_length(vertex: &bulkstep_core::ComputeVertex<'_>) -> Result<i64, ComputeError> {
        Ok(vertex
            .value("name")?
            .as_str()
            .map(|name| name.len() as i64)
            .unwrap_or(0))
    }

    /// T2.1: Memory, properties and key violations stay consistent.
    #[test]
    fn consistent_memory_vertex_properties_and_errors() {
        let program = VertexProgram::new("name-length")
            .with_execute(|vertex, _, memory| {
                assert_eq!(
                    vertex.set_property("blah", "blah").err().map(|e| e.to_string()),
                    Some("The provided key is not an element compute key: blah".to_string())
                );

                memory.incr("a", 1)?;
                let length = name_length(vertex)?;
                if memory.is_initial_iteration() {
                    vertex.set_property("nameLengthCounter", length)?;
                    memory.incr("b", length)
                } else {
                    let counter = vertex
                        .value("nameLengthCounter")?
                        .as_long()
                        .unwrap_or(0);
                    vertex.set_property("nameLengthCounter", length + counter)
                }
            })
            .with_terminate(|memory| Ok(memory.iteration() == 1))
            .with_element_compute_keys(["nameLengthCounter"])
            .with_memory_compute_keys(["a", "b"]);

        let result = run_program(program);
        let memory = result.memory();
        assert_eq!(memory.iteration(), 1);
        assert_eq!(memory.as_map().len(), 2);
        assert_eq!(
            memory.keys(),
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
        assert_eq!(long(&result, "a"), 12);
        assert_eq!(long(&result, "b"), 28);

        let graph = result.graph();
        assert_eq!(graph.vertex_count(), 6);
        for id in graph.vertex_ids() {
            let name = graph.properties(id, "name").expect("name");
            let length = name[0].as_str().map(str::len).unwrap_or(0) as i64;
            assert_eq!(
                graph.properties(id, "nameLengthCounter").expect("counter"),
                vec![Value::Long(2 * length)]
            );
        }
    }

    /// T2.2: incr once per vertex per superstep yields V x d x S.
    #[test]
    fn incr_accumulates_over_supersteps() {
        let program = VertexProgram::new("incr")
            .with_execute(|_, _, memory| memory.incr("a", 1))
            .with_terminate(|memory| Ok(memory.iteration() == 1))
            .with_memory_compute_keys(["a"]);
        assert_eq!(long(&run_program(program), "a"), 12);
    }

    /// T2.3: A program that never terminates hits the superstep guard.
    #[test]
    fn runaway_program_aborted() {
        let mut computer = computer_with(ComputerConfig {
            max_supersteps: 5,
            ..ComputerConfig::default()
        });
        computer
            .program(VertexProgram::new("forever").with_terminate(|_| Ok(false)))
            .expect("program");
        let result = computer.submit().expect("submit").join();
        assert_eq!(result.err(), Some(ComputeError::SuperstepLimitExceeded(5)));
    }

    /// T2.4: A failing callback aborts the computation with its error.
    #[test]
    fn callback_error_surfaces_from_join() {
        let program = VertexProgram::new("missing").with_execute(|vertex, _, _| {
            vertex.value("salary").map(|_| ())
        });
        let mut computer = computer();
        computer.program(program).expect("program");
        let result = computer.submit().expect("submit").join();
        assert!(matches!(
            result,
            Err(ComputeError::PropertyDoesNotExist { .. })
        ));
    }

    /// T2.5: The handle reports completion.
    #[test]
    fn handle_reports_completion() {
        let mut computer = computer();
        computer.program(VertexProgram::default()).expect("program");
        let handle = computer.submit().expect("submit");
        let result = handle.join().expect("join");
        assert!(result.memory().runtime() >= std::time::Duration::ZERO);
        assert_eq!(result.memory().iteration(), 0);
    }
}

// =============================================================================
// TIER T3: MAP-REDUCE
// =============================================================================

mod t3_map_reduce {
    use super::*;

    fn first_value(pairs: Vec<bulkstep_core::KeyValue>) -> Result<Value, ComputeError> {
        Ok(pairs
            .into_iter()
            .next()
            .map(|kv| kv.value)
            .unwrap_or(Value::Null))
    }

    fn sum(values: &[Value]) -> i64 {
        values.iter().filter_map(Value::as_long).sum()
    }

    /// T3.1: Map-reduce without a vertex program.
    #[test]
    fn map_reduce_without_vertex_program() {
        let job = MapReduce::new("ageSum")
            .with_map(|vertex, emitter| {
                if let Some(age) = vertex.property("age")? {
                    emitter.emit_value(age);
                }
                Ok(())
            })
            .with_reduce(|_, values, emitter| {
                emitter.emit_value(sum(&values));
                Ok(())
            })
            .with_memory(first_value);

        let mut computer = computer();
        computer.map_reduce(job).expect("job");
        let result = run(computer);
        assert_eq!(long(&result, "ageSum"), 123);
        assert_eq!(
            result.memory().keys(),
            BTreeSet::from(["ageSum".to_string()])
        );
        assert!(result.graph().properties(VertexId(1), "counter").expect("props").is_empty());
    }

    /// T3.2: Jobs chained after a program each see the final graph.
    #[test]
    fn multiple_map_reduce_jobs() {
        let program = VertexProgram::new("counter")
            .with_execute(|vertex, _, memory| {
                let next = if memory.is_initial_iteration() {
                    1
                } else {
                    vertex.value("counter")?.as_long().unwrap_or(0) + 1
                };
                vertex.set_property("counter", next)
            })
            .with_terminate(|memory| Ok(memory.iteration() > 8))
            .with_element_compute_keys(["counter"]);

        let a = MapReduce::new("a")
            .with_map(|vertex, emitter| {
                emitter.emit_value(vertex.value("counter")?);
                Ok(())
            })
            .with_reduce(|_, values, emitter| {
                emitter.emit_value(sum(&values));
                Ok(())
            })
            .with_memory(first_value);

        let b = MapReduce::new("b")
            .with_map(|vertex, emitter| {
                emitter.emit_value(vertex.value("counter")?);
                Ok(())
            })
            .with_combine(|_, _, emitter| {
                emitter.emit_value(1i64);
                Ok(())
            })
            .with_reduce(|_, _, emitter| {
                emitter.emit_value(1i64);
                Ok(())
            })
            .with_memory(first_value);

        let mut computer = computer();
        computer.program(program).expect("program");
        computer.map_reduce(a).expect("a");
        computer.map_reduce(b).expect("b");
        let result = run(computer);
        assert_eq!(long(&result, "a"), 60);
        assert_eq!(long(&result, "b"), 1);
        assert_eq!(result.memory().iteration(), 9);
    }

    /// T3.3: A custom key order reaches the finalizer.
    #[test]
    fn reduce_output_sorted_in_reverse() {
        let job = MapReduce::new("ids")
            .with_map(|vertex, emitter| {
                emitter.emit(vertex.id(), vertex.id());
                Ok(())
            })
            .with_reduce(|_, values, emitter| {
                for id in values {
                    emitter.emit(id.clone(), id);
                }
                Ok(())
            })
            .with_reduce_key_sort(|a, b| b.cmp(a))
            .with_memory(|pairs| Ok(Value::List(pairs.into_iter().map(|kv| kv.key).collect())));

        let mut computer = computer();
        computer.map_reduce(job).expect("job");
        let result = run(computer);
        let ids = result.memory().get("ids").expect("ids");
        let ids = ids.as_list().expect("list");
        assert_eq!(ids.len(), 6);
        for pair in ids.windows(2) {
            assert!(pair[1] < pair[0]);
        }
    }

    /// T3.4: Map-reduce cannot touch adjacency.
    #[test]
    fn edge_access_in_map_reduce_rejected() {
        let job = MapReduce::new("outE")
            .with_map(|vertex, emitter| {
                emitter.emit_value(vertex.edges(Direction::Out, None)?.len());
                Ok(())
            })
            .with_reduce(|_, values, emitter| {
                emitter.emit_value(sum(&values));
                Ok(())
            });

        let mut computer = computer();
        computer.map_reduce(job).expect("job");
        let result = computer.submit().expect("submit").join();
        assert_eq!(
            result.err(),
            Some(ComputeError::IncidentAndAdjacentElementsCanNotBeAccessedInMapReduce)
        );
    }
}

// =============================================================================
// TIER T4: MESSAGING & ISOLATION
// =============================================================================

mod t4_messaging {
    use super::*;

    /// T4.1: Messages arrive exactly one superstep later.
    #[test]
    fn messages_delivered_next_superstep() {
        let program = VertexProgram::new("in-degree")
            .with_execute(|vertex, messenger, memory| {
                if memory.is_initial_iteration() {
                    assert_eq!(messenger.receive().count(), 0);
                    messenger.send(&MessageScope::adjacent(Direction::Out), 1i64)?;
                    Ok(())
                } else {
                    let received = messenger.receive().count();
                    vertex.set_property("inDegree", received)?;
                    memory.incr("messages", received as i64)
                }
            })
            .with_terminate(|memory| Ok(memory.iteration() == 1))
            .with_element_compute_keys(["inDegree"])
            .with_memory_compute_keys(["messages"]);

        let result = run_program(program);
        assert_eq!(long(&result, "messages"), 6);
        let lop = result
            .graph()
            .properties(VertexId(3), "inDegree")
            .expect("inDegree");
        assert_eq!(lop, vec![Value::Long(3)]);
    }

    /// T4.2: A combiner folds messages before delivery.
    #[test]
    fn combiner_folds_to_single_message() {
        let program = VertexProgram::new("max-age")
            .with_execute(|vertex, messenger, memory| {
                if memory.is_initial_iteration() {
                    if let Some(age) = vertex.property("age")? {
                        messenger.send(&MessageScope::adjacent(Direction::Out), age)?;
                    }
                    return Ok(());
                }
                let inbox: Vec<Value> = messenger.receive().cloned().collect();
                assert!(inbox.len() <= 1);
                if let Some(max) = inbox.into_iter().next() {
                    vertex.set_property("maxCreatorAge", max)?;
                }
                Ok(())
            })
            .with_terminate(|memory| Ok(memory.iteration() == 1))
            .with_element_compute_keys(["maxCreatorAge"])
            .with_message_combiner(|a, b| a.max(b));

        let result = run_program(program);
        assert_eq!(
            result
                .graph()
                .properties(VertexId(3), "maxCreatorAge")
                .expect("lop"),
            vec![Value::Long(35)]
        );
    }

    /// T4.3: Results do not depend on the worker count.
    #[test]
    fn results_independent_of_workers() {
        let sums: Vec<i64> = [1, 2, 3, 6, 16]
            .into_iter()
            .map(|workers| {
                let mut computer = computer_with(ComputerConfig {
                    workers,
                    ..ComputerConfig::default()
                });
                computer
                    .program(
                        VertexProgram::new("degree")
                            .with_execute(|vertex, _, memory| {
                                let degree = vertex.edges(Direction::Both, None)?.len();
                                memory.incr("degrees", degree as i64)
                            })
                            .with_memory_compute_keys(["degrees"]),
                    )
                    .expect("program");
                long(&run(computer), "degrees")
            })
            .collect();
        assert!(sums.iter().all(|&s| s == 12));
    }

    /// T4.4: Under DIRTY_BSP a worker reads its own pending writes.
    #[test]
    fn dirty_bsp_exposes_own_writes() {
        let config = ComputerConfig {
            workers: 1,
            ..ComputerConfig::default()
        };
        let mut computer = open_computer(Arc::new(modern()), &[], config).expect("open");
        computer.isolation(Isolation::DirtyBsp).expect("isolation");
        computer
            .program(
                VertexProgram::new("dirty")
                    .with_setup(|memory| memory.set("seen", 0i64))
                    .with_execute(|_, _, memory| {
                        let before = memory.get("seen")?.as_long().unwrap_or(0);
                        memory.incr("seen", 1)?;
                        let after = memory.get("seen")?.as_long().unwrap_or(0);
                        assert_eq!(after, before + 1);
                        Ok(())
                    })
                    .with_memory_compute_keys(["seen"]),
            )
            .expect("program");
        assert_eq!(long(&run(computer), "seen"), 6);
    }

    /// T4.5: Global scope to an unknown vertex aborts.
    #[test]
    fn global_message_to_unknown_vertex_rejected() {
        let mut graph = MemGraph::new();
        graph.add_vertex(VertexId(1), "node");
        let mut computer =
            open_computer(Arc::new(graph), &[], ComputerConfig::default()).expect("open");
        computer
            .program(VertexProgram::new("lost").with_execute(|_, messenger, _| {
                messenger.send(&MessageScope::Global(vec![VertexId(42)]), true)
            }))
            .expect("program");
        let result = computer.submit().expect("submit").join();
        assert_eq!(
            result.err(),
            Some(ComputeError::VertexDoesNotExist(VertexId(42)))
        );
    }
}
