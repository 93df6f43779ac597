//! Superstep executor.
//!
//! Runs on the computation thread spawned by `submit()`. Partitions are
//! fixed for the whole computation and always visited in the same order,
//! so memory reductions and message inboxes are reproducible across runs.

use super::ComputerResult;
use crate::mapreduce::MapReduce;
use crate::memory::{Memory, MemoryBuffer, WorkerMemory};
use crate::messenger::{MessageBoard, Messenger, Outbox};
use crate::primitives::{MAX_WORKERS, MIN_PARTITION_SIZE};
use crate::program::{ComputeVertex, VertexProgram};
use crate::structure::Graph;
use crate::{ComputeError, VertexId};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use std::time::Instant;

/// Everything a computation needs, moved onto the computation thread.
pub(crate) struct Execution {
    pub(crate) graph: Arc<dyn Graph>,
    pub(crate) program: Option<VertexProgram>,
    pub(crate) jobs: Vec<MapReduce>,
    pub(crate) memory: Memory,
    pub(crate) workers: usize,
    pub(crate) max_supersteps: u64,
}

impl Execution {
    pub(crate) fn run(self) -> Result<ComputerResult, ComputeError> {
        let started = Instant::now();
        match self.execute(started) {
            Ok(()) => {
                self.memory.freeze(started.elapsed());
                tracing::info!(
                    iteration = self.memory.iteration(),
                    runtime_ms = self.memory.runtime().as_millis() as u64,
                    "Computation complete"
                );
                Ok(ComputerResult::new(self.graph, self.memory))
            }
            Err(e) => {
                tracing::error!(error = %e, "Computation aborted");
                Err(e)
            }
        }
    }

    fn execute(&self, started: Instant) -> Result<(), ComputeError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("bulkstep-worker-{i}"))
            .build()
            .map_err(|e| ComputeError::ExecutorUnavailable(e.to_string()))?;
        let partitions = partition(self.graph.vertex_ids(), self.workers);

        if let Some(program) = &self.program {
            self.run_program(program, &partitions, &pool, started)?;
        }

        for job in &self.jobs {
            tracing::debug!(job = %job, "Running map-reduce");
            let value = job.run(self.graph.as_ref(), &partitions, &pool)?;
            self.memory.finalize_map_reduce(&job.memory_key, value)?;
            self.memory.set_runtime(started.elapsed());
        }
        Ok(())
    }

    fn run_program(
        &self,
        program: &VertexProgram,
        partitions: &[Vec<VertexId>],
        pool: &ThreadPool,
        started: Instant,
    ) -> Result<(), ComputeError> {
        let graph = self.graph.as_ref();
        let memory = &self.memory;

        (program.setup)(memory)?;

        let mut board = MessageBoard::empty();
        let mut supersteps: u64 = 0;
        loop {
            memory.set_runtime(started.elapsed());

            let outcomes = pool.install(|| {
                partitions
                    .par_iter()
                    .map(|partition| superstep(program, graph, memory, &board, partition))
                    .collect::<Result<Vec<_>, ComputeError>>()
            })?;
            let (buffers, outboxes): (Vec<MemoryBuffer>, Vec<Outbox>) =
                outcomes.into_iter().unzip();
            let sent: usize = outboxes.iter().map(Outbox::len).sum();

            memory.apply_barrier(buffers)?;
            board = MessageBoard::deliver(outboxes, program.message_combiner.as_ref());
            supersteps = supersteps.saturating_add(1);
            memory.set_runtime(started.elapsed());
            tracing::debug!(
                program = %program,
                iteration = memory.iteration(),
                messages = sent,
                "Superstep complete"
            );

            if (program.terminate)(memory)? {
                return Ok(());
            }
            if supersteps >= self.max_supersteps {
                return Err(ComputeError::SuperstepLimitExceeded(self.max_supersteps));
            }
            memory.advance_iteration();
        }
    }
}

/// Execute one partition for one superstep.
fn superstep(
    program: &VertexProgram,
    graph: &dyn Graph,
    memory: &Memory,
    board: &MessageBoard,
    partition: &[VertexId],
) -> Result<(MemoryBuffer, Outbox), ComputeError> {
    let mut worker = WorkerMemory::new(memory);
    let mut outbox = Outbox::default();
    for &id in partition {
        let vertex = ComputeVertex::for_program(id, graph, &program.element_compute_keys);
        let mut messenger = Messenger::new(id, graph, board.inbox(id), &mut outbox);
        (program.execute)(&vertex, &mut messenger, &mut worker)?;
    }
    Ok((worker.into_buffer(), outbox))
}

/// Split ids into at most `workers` contiguous partitions.
fn partition(ids: Vec<VertexId>, workers: usize) -> Vec<Vec<VertexId>> {
    if ids.is_empty() {
        return Vec::new();
    }
    let parts = workers.clamp(1, MAX_WORKERS);
    let size = ids.len().div_ceil(parts).max(MIN_PARTITION_SIZE);
    ids.chunks(size).map(<[VertexId]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u64) -> Vec<VertexId> {
        (1..=n).map(VertexId).collect()
    }

    #[test]
    fn partitions_cover_every_vertex_once() {
        let parts = partition(ids(6), 4);
        assert_eq!(parts.len(), 3);
        let flat: Vec<VertexId> = parts.into_iter().flatten().collect();
        assert_eq!(flat, ids(6));
    }

    #[test]
    fn more_workers_than_vertices() {
        let parts = partition(ids(2), 8);
        assert_eq!(parts, vec![vec![VertexId(1)], vec![VertexId(2)]]);
    }

    #[test]
    fn empty_graph_has_no_partitions() {
        assert!(partition(Vec::new(), 4).is_empty());
    }

    #[test]
    fn single_worker_takes_everything() {
        assert_eq!(partition(ids(5), 1), vec![ids(5)]);
    }
}
