//! The in-process computer.

use super::executor::Execution;
use super::{ComputerConfig, ComputerFeatures, ComputerResult, GraphComputer};
use crate::mapreduce::MapReduce;
use crate::memory::Memory;
use crate::primitives::STANDARD_COMPUTER;
use crate::program::VertexProgram;
use crate::structure::Graph;
use crate::{ComputeError, Isolation};
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Runs every partition of the graph on a local thread pool.
pub struct StandardComputer {
    graph: Arc<dyn Graph>,
    config: ComputerConfig,
    isolation: Isolation,
    program: Option<VertexProgram>,
    jobs: Vec<MapReduce>,
    submitted: bool,
}

impl StandardComputer {
    #[must_use]
    pub fn new(graph: Arc<dyn Graph>, config: ComputerConfig) -> Self {
        let isolation = config.default_isolation();
        Self {
            graph,
            config,
            isolation,
            program: None,
            jobs: Vec::new(),
            submitted: false,
        }
    }

    fn prepare(&self) -> Result<Execution, ComputeError> {
        if self.program.is_none() && self.jobs.is_empty() {
            return Err(ComputeError::ComputerHasNoVertexProgramNorMapReducers);
        }
        let compute_keys = self
            .program
            .as_ref()
            .map(|p| p.memory_compute_keys.clone())
            .unwrap_or_default();
        let mut map_reduce_keys = BTreeSet::new();
        for job in &self.jobs {
            if compute_keys.contains(&job.memory_key)
                || !map_reduce_keys.insert(job.memory_key.clone())
            {
                return Err(ComputeError::MemoryKeyAlreadyInUse(job.memory_key.clone()));
            }
        }
        let memory = Memory::new(compute_keys, map_reduce_keys, self.isolation)?;

        Ok(Execution {
            graph: Arc::clone(&self.graph),
            program: self.program.clone(),
            jobs: self.jobs.clone(),
            memory,
            workers: self.config.effective_workers(),
            max_supersteps: self.config.max_supersteps,
        })
    }
}

impl GraphComputer for StandardComputer {
    fn features(&self) -> ComputerFeatures {
        self.config.features()
    }

    fn isolation(&mut self, isolation: Isolation) -> Result<(), ComputeError> {
        if self.submitted {
            return Err(ComputeError::AlreadySubmitted);
        }
        if !self.features().supports_isolation(isolation) {
            return Err(ComputeError::IsolationNotSupported(isolation));
        }
        self.isolation = isolation;
        Ok(())
    }

    fn program(&mut self, program: VertexProgram) -> Result<(), ComputeError> {
        if self.submitted || self.program.is_some() {
            return Err(ComputeError::ComputerHasAlreadyBeenSubmittedAVertexProgram);
        }
        self.program = Some(program);
        Ok(())
    }

    fn map_reduce(&mut self, job: MapReduce) -> Result<(), ComputeError> {
        if self.submitted {
            return Err(ComputeError::AlreadySubmitted);
        }
        self.jobs.push(job);
        Ok(())
    }

    fn submit(&mut self) -> Result<ComputerHandle, ComputeError> {
        if self.submitted {
            return Err(ComputeError::AlreadySubmitted);
        }
        // A failed validation still consumes the computer.
        self.submitted = true;

        let execution = self.prepare()?;
        tracing::info!(
            computer = %self,
            workers = execution.workers,
            vertices = self.graph.vertex_count(),
            "Submitting computation"
        );

        let inner = thread::Builder::new()
            .name("bulkstep-computer".to_string())
            .spawn(move || execution.run())
            .map_err(|e| ComputeError::ExecutorUnavailable(e.to_string()))?;
        Ok(ComputerHandle { inner })
    }
}

impl fmt::Display for StandardComputer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self
            .program
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("none");
        write!(
            f,
            "graphcomputer[{},{},{},{}]",
            STANDARD_COMPUTER,
            self.isolation.to_string().to_lowercase(),
            program,
            self.jobs.len()
        )
    }
}

impl fmt::Debug for StandardComputer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardComputer")
            .field("config", &self.config)
            .field("isolation", &self.isolation)
            .field("program", &self.program)
            .field("jobs", &self.jobs)
            .field("submitted", &self.submitted)
            .finish()
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Completion handle of a submitted computation.
#[derive(Debug)]
pub struct ComputerHandle {
    inner: JoinHandle<Result<ComputerResult, ComputeError>>,
}

impl ComputerHandle {
    /// Block until the computation completes.
    ///
    /// A callback that panicked is reported as [`ComputeError::ComputationPanicked`].
    pub fn join(self) -> Result<ComputerResult, ComputeError> {
        self.inner
            .join()
            .map_err(|payload| ComputeError::ComputationPanicked(panic_message(payload.as_ref())))?
    }

    /// Whether the computation has completed, successfully or not.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================
