//! # Graph Computer
//!
//! Submission and execution of vertex programs and map-reduce jobs.
//!
//! A computer is single-use. It accepts at most one vertex program and any
//! number of map-reduce jobs, then `submit()` hands the work to a background
//! thread and returns a [`ComputerHandle`]:
//!
//! ```text
//! INIT -> SETUP -> { EXECUTE -> BARRIER -> TERMINATE? }* -> MAPREDUCE* -> DONE
//! ```
//!
//! ```
//! use std::sync::Arc;
//! use bulkstep_core::{ComputerConfig, MapReduce, Value, modern, open_computer};
//!
//! # fn main() -> Result<(), bulkstep_core::ComputeError> {
//! let mut computer = open_computer(Arc::new(modern()), &[], ComputerConfig::default())?;
//! computer.map_reduce(MapReduce::new("vertices").with_map(|_, emitter| {
//!     emitter.emit_value(1i64);
//!     Ok(())
//! }))?;
//! let result = computer.submit()?.join()?;
//! let vertices = result.memory().get("vertices")?;
//! assert_eq!(vertices.as_list().map(<[Value]>::len), Some(6));
//! # Ok(())
//! # }
//! ```

mod executor;
mod standard;

pub use standard::{ComputerHandle, StandardComputer};

use crate::mapreduce::MapReduce;
use crate::memory::Memory;
use crate::primitives::{DEFAULT_MAX_SUPERSTEPS, MAX_WORKERS, STANDARD_COMPUTER};
use crate::program::VertexProgram;
use crate::structure::Graph;
use crate::{ComputeError, Isolation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

// =============================================================================
// GRAPH COMPUTER TRAIT
// =============================================================================

/// A backend able to run vertex programs and map-reduce jobs over a graph.
pub trait GraphComputer: fmt::Display + Send {
    /// What this computer supports.
    fn features(&self) -> ComputerFeatures;

    /// Choose the isolation level. Must precede `submit()`.
    fn isolation(&mut self, isolation: Isolation) -> Result<(), ComputeError>;

    /// Register the vertex program. At most one is accepted.
    fn program(&mut self, program: VertexProgram) -> Result<(), ComputeError>;

    /// Register a map-reduce job. Jobs run in registration order.
    fn map_reduce(&mut self, job: MapReduce) -> Result<(), ComputeError>;

    /// Start the computation. Only the first call can succeed.
    fn submit(&mut self) -> Result<ComputerHandle, ComputeError>;
}

/// Capability report of a computer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputerFeatures {
    isolations: BTreeSet<Isolation>,
}

impl ComputerFeatures {
    #[must_use]
    pub fn supports_isolation(&self, isolation: Isolation) -> bool {
        self.isolations.contains(&isolation)
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Tunables of a computer. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputerConfig {
    /// Number of vertex partitions (and pool threads). Clamped to `1..=MAX_WORKERS`.
    pub workers: usize,
    /// Isolation levels the computer offers.
    pub isolations: BTreeSet<Isolation>,
    /// Abort a vertex program after this many supersteps.
    pub max_supersteps: u64,
}

impl Default for ComputerConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self {
            workers: workers.min(MAX_WORKERS),
            isolations: [Isolation::Bsp, Isolation::DirtyBsp].into(),
            max_supersteps: DEFAULT_MAX_SUPERSTEPS,
        }
    }
}

impl ComputerConfig {
    /// Worker count actually used.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }

    /// Isolation a fresh computer starts with.
    #[must_use]
    pub fn default_isolation(&self) -> Isolation {
        if self.isolations.contains(&Isolation::Bsp) {
            Isolation::Bsp
        } else {
            self.isolations.first().copied().unwrap_or(Isolation::Bsp)
        }
    }

    pub(crate) fn features(&self) -> ComputerFeatures {
        ComputerFeatures {
            isolations: self.isolations.clone(),
        }
    }
}

// =============================================================================
// RESULT
// =============================================================================

/// The outcome of a successful computation: the graph and the frozen memory.
pub struct ComputerResult {
    graph: Arc<dyn Graph>,
    memory: Memory,
}

impl ComputerResult {
    pub(crate) fn new(graph: Arc<dyn Graph>, memory: Memory) -> Self {
        Self { graph, memory }
    }

    /// The computed graph, with element compute keys written.
    #[must_use]
    pub fn graph(&self) -> &Arc<dyn Graph> {
        &self.graph
    }

    /// The frozen memory. Every mutation fails.
    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Split into graph and memory.
    #[must_use]
    pub fn into_parts(self) -> (Arc<dyn Graph>, Memory) {
        (self.graph, self.memory)
    }
}

impl fmt::Debug for ComputerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputerResult")
            .field("vertices", &self.graph.vertex_count())
            .field("memory", &self.memory)
            .finish()
    }
}

// =============================================================================
// SELECTION
// =============================================================================

/// Open a computer over `graph`.
///
/// `requested` names at most one implementation; an empty slice selects the
/// standard computer. The graph must list the chosen implementation.
pub fn open_computer(
    graph: Arc<dyn Graph>,
    requested: &[&str],
    config: ComputerConfig,
) -> Result<Box<dyn GraphComputer>, ComputeError> {
    if requested.len() > 1 {
        return Err(ComputeError::OnlyOneOrNoGraphComputerClass(
            requested.iter().map(|s| s.to_string()).collect(),
        ));
    }
    let name = requested.first().copied().unwrap_or(STANDARD_COMPUTER);
    if !graph.supported_computers().iter().any(|c| c == name) {
        return Err(ComputeError::GraphDoesNotSupportProvidedGraphComputer(
            name.to_string(),
        ));
    }
    match name {
        STANDARD_COMPUTER => Ok(Box::new(StandardComputer::new(graph, config))),
        other => Err(ComputeError::GraphDoesNotSupportProvidedGraphComputer(
            other.to_string(),
        )),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{MemGraph, modern};

    #[test]
    fn default_config_offers_both_isolations() {
        let config = ComputerConfig::default();
        let features = config.features();
        assert!(features.supports_isolation(Isolation::Bsp));
        assert!(features.supports_isolation(Isolation::DirtyBsp));
        assert!(config.effective_workers() >= 1);
        assert_eq!(config.max_supersteps, DEFAULT_MAX_SUPERSTEPS);
    }

    #[test]
    fn worker_count_is_clamped() {
        let config = ComputerConfig {
            workers: 0,
            ..ComputerConfig::default()
        };
        assert_eq!(config.effective_workers(), 1);

        let config = ComputerConfig {
            workers: MAX_WORKERS * 2,
            ..ComputerConfig::default()
        };
        assert_eq!(config.effective_workers(), MAX_WORKERS);
    }

    #[test]
    fn default_isolation_falls_back_to_offered_level() {
        let config = ComputerConfig {
            isolations: [Isolation::DirtyBsp].into(),
            ..ComputerConfig::default()
        };
        assert_eq!(config.default_isolation(), Isolation::DirtyBsp);
    }

    #[test]
    fn more_than_one_requested_computer_rejected() {
        let result = open_computer(
            Arc::new(modern()),
            &["standard", "other"],
            ComputerConfig::default(),
        );
        assert!(matches!(
            result,
            Err(ComputeError::OnlyOneOrNoGraphComputerClass(names)) if names.len() == 2
        ));
    }

    #[test]
    fn unlisted_computer_rejected() {
        let result = open_computer(Arc::new(modern()), &["spark"], ComputerConfig::default());
        assert!(matches!(
            result,
            Err(ComputeError::GraphDoesNotSupportProvidedGraphComputer(name)) if name == "spark"
        ));
    }

    #[test]
    fn graph_without_standard_computer_rejects_default() {
        let graph = MemGraph::new().with_computers(["remote"]);
        let result = open_computer(Arc::new(graph), &[], ComputerConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn listed_but_unknown_computer_rejected() {
        let graph = MemGraph::new().with_computers(["remote"]);
        let result = open_computer(Arc::new(graph), &["remote"], ComputerConfig::default());
        assert!(matches!(
            result,
            Err(ComputeError::GraphDoesNotSupportProvidedGraphComputer(name)) if name == "remote"
        ));
    }
}
