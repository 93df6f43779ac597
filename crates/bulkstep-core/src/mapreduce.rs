//! # Map-Reduce
//!
//! Post-processing passes over the graph, run after the vertex program (or on
//! their own). Each job goes through four stages:
//!
//! 1. **map**: once per vertex, inside the vertex's partition.
//! 2. **combine** (optional): per partition, over that partition's map output
//!    grouped by key.
//! 3. **reduce** (optional): once per distinct key, over the shuffled values.
//! 4. **finalize**: folds the sorted final pairs into one [`Value`], stored in
//!    memory under the job's `memory_key`.
//!
//! Vertices seen by a job are read-only and their adjacency is hidden.

use crate::program::ComputeVertex;
use crate::structure::Graph;
use crate::{ComputeError, Value, VertexId};
use rayon::ThreadPool;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One emitted pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Value,
    pub value: Value,
}

impl KeyValue {
    #[must_use]
    pub fn new(key: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Collects the pairs emitted by a map, combine or reduce function.
#[derive(Debug, Default)]
pub struct Emitter {
    pairs: Vec<KeyValue>,
}

pub type MapEmitter = Emitter;
pub type ReduceEmitter = Emitter;

impl Emitter {
    pub fn emit(&mut self, key: impl Into<Value>, value: impl Into<Value>) {
        self.pairs.push(KeyValue::new(key, value));
    }

    /// Emit under the null key.
    pub fn emit_value(&mut self, value: impl Into<Value>) {
        self.pairs.push(KeyValue::new(Value::Null, value));
    }

    fn into_pairs(self) -> Vec<KeyValue> {
        self.pairs
    }
}

pub type MapFn =
    Arc<dyn Fn(&ComputeVertex<'_>, &mut MapEmitter) -> Result<(), ComputeError> + Send + Sync>;

pub type ReduceFn =
    Arc<dyn Fn(&Value, Vec<Value>, &mut ReduceEmitter) -> Result<(), ComputeError> + Send + Sync>;

pub type KeySortFn = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

pub type FinalizeFn = Arc<dyn Fn(Vec<KeyValue>) -> Result<Value, ComputeError> + Send + Sync>;

/// Declaration of one map-reduce job.
///
/// Without a `reduce`, the map (or combine) output goes straight to
/// finalization. Without a `reduce_key_sort`, final pairs are ordered by
/// the natural [`Value`] order of their keys.
#[derive(Clone)]
pub struct MapReduce {
    pub memory_key: String,
    pub map: MapFn,
    pub combine: Option<ReduceFn>,
    pub reduce: Option<ReduceFn>,
    pub reduce_key_sort: Option<KeySortFn>,
    /// Defaults to the list of final values.
    pub memory: FinalizeFn,
}

impl MapReduce {
    #[must_use]
    pub fn new(memory_key: impl Into<String>) -> Self {
        Self {
            memory_key: memory_key.into(),
            map: Arc::new(|_, _| Ok(())),
            combine: None,
            reduce: None,
            reduce_key_sort: None,
            memory: Arc::new(|pairs| {
                Ok(Value::List(pairs.into_iter().map(|kv| kv.value).collect()))
            }),
        }
    }

    #[must_use]
    pub fn with_map<F>(mut self, map: F) -> Self
    where
        F: Fn(&ComputeVertex<'_>, &mut MapEmitter) -> Result<(), ComputeError>
            + Send
            + Sync
            + 'static,
    {
        self.map = Arc::new(map);
        self
    }

    #[must_use]
    pub fn with_combine<F>(mut self, combine: F) -> Self
    where
        F: Fn(&Value, Vec<Value>, &mut ReduceEmitter) -> Result<(), ComputeError>
            + Send
            + Sync
            + 'static,
    {
        self.combine = Some(Arc::new(combine));
        self
    }

    #[must_use]
    pub fn with_reduce<F>(mut self, reduce: F) -> Self
    where
        F: Fn(&Value, Vec<Value>, &mut ReduceEmitter) -> Result<(), ComputeError>
            + Send
            + Sync
            + 'static,
    {
        self.reduce = Some(Arc::new(reduce));
        self
    }

    #[must_use]
    pub fn with_reduce_key_sort<F>(mut self, sort: F) -> Self
    where
        F: Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        self.reduce_key_sort = Some(Arc::new(sort));
        self
    }

    #[must_use]
    pub fn with_memory<F>(mut self, memory: F) -> Self
    where
        F: Fn(Vec<KeyValue>) -> Result<Value, ComputeError> + Send + Sync + 'static,
    {
        self.memory = Arc::new(memory);
        self
    }

    // =========================================================================
    // PIPELINE
    // =========================================================================

    /// Run the job over the given partitions and return the finalized value.
    pub(crate) fn run(
        &self,
        graph: &dyn Graph,
        partitions: &[Vec<VertexId>],
        pool: &ThreadPool,
    ) -> Result<Value, ComputeError> {
        let mapped: Vec<Vec<KeyValue>> = pool.install(|| {
            partitions
                .par_iter()
                .map(|partition| self.map_partition(graph, partition))
                .collect::<Result<Vec<_>, ComputeError>>()
        })?;
        tracing::debug!(
            job = %self.memory_key,
            pairs = mapped.iter().map(Vec::len).sum::<usize>(),
            "map stage complete"
        );

        let mut pairs = match &self.reduce {
            Some(reduce) => {
                let mut emitter = ReduceEmitter::default();
                for (key, values) in shuffle(mapped) {
                    reduce(&key, values, &mut emitter)?;
                }
                emitter.into_pairs()
            }
            None => mapped.into_iter().flatten().collect(),
        };

        match &self.reduce_key_sort {
            Some(sort) => pairs.sort_by(|a, b| sort(&a.key, &b.key)),
            None => pairs.sort_by(|a, b| a.key.cmp(&b.key)),
        }
        tracing::debug!(job = %self.memory_key, pairs = pairs.len(), "finalizing");

        (self.memory)(pairs)
    }

    fn map_partition(
        &self,
        graph: &dyn Graph,
        partition: &[VertexId],
    ) -> Result<Vec<KeyValue>, ComputeError> {
        let mut emitter = MapEmitter::default();
        for &id in partition {
            let vertex = ComputeVertex::for_map_reduce(id, graph);
            (self.map)(&vertex, &mut emitter)?;
        }

        let Some(combine) = &self.combine else {
            return Ok(emitter.into_pairs());
        };
        let mut combined = ReduceEmitter::default();
        for (key, values) in shuffle(vec![emitter.into_pairs()]) {
            combine(&key, values, &mut combined)?;
        }
        Ok(combined.into_pairs())
    }
}

/// Group pairs by key. Values keep partition order, then emit order.
fn shuffle(partitions: Vec<Vec<KeyValue>>) -> BTreeMap<Value, Vec<Value>> {
    let mut groups: BTreeMap<Value, Vec<Value>> = BTreeMap::new();
    for pair in partitions.into_iter().flatten() {
        groups.entry(pair.key).or_default().push(pair.value);
    }
    groups
}

impl fmt::Debug for MapReduce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapReduce")
            .field("memory_key", &self.memory_key)
            .field("combine", &self.combine.is_some())
            .field("reduce", &self.reduce.is_some())
            .field("reduce_key_sort", &self.reduce_key_sort.is_some())
            .finish()
    }
}

impl fmt::Display for MapReduce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mapreduce[{}]", self.memory_key)
    }
}

// =============================================================================
// TESTS
// =============================================================================
