//! # Memory
//!
//! The synchronized key/value store shared by every vertex of a computation.
//!
//! Two views exist:
//! - [`Memory`] is the store itself. The master phases (`setup`, `terminate`,
//!   map-reduce finalization) write to it directly and the writes take effect
//!   immediately.
//! - [`WorkerMemory`] is handed to `execute`. Reads go to the store as it was
//!   at the start of the superstep; writes are folded into a partition-local
//!   buffer and merged into the store at the barrier.
//!
//! Every write carries its reduction (`set`, `incr`, `and`, `or`). Buffers of
//! different partitions are merged in partition order, so the committed value
//! does not depend on thread scheduling.
//!
//! Once the result is delivered the store is frozen and every mutation fails
//! with [`ComputeError::MemoryIsCurrentlyImmutable`].

use crate::{ComputeError, Isolation, Value};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

// =============================================================================
// REDUCTIONS
// =============================================================================

/// A pending write and the way it combines with others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reduction {
    Set(Value),
    Incr(i64),
    And(bool),
    Or(bool),
}

impl Reduction {
    fn name(&self) -> &'static str {
        match self {
            Reduction::Set(_) => "set",
            Reduction::Incr(_) => "incr",
            Reduction::And(_) => "and",
            Reduction::Or(_) => "or",
        }
    }

    fn incompatible(key: &str, operation: &str) -> ComputeError {
        ComputeError::IncompatibleMemoryReduction {
            key: key.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Fold a later write into this one.
    ///
    /// The same rule applies within a worker and across partitions, so the
    /// outcome never depends on how vertices were partitioned. Mixing
    /// reductions on one key within a superstep fails; of two `set`s the
    /// later one (higher vertex id) wins.
    fn combine(self, next: Reduction, key: &str) -> Result<Reduction, ComputeError> {
        match (self, next) {
            (Reduction::Set(_), Reduction::Set(v)) => Ok(Reduction::Set(v)),
            (Reduction::Incr(a), Reduction::Incr(b)) => Ok(Reduction::Incr(a.saturating_add(b))),
            (Reduction::And(a), Reduction::And(b)) => Ok(Reduction::And(a && b)),
            (Reduction::Or(a), Reduction::Or(b)) => Ok(Reduction::Or(a || b)),
            (_, next) => Err(Self::incompatible(key, next.name())),
        }
    }

    /// Resolve against the committed value.
    fn apply(self, current: Option<&Value>, key: &str) -> Result<Value, ComputeError> {
        match (self, current) {
            (Reduction::Set(v), _) => Ok(v),
            (Reduction::Incr(d), None) => Ok(Value::Long(d)),
            (Reduction::Incr(d), Some(Value::Long(n))) => Ok(Value::Long(n.saturating_add(d))),
            (Reduction::And(b), None) => Ok(Value::Bool(b)),
            (Reduction::And(b), Some(Value::Bool(c))) => Ok(Value::Bool(*c && b)),
            (Reduction::Or(b), None) => Ok(Value::Bool(b)),
            (Reduction::Or(b), Some(Value::Bool(c))) => Ok(Value::Bool(*c || b)),
            (r, Some(_)) => Err(Self::incompatible(key, r.name())),
        }
    }
}

/// Writes collected by one worker partition during a superstep.
#[derive(Debug, Default)]
pub(crate) struct MemoryBuffer {
    contributions: BTreeMap<String, Reduction>,
}

impl MemoryBuffer {
    fn push(&mut self, key: &str, reduction: Reduction) -> Result<(), ComputeError> {
        let folded = match self.contributions.get(key) {
            Some(previous) => previous.clone().combine(reduction, key)?,
            None => reduction,
        };
        self.contributions.insert(key.to_string(), folded);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<&Reduction> {
        self.contributions.get(key)
    }
}

// =============================================================================
// MEMORY
// =============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    values: BTreeMap<String, Value>,
    iteration: u64,
    runtime: Duration,
    frozen: bool,
}

/// The shared aggregate store of one computation.
#[derive(Debug)]
pub struct Memory {
    compute_keys: BTreeSet<String>,
    map_reduce_keys: BTreeSet<String>,
    isolation: Isolation,
    state: RwLock<MemoryState>,
}

impl Memory {
    /// Create a running memory. Fails on an empty declared key.
    pub(crate) fn new(
        compute_keys: BTreeSet<String>,
        map_reduce_keys: BTreeSet<String>,
        isolation: Isolation,
    ) -> Result<Self, ComputeError> {
        if compute_keys
            .iter()
            .chain(map_reduce_keys.iter())
            .any(String::is_empty)
        {
            return Err(ComputeError::MemoryKeyCanNotBeEmpty);
        }
        Ok(Self {
            compute_keys,
            map_reduce_keys,
            isolation,
            state: RwLock::new(MemoryState::default()),
        })
    }

    /// Rebuild a frozen memory from previously captured values.
    pub(crate) fn frozen(
        values: BTreeMap<String, Value>,
        iteration: u64,
        runtime: Duration,
    ) -> Self {
        Self {
            compute_keys: BTreeSet::new(),
            map_reduce_keys: BTreeSet::new(),
            isolation: Isolation::Bsp,
            state: RwLock::new(MemoryState {
                values,
                iteration,
                runtime,
                frozen: true,
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Read a value. Fails if the key was never written.
    pub fn get(&self, key: &str) -> Result<Value, ComputeError> {
        self.state
            .read()
            .values
            .get(key)
            .cloned()
            .ok_or_else(|| ComputeError::MemoryDoesNotExist(key.to_string()))
    }

    /// Check whether a key currently holds a value.
    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.state.read().values.contains_key(key)
    }

    /// Keys currently holding a value.
    #[must_use]
    pub fn keys(&self) -> BTreeSet<String> {
        self.state.read().values.keys().cloned().collect()
    }

    /// Snapshot of every key and value.
    #[must_use]
    pub fn as_map(&self) -> BTreeMap<String, Value> {
        self.state.read().values.clone()
    }

    /// Index of the current superstep (0 for the first).
    #[must_use]
    pub fn iteration(&self) -> u64 {
        self.state.read().iteration
    }

    /// True iff the current superstep is the first one.
    #[must_use]
    pub fn is_initial_iteration(&self) -> bool {
        self.iteration() == 0
    }

    /// Wall-clock time the computation has run so far (final once frozen).
    #[must_use]
    pub fn runtime(&self) -> Duration {
        self.state.read().runtime
    }

    /// Whether the memory has been frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.state.read().frozen
    }

    /// Isolation level the memory was created with.
    #[must_use]
    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    // -------------------------------------------------------------------------
    // Writes (master phase)
    // -------------------------------------------------------------------------

    /// Replace the value of a key.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), ComputeError> {
        let value = value.into();
        if value.is_null() {
            return Err(ComputeError::MemoryValueCanNotBeNull);
        }
        self.write(key, Reduction::Set(value))
    }

    /// Add `delta` to a long value (a missing key starts at 0).
    pub fn incr(&self, key: &str, delta: i64) -> Result<(), ComputeError> {
        self.write(key, Reduction::Incr(delta))
    }

    /// Logical AND into a boolean value (a missing key takes `value`).
    pub fn and(&self, key: &str, value: bool) -> Result<(), ComputeError> {
        self.write(key, Reduction::And(value))
    }

    /// Logical OR into a boolean value (a missing key takes `value`).
    pub fn or(&self, key: &str, value: bool) -> Result<(), ComputeError> {
        self.write(key, Reduction::Or(value))
    }

    fn write(&self, key: &str, reduction: Reduction) -> Result<(), ComputeError> {
        let mut state = self.state.write();
        self.check_write(&state, key)?;
        let next = reduction.apply(state.values.get(key), key)?;
        state.values.insert(key.to_string(), next);
        Ok(())
    }

    fn check_write(&self, state: &MemoryState, key: &str) -> Result<(), ComputeError> {
        if state.frozen {
            return Err(ComputeError::MemoryIsCurrentlyImmutable);
        }
        if key.is_empty() {
            return Err(ComputeError::MemoryKeyCanNotBeEmpty);
        }
        if !self.compute_keys.contains(key) {
            return Err(ComputeError::ProvidedKeyIsNotAMemoryComputeKey(
                key.to_string(),
            ));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Engine hooks
    // -------------------------------------------------------------------------

    /// Commit the buffers of all partitions, in partition order.
    ///
    /// Either every key is committed or none is.
    pub(crate) fn apply_barrier(&self, buffers: Vec<MemoryBuffer>) -> Result<(), ComputeError> {
        let mut merged: BTreeMap<String, Reduction> = BTreeMap::new();
        for buffer in buffers {
            for (key, reduction) in buffer.contributions {
                let next = match merged.remove(&key) {
                    Some(previous) => previous.combine(reduction, &key)?,
                    None => reduction,
                };
                merged.insert(key, next);
            }
        }

        let mut state = self.state.write();
        let mut committed = Vec::with_capacity(merged.len());
        for (key, reduction) in merged {
            let value = reduction.apply(state.values.get(&key), &key)?;
            committed.push((key, value));
        }
        state.values.extend(committed);
        Ok(())
    }

    pub(crate) fn advance_iteration(&self) {
        let mut state = self.state.write();
        state.iteration = state.iteration.saturating_add(1);
    }

    pub(crate) fn set_runtime(&self, runtime: Duration) {
        self.state.write().runtime = runtime;
    }

    /// Store the result of a map-reduce job under its own key.
    pub(crate) fn finalize_map_reduce(&self, key: &str, value: Value) -> Result<(), ComputeError> {
        let mut state = self.state.write();
        if state.frozen {
            return Err(ComputeError::MemoryIsCurrentlyImmutable);
        }
        if !self.map_reduce_keys.contains(key) {
            return Err(ComputeError::ProvidedKeyIsNotAMemoryComputeKey(
                key.to_string(),
            ));
        }
        state.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Freeze the memory. Subsequent writes fail.
    pub(crate) fn freeze(&self, runtime: Duration) {
        let mut state = self.state.write();
        state.runtime = runtime;
        state.frozen = true;
    }
}

// =============================================================================
// WORKER MEMORY
// =============================================================================

/// The memory view of one worker partition during a superstep.
///
/// Under [`Isolation::Bsp`] reads always return the value committed at the
/// last barrier. Under [`Isolation::DirtyBsp`] a worker also observes its own
/// pending writes; other partitions' writes stay invisible until the barrier.
#[derive(Debug)]
pub struct WorkerMemory<'a> {
    memory: &'a Memory,
    buffer: MemoryBuffer,
}

impl<'a> WorkerMemory<'a> {
    pub(crate) fn new(memory: &'a Memory) -> Self {
        Self {
            memory,
            buffer: MemoryBuffer::default(),
        }
    }

    pub(crate) fn into_buffer(self) -> MemoryBuffer {
        self.buffer
    }

    pub fn get(&self, key: &str) -> Result<Value, ComputeError> {
        if self.memory.isolation == Isolation::DirtyBsp
            && let Some(pending) = self.buffer.get(key)
        {
            let committed = self.memory.get(key).ok();
            return pending.clone().apply(committed.as_ref(), key);
        }
        self.memory.get(key)
    }

    #[must_use]
    pub fn keys(&self) -> BTreeSet<String> {
        self.memory.keys()
    }

    #[must_use]
    pub fn iteration(&self) -> u64 {
        self.memory.iteration()
    }

    #[must_use]
    pub fn is_initial_iteration(&self) -> bool {
        self.memory.is_initial_iteration()
    }

    #[must_use]
    pub fn runtime(&self) -> Duration {
        self.memory.runtime()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ComputeError> {
        let value = value.into();
        if value.is_null() {
            return Err(ComputeError::MemoryValueCanNotBeNull);
        }
        self.push(key, Reduction::Set(value))
    }

    pub fn incr(&mut self, key: &str, delta: i64) -> Result<(), ComputeError> {
        self.push(key, Reduction::Incr(delta))
    }

    pub fn and(&mut self, key: &str, value: bool) -> Result<(), ComputeError> {
        self.push(key, Reduction::And(value))
    }

    pub fn or(&mut self, key: &str, value: bool) -> Result<(), ComputeError> {
        self.push(key, Reduction::Or(value))
    }

    fn push(&mut self, key: &str, reduction: Reduction) -> Result<(), ComputeError> {
        {
            let state = self.memory.state.read();
            self.memory.check_write(&state, key)?;
        }
        self.buffer.push(key, reduction)
    }
}

// =============================================================================
// TESTS
// =============================================================================
