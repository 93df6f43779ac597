//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::{ConfigOverrides, load_config, parse_isolation};
use bulkstep_core::formats::MAX_SNAPSHOT_PAYLOAD_SIZE;
use bulkstep_core::{
    ComputeError, ComputerHandle, ComputerResult, Graph, MapReduce, MemGraph, Memory,
    SerializableGraph, Value, VertexId, VertexProgram, algorithms, memory_from_bytes,
    memory_to_bytes, modern, open_computer,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a graph file (500 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_GRAPH_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), ComputeError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| ComputeError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(ComputeError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input path.
///
/// Canonicalizes the path (resolving symlinks and "..") and requires a
/// regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, ComputeError> {
    let canonical = path.canonicalize().map_err(|e| {
        ComputeError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(ComputeError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, ComputeError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        ComputeError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(ComputeError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| ComputeError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Everything `run` needs to set up a computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Graph file; `None` selects the built-in "modern" graph.
    pub graph: Option<PathBuf>,
    pub algorithm: String,
    pub property: String,
    pub computer: Option<String>,
    pub isolation: Option<String>,
    pub config: Option<PathBuf>,
    pub workers: Option<usize>,
    pub max_supersteps: Option<u64>,
    pub snapshot: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            graph: None,
            algorithm: "connected-components".to_string(),
            property: "age".to_string(),
            computer: None,
            isolation: None,
            config: None,
            workers: None,
            max_supersteps: None,
            snapshot: None,
            timeout_ms: None,
        }
    }
}

/// What a finished `run` produced.
#[derive(Debug)]
pub struct RunReport {
    /// The computer's description, captured before submission.
    pub computer: String,
    pub memory: Memory,
    /// Element compute keys of every vertex, when a program ran.
    pub vertices: BTreeMap<VertexId, BTreeMap<String, Vec<Value>>>,
    /// Snapshot path and size in bytes, when one was written.
    pub snapshot: Option<(PathBuf, usize)>,
}

/// Run a bundled algorithm and print the result.
pub async fn cmd_run(args: RunArgs, json_mode: bool, verbose: bool) -> Result<(), ComputeError> {
    let report = run_computation(args).await?;

    if json_mode {
        let vertices: serde_json::Map<String, serde_json::Value> = report
            .vertices
            .iter()
            .map(|(id, properties)| {
                let properties: serde_json::Map<String, serde_json::Value> = properties
                    .iter()
                    .map(|(key, values)| {
                        let values = values.iter().map(value_to_json).collect();
                        (key.clone(), serde_json::Value::Array(values))
                    })
                    .collect();
                (id.0.to_string(), serde_json::Value::Object(properties))
            })
            .collect();
        let output = serde_json::json!({
            "computer": report.computer,
            "iteration": report.memory.iteration(),
            "runtime_ms": report.memory.runtime().as_millis() as u64,
            "memory": memory_to_json(&report.memory),
            "vertices": vertices,
            "snapshot": report.snapshot.as_ref().map(|(path, size)| serde_json::json!({
                "path": path.to_string_lossy(),
                "bytes": size
            }))
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Computation Result");
    println!("==================");
    println!("Computer:  {}", report.computer);
    print_memory(&report.memory);

    if verbose && !report.vertices.is_empty() {
        println!();
        println!("Vertices:");
        for (id, properties) in &report.vertices {
            let rendered: Vec<String> = properties
                .iter()
                .map(|(key, values)| format!("{}={}", key, Value::List(values.clone())))
                .collect();
            println!("  {} {}", id, rendered.join(" "));
        }
    }

    if let Some((path, size)) = &report.snapshot {
        println!();
        println!("Wrote snapshot ({} bytes) to {:?}", size, path);
    }

    Ok(())
}

/// Set up, submit and await one computation.
pub async fn run_computation(args: RunArgs) -> Result<RunReport, ComputeError> {
    let overrides = ConfigOverrides {
        workers: args.workers,
        max_supersteps: args.max_supersteps,
    };
    let config = overrides.apply(load_config(args.config.as_deref())?);
    let graph: Arc<dyn Graph> = Arc::new(load_graph(args.graph.as_deref())?);
    let (program, jobs) = select_algorithm(&args.algorithm, &args.property)?;
    let element_keys: Vec<String> = program
        .as_ref()
        .map(|p| p.element_compute_keys.iter().cloned().collect())
        .unwrap_or_default();

    let requested: Vec<&str> = args.computer.iter().map(String::as_str).collect();
    let mut computer = open_computer(Arc::clone(&graph), &requested, config)?;
    if let Some(level) = args.isolation.as_deref() {
        computer.isolation(parse_isolation(level)?)?;
    }
    if let Some(program) = program {
        computer.program(program)?;
    }
    for job in jobs {
        computer.map_reduce(job)?;
    }

    let description = computer.to_string();
    tracing::info!(computer = %description, algorithm = %args.algorithm, "Starting computation");
    let handle = computer.submit()?;
    let (graph, memory) = wait_for(handle, args.timeout_ms).await?.into_parts();

    let mut vertices = BTreeMap::new();
    if !element_keys.is_empty() {
        for id in graph.vertex_ids() {
            let mut properties = BTreeMap::new();
            for key in &element_keys {
                properties.insert(key.clone(), graph.properties(id, key)?);
            }
            vertices.insert(id, properties);
        }
    }

    let snapshot = match args.snapshot.as_deref() {
        Some(path) => Some(write_snapshot(&memory, path)?),
        None => None,
    };

    Ok(RunReport {
        computer: description,
        memory,
        vertices,
        snapshot,
    })
}

/// Join the computation on a blocking thread, bounded by `timeout_ms`.
async fn wait_for(
    handle: ComputerHandle,
    timeout_ms: Option<u64>,
) -> Result<ComputerResult, ComputeError> {
    let join = tokio::task::spawn_blocking(move || handle.join());
    let joined = match timeout_ms {
        Some(ms) => tokio::time::timeout(Duration::from_millis(ms), join)
            .await
            .map_err(|_| ComputeError::Timeout(ms))?,
        None => join.await,
    };
    joined.map_err(|e| ComputeError::ComputationPanicked(e.to_string()))?
}

/// Map an algorithm name to its vertex program and map-reduce jobs.
pub fn select_algorithm(
    name: &str,
    property: &str,
) -> Result<(Option<VertexProgram>, Vec<MapReduce>), ComputeError> {
    match name {
        "connected-components" => Ok((
            Some(algorithms::connected_components()),
            vec![algorithms::component_sizes()],
        )),
        "property-sum" => Ok((
            None,
            vec![algorithms::property_sum(property, &format!("{}Sum", property))],
        )),
        _ => Err(ComputeError::InvalidConfiguration(format!(
            "Unknown algorithm: {}. Use: connected-components, property-sum",
            name
        ))),
    }
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Print the memory stored in a snapshot file.
pub fn cmd_inspect(input: &Path, json_mode: bool) -> Result<(), ComputeError> {
    let memory = read_snapshot(input)?;

    if json_mode {
        let output = serde_json::json!({
            "iteration": memory.iteration(),
            "runtime_ms": memory.runtime().as_millis() as u64,
            "memory": memory_to_json(&memory)
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Memory Snapshot");
    println!("===============");
    println!("File:      {:?}", input);
    print_memory(&memory);

    Ok(())
}

// =============================================================================
// FIXTURE COMMAND
// =============================================================================

/// Print the built-in "modern" graph in the graph file format.
pub fn cmd_fixture(output: Option<&Path>) -> Result<(), ComputeError> {
    let serializable = SerializableGraph::from(&modern());
    let data = serde_json::to_string_pretty(&serializable)
        .map_err(|e| ComputeError::SerializationError(e.to_string()))?;

    match output {
        Some(path) => {
            let validated = validate_output_path(path)?;
            std::fs::write(&validated, &data)
                .map_err(|e| ComputeError::IoError(format!("Write file: {}", e)))?;
            println!("Wrote {} bytes to {:?}", data.len(), validated);
        }
        None => println!("{}", data),
    }

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load a graph file (JSON), or the built-in "modern" graph.
pub fn load_graph(path: Option<&Path>) -> Result<MemGraph, ComputeError> {
    let Some(path) = path else {
        return Ok(modern());
    };

    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_GRAPH_FILE_SIZE)?;

    let data = std::fs::read(&validated)
        .map_err(|e| ComputeError::IoError(format!("Read file: {}", e)))?;
    let serializable: SerializableGraph = serde_json::from_slice(&data)
        .map_err(|e| ComputeError::SerializationError(format!("Invalid graph file: {}", e)))?;
    let graph = MemGraph::try_from(serializable)?;

    tracing::debug!(
        path = %validated.display(),
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "Loaded graph"
    );
    Ok(graph)
}

/// Write `memory` as a snapshot file. Returns the written path and size.
pub fn write_snapshot(memory: &Memory, path: &Path) -> Result<(PathBuf, usize), ComputeError> {
    let validated = validate_output_path(path)?;
    let data = memory_to_bytes(memory)?;
    std::fs::write(&validated, &data)
        .map_err(|e| ComputeError::IoError(format!("Write snapshot: {}", e)))?;
    tracing::info!(path = %validated.display(), bytes = data.len(), "Snapshot written");
    Ok((validated, data.len()))
}

/// Read a snapshot file. The returned memory is frozen.
pub fn read_snapshot(path: &Path) -> Result<Memory, ComputeError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_SNAPSHOT_PAYLOAD_SIZE as u64)?;
    let data = std::fs::read(&validated)
        .map_err(|e| ComputeError::IoError(format!("Read snapshot: {}", e)))?;
    memory_from_bytes(&data)
}

/// Convert a value to plain JSON: longs as numbers, lists as arrays.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Long(n) => serde_json::Value::from(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
    }
}

fn memory_to_json(memory: &Memory) -> serde_json::Value {
    let entries: serde_json::Map<String, serde_json::Value> = memory
        .as_map()
        .iter()
        .map(|(key, value)| (key.clone(), value_to_json(value)))
        .collect();
    serde_json::Value::Object(entries)
}

fn print_memory(memory: &Memory) {
    println!("Iteration: {}", memory.iteration());
    println!("Runtime:   {} ms", memory.runtime().as_millis());
    println!();
    println!("Memory:");
    let entries = memory.as_map();
    if entries.is_empty() {
        println!("  (empty)");
    }
    for (key, value) in &entries {
        println!("  {} = {}", key, value);
    }
}
