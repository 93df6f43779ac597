//! # bulkstep CLI Module
//!
//! This module implements the CLI interface for bulkstep.
//!
//! ## Available Commands
//!
//! - `run` - Run a bundled algorithm over a graph
//! - `inspect` - Print the memory stored in a snapshot file
//! - `fixture` - Print the built-in "modern" graph as JSON

mod commands;

use bulkstep_core::ComputeError;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// bulkstep - vertex-centric graph computer
///
/// Runs vertex programs in synchronized supersteps and summarizes the
/// result with map-reduce jobs.
#[derive(Parser, Debug)]
#[command(name = "bulkstep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a bundled algorithm
    Run {
        /// Graph file (JSON). Defaults to the built-in "modern" graph
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Algorithm (connected-components, property-sum)
        #[arg(short, long, default_value = "connected-components")]
        algorithm: String,

        /// Property summed by property-sum
        #[arg(short, long, default_value = "age")]
        property: String,

        /// Graph computer implementation
        #[arg(long)]
        computer: Option<String>,

        /// Isolation level (bsp, dirty_bsp)
        #[arg(short, long)]
        isolation: Option<String>,

        /// Computer configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of workers (overrides the configuration)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Superstep limit (overrides the configuration)
        #[arg(long)]
        max_supersteps: Option<u64>,

        /// Write the final memory to this snapshot file
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Give up after this many milliseconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Print the memory stored in a snapshot file
    Inspect {
        /// Snapshot file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the built-in "modern" graph as JSON
    Fixture {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ComputeError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Run {
            graph,
            algorithm,
            property,
            computer,
            isolation,
            config,
            workers,
            max_supersteps,
            snapshot,
            timeout,
        }) => {
            let args = RunArgs {
                graph,
                algorithm,
                property,
                computer,
                isolation,
                config,
                workers,
                max_supersteps,
                snapshot,
                timeout_ms: timeout,
            };
            cmd_run(args, json_mode, cli.verbose).await
        }
        Some(Commands::Inspect { input }) => cmd_inspect(&input, json_mode),
        Some(Commands::Fixture { output }) => cmd_fixture(output.as_deref()),
        None => {
            // No subcommand - run the default algorithm on the built-in graph
            cmd_run(RunArgs::default(), json_mode, cli.verbose).await
        }
    }
}
