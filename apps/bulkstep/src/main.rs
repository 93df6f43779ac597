//! # bulkstep - Graph Computer
//!
//! The command-line binary for the bulkstep computation engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              apps/bulkstep (THE BINARY)              │
//! │                                                      │
//! │   ┌─────────────┐            ┌──────────────────┐    │
//! │   │    CLI      │───────────▶│  config (TOML)   │    │
//! │   │   (clap)    │            └──────────────────┘    │
//! │   └──────┬──────┘                                    │
//! │          ▼                                           │
//! │   ┌───────────────┐                                  │
//! │   │ bulkstep-core │                                  │
//! │   │  (THE LOGIC)  │                                  │
//! │   └───────────────┘                                  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Connected components of the built-in graph
//! bulkstep run
//!
//! # Sum a property over a graph file, with a configured computer
//! bulkstep run -g graph.json -a property-sum -p age -c computer.toml
//!
//! # Keep the final memory and read it back later
//! bulkstep run -s result.bstp
//! bulkstep inspect -i result.bstp
//! ```

use bulkstep::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // BULKSTEP_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("BULKSTEP_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bulkstep=info,bulkstep_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!(kind = ?e.kind(), "Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  bulkstep v{}
  vertex programs in synchronized supersteps
"#,
        env!("CARGO_PKG_VERSION")
    );
}
