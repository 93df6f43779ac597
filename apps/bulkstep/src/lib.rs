//! # bulkstep
//!
//! Command-line front end for the bulkstep graph computer.
//!
//! - `cli`: argument parsing and command implementations
//! - `config`: TOML computer configuration and flag overrides

pub mod cli;
pub mod config;
