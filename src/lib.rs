//! # tabclean
//!
//! Load a delimited table, clean it, derive new columns and produce grouped
//! summaries, then hand the results to chart and statistics collaborators.
//!
//! ## Usage
//!
//! ```bash
//! tabclean run --input employees.csv [--config pipeline.yml] [--output-dir out]
//! tabclean inspect employees.csv
//! tabclean validate pipeline.yml
//! ```
//!
//! ## Modules
//!
//! - `table` - Typed values, schemas and immutable tables
//! - `loader` - Delimited file loading with per-column type inference
//! - `pipeline` - Clean, derive and aggregate stages and their rules
//! - `config` - YAML/TOML pipeline descriptions and the built-in employee preset
//! - `collab` - Chart specs with a Vega-Lite renderer and the statistics model seam
//! - `report` - Plain-text rendering, column summaries and CSV/JSON export
//! - `error` - Error types, error codes and stage tagging
//! - `app` - Logging and fatal error handling for the binary
//! - `cli` - Command-line arguments and command handlers
pub mod app;
pub mod cli;
pub mod collab;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod report;
pub mod table;
