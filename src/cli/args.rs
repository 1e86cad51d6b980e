//! CLI argument structures
//!
//! Defines the main CLI structure and all subcommand definitions.

use crate::report::ExportFormat;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Clean, derive and aggregate tabular employee data
#[derive(Parser)]
#[command(name = "tabclean")]
#[command(about = "tabclean - Clean, derive and aggregate delimited tables", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a pipeline and print its aggregate tables
    #[command(name = "run")]
    Run {
        /// Pipeline file (.yml, .yaml or .toml); the built-in employee pipeline when omitted
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Input file, overriding the one named in the pipeline file
        #[arg(short = 'i', long)]
        input: Option<PathBuf>,

        /// Date tenure is measured against (YYYY-MM-DD); defaults to today
        #[arg(long, value_name = "DATE", value_parser = parse_date)]
        reference_date: Option<NaiveDate>,

        /// Write aggregate tables and chart specs into this directory
        #[arg(short = 'o', long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Format for aggregate tables
        #[arg(short = 'f', long, value_enum, default_value_t = ExportFormat::Text)]
        format: ExportFormat,
    },

    /// Load a file and summarize its inferred schema
    #[command(name = "inspect")]
    Inspect {
        /// Delimited input file
        input: PathBuf,

        /// Field delimiter
        #[arg(short = 'd', long, default_value_t = ',')]
        delimiter: char,
    },

    /// Check a pipeline file without loading any data
    #[command(name = "validate")]
    Validate {
        /// Pipeline file (.yml, .yaml or .toml)
        config: PathBuf,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("expected a date like 2024-01-01: {}", e))
}
