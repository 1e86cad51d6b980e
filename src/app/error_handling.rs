//! Error handling utilities
//!
//! Centralized reporting of errors that end the process.

use crate::error::{PipelineError, StageError};
use tracing::error;

/// Handle fatal errors and exit with appropriate status code
///
/// - `StageError`: user message naming the error kind and stage
/// - `PipelineError`: user message and error code
/// - anything else: the error text, exit code 1
///
/// With `verbose >= 1` the full cause chain is printed as well.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    std::process::exit(report_error(&error, verbose))
}

/// Print the error to stderr and return the exit code to use
pub fn report_error(error: &anyhow::Error, verbose: u8) -> i32 {
    error!("Fatal error: {}", error);

    if let Some(stage_err) = error.downcast_ref::<StageError>() {
        eprintln!("Error: {}", stage_err.user_message());
        if verbose >= 1 {
            eprintln!("\nContext Chain:\n{}", stage_err.error.developer_message());
        }
        stage_err.exit_code()
    } else if let Some(pipeline_err) = error.downcast_ref::<PipelineError>() {
        eprintln!("Error: {} ({})", pipeline_err.user_message(), pipeline_err.kind());
        if verbose >= 1 {
            eprintln!("\nContext Chain:\n{}", pipeline_err.developer_message());
        }
        pipeline_err.exit_code()
    } else {
        eprintln!("Error: {error}");
        if verbose >= 1 {
            eprintln!("\nError chain:");
            for (i, cause) in error.chain().enumerate() {
                eprintln!("  {}: {}", i, cause);
            }
        }
        1
    }
}
