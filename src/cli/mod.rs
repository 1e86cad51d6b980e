//! Command-line interface
//!
//! Argument definitions, command routing and the command implementations.

pub mod args;
pub mod commands;
pub mod router;

pub use args::{Cli, Commands};
pub use router::execute_command;
