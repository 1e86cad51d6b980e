//! Command implementations

mod inspect;
mod run;
mod validate;

pub use inspect::run_inspect_command;
pub use run::{run_pipeline_command, RunOptions};
pub use validate::run_validate_command;
