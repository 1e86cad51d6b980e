//! Command routing and execution

use crate::app::AppConfig;
use crate::cli::args::Commands;
use crate::cli::commands::{
    run_inspect_command, run_pipeline_command, run_validate_command, RunOptions,
};
use crate::error::AppResult;

/// Execute a CLI command based on the parsed arguments
pub fn execute_command(command: Commands, verbose: u8) -> AppResult<()> {
    match command {
        Commands::Run {
            config,
            input,
            reference_date,
            output_dir,
            format,
        } => {
            let app = AppConfig::new(verbose)
                .with_output_dir(output_dir)
                .with_format(format);
            run_pipeline_command(
                RunOptions {
                    config,
                    input,
                    reference_date,
                },
                &app,
            )
        }
        Commands::Inspect { input, delimiter } => run_inspect_command(&input, delimiter),
        Commands::Validate { config } => run_validate_command(&config),
    }
}
