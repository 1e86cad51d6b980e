//! Logging configuration and initialization

use crate::app::config::AppConfig;
use crate::cli::Commands;
use tracing::{debug, trace};

/// Env filter directive for the configured verbosity
///
/// Only this crate follows `-v`; dependencies stay at `warn`.
pub fn filter_directive(config: &AppConfig) -> String {
    format!("warn,tabclean={}", config.log_level())
}

/// Initialize tracing for the application
///
/// Log output goes to stderr so reports on stdout stay clean.
pub fn init_logging(config: &AppConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(filter_directive(config))
        .with_writer(std::io::stderr)
        .with_target(config.verbose >= 2)
        .with_thread_ids(config.verbose >= 3)
        .with_line_number(config.verbose >= 3)
        .init();

    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}

/// Record which command is about to run and the files it reads
pub fn log_command(command: &Commands) {
    match command {
        Commands::Run { config, input, .. } => {
            let source = config
                .as_deref()
                .map_or_else(|| "built-in employee pipeline".to_string(), |p| p.display().to_string());
            match input {
                Some(input) => debug!("run: {} on {}", source, input.display()),
                None => debug!("run: {}", source),
            }
        }
        Commands::Inspect { input, .. } => debug!("inspect: {}", input.display()),
        Commands::Validate { config } => debug!("validate: {}", config.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_scopes_verbosity_to_crate() {
        assert_eq!(filter_directive(&AppConfig::new(0)), "warn,tabclean=info");
        assert_eq!(filter_directive(&AppConfig::new(1)), "warn,tabclean=debug");
        assert_eq!(filter_directive(&AppConfig::new(3)), "warn,tabclean=trace");
    }
}
