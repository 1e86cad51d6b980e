use clap::Parser;
use tabclean::app::{handle_fatal_error, init_logging, log_command, AppConfig};
use tabclean::cli::{execute_command, Cli};
use tracing::debug;

fn main() {
    let cli = Cli::parse();
    init_logging(&AppConfig::new(cli.verbose));
    log_command(&cli.command);

    if let Err(e) = execute_command(cli.command, cli.verbose) {
        handle_fatal_error(e, cli.verbose);
    }
    debug!("tabclean finished");
}
