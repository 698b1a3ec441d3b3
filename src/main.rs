use anyhow::Result;
use log::error;
use std::process;

use textq::interpreter::Summary;
use textq::{app, cli, logging};

fn main() {
    // Set up panic handler with better error reporting
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Application panicked: {:?}", panic_info);
        eprintln!("Panic: {:?}", panic_info);
        process::exit(101);
    }));

    match run() {
        Ok(summary) if summary.succeeded() => {}
        Ok(summary) => {
            error!(
                "Script reported {} errors ({} allocation failures, {} leaked blocks)",
                summary.errors, summary.allocation_failures, summary.leaked_blocks
            );
            process::exit(1);
        }
        Err(e) => {
            error!("Application error: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run() -> Result<Summary> {
    let args = cli::parse_args();

    cli::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;

    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;

    app::run_script(&args, &config_manager)
}
