//! Script execution

use std::fs::File;
use std::io::{self, BufReader};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::cli::{self, memory_parser};
use crate::config::ConfigManager;
use crate::interpreter::{Interpreter, Options, Summary};
use crate::queue::{AllocatorConfig, AllocatorPreset};

/// Allocator settings: config file, then a command line preset, then explicit flags
pub fn build_allocator_config(args: &cli::Args, config: &ConfigManager) -> Result<AllocatorConfig> {
    let mut allocator = config.get_allocator_config()?;

    if let Some(preset) = args.preset {
        debug!("Applying allocator preset: {:?}", preset);
        allocator = AllocatorPreset::from(preset).config();
    }

    if let Some(limit) = &args.memory_limit {
        allocator.memory_limit = Some(memory_parser::parse_memory_size(limit)?);
    }

    if let Some(percent) = args.fail_percent {
        allocator.fail_percent = percent;
    }

    if let Some(seed) = args.seed {
        allocator.seed = seed;
    }

    debug!("Allocator configuration: {:?}", allocator);
    Ok(allocator)
}

/// Interpreter options: config file, overridden by command line flags
pub fn build_interpreter_options(args: &cli::Args, config: &ConfigManager) -> Result<Options> {
    let mut options = config.get_interpreter_options()?;

    if args.echo {
        options.echo = true;
    }

    if let Some(limit) = args.error_limit {
        options.error_limit = limit;
    }

    Ok(options)
}

/// Run the script named on the command line, or standard input
pub fn run_script(args: &cli::Args, config: &ConfigManager) -> Result<Summary> {
    let allocator = Arc::new(build_allocator_config(args, config)?.build());
    let options = build_interpreter_options(args, config)?;

    let stdout = io::stdout();
    let mut interpreter = Interpreter::new(options, allocator, stdout.lock());

    let summary = match &args.script {
        Some(path) => {
            info!("Running script: {}", path.display());
            let file = File::open(path)
                .with_context(|| format!("Failed to open script: {}", path.display()))?;
            interpreter.run(BufReader::new(file))?
        }
        None => {
            info!("Reading commands from standard input");
            interpreter.run(io::stdin().lock())?
        }
    };

    Ok(summary)
}
