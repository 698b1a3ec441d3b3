//! Command line arguments for the textq interpreter

pub mod memory_parser;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::debug;
use std::path::PathBuf;

use crate::queue::AllocatorPreset;

/// Linked text queue command interpreter
#[derive(Parser, Debug, Default)]
#[command(name = "textq")]
#[command(about = "Drive a linked text queue from a command script, with allocation fault injection")]
#[command(version)]
pub struct Args {
    /// Command script to execute (reads standard input when omitted)
    pub script: Option<PathBuf>,

    /// Verbose output (debug level logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log file path for file output
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL")]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION")]
    pub config_name: Option<String>,

    /// Use an allocator configuration preset
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Percentage of allocations to refuse (0-100)
    #[arg(long, value_name = "PCT", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub fail_percent: Option<u8>,

    /// Allocator byte budget, e.g. 4096, 64K, 1MB
    #[arg(long, value_name = "SIZE")]
    pub memory_limit: Option<String>,

    /// Seed for the allocation failure generator
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Echo each command before running it
    #[arg(long)]
    pub echo: bool,

    /// Stop after this many errors
    #[arg(long, value_name = "COUNT")]
    pub error_limit: Option<usize>,
}

/// Allocator preset command line argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    /// Never refuses, only counts
    Unlimited,
    /// Small byte budget
    Constrained,
    /// Refuses a share of requests at random
    FaultInjecting,
}

impl From<PresetArg> for AllocatorPreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Unlimited => AllocatorPreset::Unlimited,
            PresetArg::Constrained => AllocatorPreset::Constrained,
            PresetArg::FaultInjecting => AllocatorPreset::FaultInjecting,
        }
    }
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();

    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }

    match args.log_format.to_lowercase().as_str() {
        "text" | "json" => {}
        _ => {
            return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Valid options: text, json",
                args.log_format
            ))
        }
    }

    if let Some(ref level) = args.log_file_level {
        match level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid log file level '{}'. Valid levels: error, warn, info, debug, trace",
                    level
                ))
            }
        }
    }

    if args.log_file_level.is_some() && args.log_file.is_none() {
        return Err(anyhow::anyhow!("--log-file-level requires --log-file to be specified"));
    }

    if let Some(ref limit) = args.memory_limit {
        memory_parser::parse_memory_size(limit)?;
    }

    if args.error_limit == Some(0) {
        return Err(anyhow::anyhow!("--error-limit must be at least 1"));
    }

    debug!("CLI arguments validated successfully");
    Ok(())
}
