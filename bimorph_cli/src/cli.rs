//! CLI argument definitions and shared statics.

use bimorph_core::Assignment;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config path used when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "etc/bimorph.toml";

#[derive(Parser, Debug)]
#[command(name = "bimorph", version, about = "Bimorph mirror voltage controller")]
pub struct Cli {
    /// Path to config TOML (typed); defaults to etc/bimorph.toml when present
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON, log as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive channels to target voltages on the simulated mirror
    Move {
        /// Channel assignment CH=VOLTS, e.g. `--set 12=350`; repeatable
        #[arg(long = "set", value_name = "CH=V", num_args = 1.., conflicts_with = "request")]
        set: Vec<Assignment>,
        /// Move request CSV with header `channel,target`
        #[arg(long, value_name = "FILE")]
        request: Option<PathBuf>,
        /// Start every simulated channel at this voltage (overrides [simulator].initial_voltage)
        #[arg(long, value_name = "VOLTS", allow_hyphen_values = true)]
        initial: Option<f64>,
    },
    /// Validate config and read back the simulated mirror once
    SelfCheck,
}
