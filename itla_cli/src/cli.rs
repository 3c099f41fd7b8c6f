//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "itla", version, about = "Pure Photonics ITLA tunable laser control")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/itla.toml")]
    pub config: PathBuf,

    /// Drive the in-memory simulated module instead of a serial port
    #[arg(long, action = ArgAction::SetTrue)]
    pub sim: bool,

    /// Print results as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read power, frequency and sweep offset once
    Status,
    /// Read the manufacturer, model and serial identity strings
    Id,
    /// Turn the laser on at the given frequency (THz)
    On {
        #[arg(value_name = "THZ")]
        freq: f64,
    },
    /// Turn the laser off
    Off,
    /// Clean-jump to the given frequency (THz)
    Jump {
        #[arg(value_name = "THZ")]
        freq: f64,
    },
    /// Clean-sweep control
    Sweep {
        #[command(subcommand)]
        cmd: SweepCommands,
    },
    /// Poll and print status continuously until interrupted
    Monitor,
    /// Print the register map
    Regs,
}

#[derive(Subcommand, Debug)]
pub enum SweepCommands {
    /// Write amplitude/speed and start sweeping
    Start {
        /// Sweep amplitude in GHz (defaults to config)
        #[arg(long)]
        amplitude: Option<u16>,
        /// Sweep speed in MHz/s (defaults to config)
        #[arg(long)]
        speed: Option<u16>,
    },
    /// Pause at an offset in GHz; extrapolates a stop point when omitted
    Pause {
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<f64>,
    },
    /// Stop sweeping and leave clean mode
    Stop,
    /// Start sweeping, then pause at the given offset (GHz)
    To {
        #[arg(allow_hyphen_values = true)]
        offset: f64,
    },
}
