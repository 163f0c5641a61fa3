use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "MPM3D Developers",
    version,
    about = "MPM3D CLI - Runs an explicit 3D Material Point Method simulation of a weakly-compressible fluid and exports particle positions per frame.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulation and write one particle snapshot per frame.
    Run(RunArgs),
    /// Inspect simulation configuration.
    Config(ConfigArgs),
}

/// On-disk encoding of exported frames.
#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FrameFormatArg {
    #[default]
    Csv,
    Ply,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    // --- Core Arguments ---
    /// Path to a configuration file in TOML format. Built-in defaults are used for every
    /// value it does not set.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory that receives one file per frame.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Encoding of the frame files.
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub format: Option<FrameFormatArg>,

    /// Simulate without writing any frame files.
    #[arg(long)]
    pub no_output: bool,

    /// Write a TOML run summary (timings and final diagnostics) to this path.
    #[arg(long, value_name = "PATH")]
    pub summary: Option<PathBuf>,

    // --- Simulation Overrides ---
    /// Override the number of frames to simulate.
    #[arg(short = 'f', long, value_name = "INT")]
    pub frames: Option<usize>,

    /// Override the number of substeps per frame.
    #[arg(long, value_name = "INT")]
    pub substeps: Option<usize>,

    /// Override the grid resolution (nodes per axis, a power of two).
    #[arg(short = 'n', long, value_name = "INT")]
    pub resolution: Option<usize>,

    /// Override the number of particles.
    #[arg(short = 'p', long, value_name = "INT")]
    pub particles: Option<usize>,

    /// Override the time step.
    #[arg(long, value_name = "FLOAT")]
    pub dt: Option<f32>,

    /// Override the seed used to sample initial positions.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S material.stiffness=500
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `config` subcommand.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the built-in default configuration as TOML.
    ShowDefaults,
    /// Resolve a configuration (file, -S values) and print the effective values.
    Check {
        /// Path to the configuration file to check.
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Set a specific configuration value before checking.
        #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
        set_values: Vec<String>,
    },
}
