use crate::error::{CliError, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::{
    Layer,
    filter::{LevelFilter, Targets},
    fmt,
    prelude::*,
    registry::LookupSpan,
};

/// Log target of the simulation library.
const ENGINE_TARGET: &str = "mpm3d";
/// Log target of this binary.
const CLI_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Level for the simulation's own events on the terminal.
///
/// * `-q`: errors only.
/// * default: stability warnings (divergence, CFL violations, collapsed volume).
/// * `-v`: run milestones.
/// * `-vv`: per-frame diagnostics and phase timings.
/// * `-vvv`: per-task spans and dropped stencil contributions.
pub fn console_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Terminal filter: the engine and the CLI follow the verbosity, other crates never go
/// past INFO.
pub fn console_targets(verbosity: u8, quiet: bool) -> Targets {
    let level = console_level(verbosity, quiet);
    Targets::new()
        .with_target(ENGINE_TARGET, level)
        .with_target(CLI_TARGET, level)
        .with_default(level.min(LevelFilter::INFO))
}

/// Log file filter. The file always keeps per-frame diagnostics so a run can be inspected
/// after the fact, independent of `-q`.
pub fn file_targets(verbosity: u8) -> Targets {
    let level = console_level(verbosity, false).max(LevelFilter::DEBUG);
    Targets::new()
        .with_target(ENGINE_TARGET, level)
        .with_target(CLI_TARGET, level)
        .with_default(LevelFilter::INFO)
}

fn console_layer<S>(verbosity: u8, quiet: bool) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(console_targets(verbosity, quiet))
}

fn file_layer<S>(file: File, verbosity: u8) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_ids(true)
        .with_target(true)
        .with_filter(file_targets(verbosity))
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let file = log_file
        .map(File::create)
        .transpose()
        .map_err(CliError::Io)?;

    tracing_subscriber::registry()
        .with(console_layer(verbosity, quiet))
        .with(file.map(|file| file_layer(file, verbosity)))
        .init();

    Ok(())
}
