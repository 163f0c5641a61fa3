use crate::cli::{FrameFormatArg, RunArgs};
use crate::config::builder::build_config;
use crate::config::models::AppConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::FrameProgress;
use mpm3d::core::io::csv::CsvFrameWriter;
use mpm3d::core::io::ply::PlyFrameWriter;
use mpm3d::core::io::traits::{FrameSink, NullSink};
use mpm3d::engine::progress::ProgressReporter;
use mpm3d::workflows::simulate::{self, SimulationSummary};
use std::path::Path;
use tracing::{info, warn};

pub fn run(args: RunArgs, show_progress: bool) -> Result<()> {
    info!("Merging configuration from defaults, file and CLI arguments...");
    let app_config = build_config(&args)?;
    let config = &app_config.core_config;

    println!(
        "Simulating {} particles on a {}³ grid: {} frames x {} substeps (dt = {:e}).",
        config.particle_count(),
        config.grid.resolution,
        config.time.frames,
        config.time.substeps_per_frame,
        config.time.dt
    );

    let progress = show_progress.then(|| FrameProgress::new(config));
    let reporter = match &progress {
        Some(progress) => ProgressReporter::with_callback(progress.callback()),
        None => ProgressReporter::new(),
    };

    let summary = simulate_with_output(&app_config, &reporter)?;
    drop(reporter);

    if let Some(progress) = &progress {
        let warnings = progress.warnings();
        if !warnings.is_empty() {
            println!("Stability warnings during the run:");
            for warning in &warnings {
                println!("  - {}", warning);
            }
        }
    }

    if summary.final_state.non_finite > 0 {
        warn!(
            non_finite = summary.final_state.non_finite,
            "Simulation finished with non-finite particle state."
        );
        println!(
            "Warning: {} particle(s) ended with non-finite state.",
            summary.final_state.non_finite
        );
    }

    println!(
        "✓ {} frames ({} substeps, {:.4} s simulated) in {:.2} s wall time.",
        summary.frames, summary.substeps, summary.simulated_time, summary.wall_time_secs
    );

    if let Some(path) = &app_config.output.summary_path {
        write_summary(&summary, path)?;
        println!("  Run summary written to: {}", path.display());
    }

    Ok(())
}

fn simulate_with_output(
    app_config: &AppConfig,
    reporter: &ProgressReporter,
) -> Result<SimulationSummary> {
    let config = &app_config.core_config;
    let Some(directory) = &app_config.output.directory else {
        info!("Frame output disabled; running without writing frames.");
        return Ok(simulate::run(config, &mut NullSink, reporter)?);
    };

    info!(
        "Writing {:?} frames to {}",
        app_config.output.format,
        directory.display()
    );
    let summary = match app_config.output.format {
        FrameFormatArg::Csv => simulate_into(config, CsvFrameWriter::create(directory)?, reporter)?,
        FrameFormatArg::Ply => simulate_into(config, PlyFrameWriter::create(directory)?, reporter)?,
    };
    println!("  Frames written to: {}", directory.display());
    Ok(summary)
}

fn simulate_into<S: FrameSink>(
    config: &mpm3d::engine::config::SimulationConfig,
    mut sink: S,
    reporter: &ProgressReporter,
) -> Result<SimulationSummary> {
    Ok(simulate::run(config, &mut sink, reporter)?)
}

fn write_summary(summary: &SimulationSummary, path: &Path) -> Result<()> {
    let text = toml::to_string_pretty(summary).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}
