use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{AppConfig, OutputConfig};
use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use mpm3d::core::models::particle::SamplingRegion;
use mpm3d::engine::config::{SimulationConfig, SimulationConfigBuilder};
use nalgebra::Vector3;
use std::path::Path;

/// Resolves the effective configuration for `run`: defaults, then the config file, then
/// `--set` values, then dedicated flags.
pub fn build_config(args: &RunArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::load()?;

    let mut file_config = load_file_config(args.config.as_deref())?;
    file_config.apply_set_values(&args.set_values)?;

    let core_config = merge_simulation(&defaults, &file_config, Some(args))?;
    let output = merge_output(&defaults, &file_config, args);

    Ok(AppConfig {
        core_config,
        output,
    })
}

/// Resolves a configuration file plus `--set` values without any run flags.
pub fn build_simulation_config(
    config_path: Option<&Path>,
    set_values: &[String],
) -> Result<SimulationConfig> {
    let defaults = DefaultsConfig::load()?;
    let mut file_config = load_file_config(config_path)?;
    file_config.apply_set_values(set_values)?;
    merge_simulation(&defaults, &file_config, None)
}

fn load_file_config(path: Option<&Path>) -> Result<FileConfig> {
    match path {
        Some(path) => FileConfig::from_file(path),
        None => Ok(FileConfig::default()),
    }
}

fn merge_simulation(
    defaults: &DefaultsConfig,
    file_config: &FileConfig,
    args: Option<&RunArgs>,
) -> Result<SimulationConfig> {
    let d = &defaults.simulation;
    let grid = file_config.grid.clone().unwrap_or_default();
    let particles = file_config.particles.clone().unwrap_or_default();
    let material = file_config.material.clone().unwrap_or_default();
    let time = file_config.time.clone().unwrap_or_default();
    let initial = file_config.initial_state.clone().unwrap_or_default();

    let flag = |f: fn(&RunArgs) -> Option<usize>| args.and_then(f);

    let region_min = initial
        .region_min
        .map(Vector3::from)
        .unwrap_or(d.initial.region.min);
    let region_max = initial
        .region_max
        .map(Vector3::from)
        .unwrap_or(d.initial.region.max);

    SimulationConfigBuilder::new()
        .resolution(
            flag(|a| a.resolution)
                .or(grid.resolution)
                .unwrap_or(d.grid.resolution),
        )
        .boundary_width(grid.boundary_width.unwrap_or(d.grid.boundary_width))
        .grid_block_size(grid.block_size.unwrap_or(d.grid.block_size))
        .particle_count(
            flag(|a| a.particles)
                .or(particles.count)
                .unwrap_or(d.initial.count),
        )
        .particle_block_size(particles.block_size.unwrap_or(d.particle_block_size))
        .particle_mass(material.particle_mass.unwrap_or(d.material.particle_mass))
        .particle_volume(material.particle_volume.unwrap_or(d.material.particle_volume))
        .stiffness(material.stiffness.unwrap_or(d.material.stiffness))
        .gravity(material.gravity.unwrap_or(d.gravity))
        .dt(args
            .and_then(|a| a.dt)
            .or(time.dt)
            .unwrap_or(d.time.dt))
        .substeps_per_frame(
            flag(|a| a.substeps)
                .or(time.substeps_per_frame)
                .unwrap_or(d.time.substeps_per_frame),
        )
        .frames(
            flag(|a| a.frames)
                .or(time.frames)
                .unwrap_or(d.time.frames),
        )
        .sampling_region(SamplingRegion::new(region_min, region_max))
        .initial_velocity(
            initial
                .velocity
                .map(Vector3::from)
                .unwrap_or(d.initial.velocity),
        )
        .seed(
            args.and_then(|a| a.seed)
                .or(initial.seed)
                .unwrap_or(d.initial.seed),
        )
        .build()
        .map_err(|e| CliError::Config(e.to_string()))
}

fn merge_output(defaults: &DefaultsConfig, file_config: &FileConfig, args: &RunArgs) -> OutputConfig {
    let output = file_config.output.clone().unwrap_or_default();
    let enabled = !args.no_output && output.enabled.unwrap_or(true);

    OutputConfig {
        directory: enabled.then(|| {
            args.output
                .clone()
                .or(output.directory)
                .unwrap_or_else(|| defaults.output_directory.clone())
        }),
        format: args
            .format
            .or(output.format)
            .unwrap_or(defaults.output_format),
        summary_path: args.summary.clone().or(output.summary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands, FrameFormatArg};
    use clap::Parser;
    use once_cell::sync::Lazy;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    static TEST_DIR: Lazy<TempDir> = Lazy::new(|| tempdir().expect("Failed to create temp dir"));

    fn write_config_file(name: &str, content: &str) -> PathBuf {
        let file_path = TEST_DIR.path().join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn parse_run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["mpm", "run"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            _ => panic!("Expected 'run' subcommand"),
        }
    }

    #[test]
    fn no_file_and_no_flags_yields_reference_defaults() {
        let config = build_config(&parse_run_args(&[])).unwrap();

        let reference = SimulationConfigBuilder::reference().build().unwrap();
        assert_eq!(config.core_config, reference);
        assert_eq!(config.output.directory, Some(PathBuf::from("particles")));
        assert_eq!(config.output.format, FrameFormatArg::Csv);
        assert_eq!(config.output.summary_path, None);
    }

    #[test]
    fn file_values_override_defaults() {
        let path = write_config_file(
            "file_over_defaults.toml",
            r#"
            [grid]
            resolution = 64

            [particles]
            count = 4096

            [time]
            frames = 12

            [output]
            directory = "frames"
            format = "ply"
            "#,
        );
        let args = parse_run_args(&["-c", path.to_str().unwrap()]);

        let config = build_config(&args).unwrap();

        assert_eq!(config.core_config.grid.resolution, 64);
        assert_eq!(config.core_config.particle_count(), 4096);
        assert_eq!(config.core_config.time.frames, 12);
        assert_eq!(config.core_config.time.dt, 1e-4);
        assert_eq!(config.output.directory, Some(PathBuf::from("frames")));
        assert_eq!(config.output.format, FrameFormatArg::Ply);
    }

    #[test]
    fn set_values_override_file_and_flags_override_set_values() {
        let path = write_config_file(
            "layering.toml",
            r#"
            [grid]
            resolution = 64

            [time]
            frames = 12
            "#,
        );
        let args = parse_run_args(&[
            "-c",
            path.to_str().unwrap(),
            "-S",
            "time.frames=30",
            "-S",
            "grid.resolution=32",
            "-n",
            "256",
        ]);

        let config = build_config(&args).unwrap();

        assert_eq!(config.core_config.time.frames, 30);
        assert_eq!(config.core_config.grid.resolution, 256);
    }

    #[test]
    fn no_output_flag_disables_frame_export() {
        let path = write_config_file("output_on.toml", "[output]\nenabled = true\n");
        let args = parse_run_args(&["-c", path.to_str().unwrap(), "--no-output"]);

        let config = build_config(&args).unwrap();

        assert_eq!(config.output.directory, None);
    }

    #[test]
    fn invalid_merged_values_are_config_errors() {
        let args = parse_run_args(&["-n", "100"]);
        let result = build_config(&args);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("power of two")));
    }

    #[test]
    fn simulation_config_without_run_flags_uses_file_and_set_values() {
        let path = write_config_file("check.toml", "[material]\nstiffness = 250.0\n");
        let config =
            build_simulation_config(Some(&path), &["material.gravity=-10".to_string()]).unwrap();
        assert_eq!(config.material.stiffness, 250.0);
        assert_eq!(config.gravity, -10.0);
        assert_eq!(config.grid.resolution, 128);
    }
}
