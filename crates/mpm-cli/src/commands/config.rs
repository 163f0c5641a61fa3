use crate::cli::{ConfigArgs, ConfigCommands};
use crate::config::builder::build_simulation_config;
use crate::config::defaults::DefaultsConfig;
use crate::error::{CliError, Result};
use mpm3d::engine::config::SimulationConfig;
use std::path::Path;

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::ShowDefaults => {
            print!("{}", default_toml()?);
        }
        ConfigCommands::Check { config, set_values } => {
            let resolved = build_simulation_config(config.as_deref(), &set_values)?;
            let source = config
                .as_deref()
                .map(Path::display)
                .map(|p| p.to_string())
                .unwrap_or_else(|| "built-in defaults".to_string());
            println!("✓ Configuration from {} is valid.", source);
            print!("{}", describe(&resolved));
        }
    }
    Ok(())
}

/// The built-in defaults rendered as a configuration file.
pub fn default_toml() -> Result<String> {
    let defaults = DefaultsConfig::load()?;
    toml::to_string_pretty(&defaults.to_file_config())
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to render defaults: {}", e)))
}

fn describe(config: &SimulationConfig) -> String {
    format!(
        "  grid:        {n}³ nodes, dx = {dx:.6}, boundary band {bw} cells\n\
         \x20 particles:   {count} (blocks of {pb})\n\
         \x20 material:    mass {m}, volume {v}, stiffness {e}, gravity {g}\n\
         \x20 time:        dt = {dt:e}, {spf} substeps/frame, {frames} frames ({total} substeps)\n",
        n = config.grid.resolution,
        dx = config.dx(),
        bw = config.grid.boundary_width,
        count = config.particle_count(),
        pb = config.particle_block_size,
        m = config.material.particle_mass,
        v = config.material.particle_volume,
        e = config.material.stiffness,
        g = config.gravity,
        dt = config.time.dt,
        spf = config.time.substeps_per_frame,
        frames = config.time.frames,
        total = config.total_substeps(),
    )
}
