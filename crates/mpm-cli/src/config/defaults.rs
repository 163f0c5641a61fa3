use super::file::{
    FileConfig, FileGridConfig, FileInitialStateConfig, FileMaterialConfig, FileOutputConfig,
    FileParticlesConfig, FileTimeConfig,
};
use crate::cli::FrameFormatArg;
use crate::error::{CliError, Result};
use mpm3d::engine::config::{SimulationConfig, SimulationConfigBuilder};
use std::path::PathBuf;

pub struct DefaultsConfig {
    pub simulation: SimulationConfig,
    pub output_directory: PathBuf,
    pub output_format: FrameFormatArg,
}

impl DefaultsConfig {
    pub fn load() -> Result<Self> {
        let simulation = SimulationConfigBuilder::reference()
            .build()
            .map_err(|e| CliError::Config(format!("built-in defaults are invalid: {}", e)))?;
        Ok(Self {
            simulation,
            output_directory: PathBuf::from("particles"),
            output_format: FrameFormatArg::Csv,
        })
    }

    /// The defaults expressed as a fully populated configuration file.
    pub fn to_file_config(&self) -> FileConfig {
        let sim = &self.simulation;
        FileConfig {
            grid: Some(FileGridConfig {
                resolution: Some(sim.grid.resolution),
                boundary_width: Some(sim.grid.boundary_width),
                block_size: Some(sim.grid.block_size),
            }),
            particles: Some(FileParticlesConfig {
                count: Some(sim.initial.count),
                block_size: Some(sim.particle_block_size),
            }),
            material: Some(FileMaterialConfig {
                particle_mass: Some(sim.material.particle_mass),
                particle_volume: Some(sim.material.particle_volume),
                stiffness: Some(sim.material.stiffness),
                gravity: Some(sim.gravity),
            }),
            time: Some(FileTimeConfig {
                dt: Some(sim.time.dt),
                substeps_per_frame: Some(sim.time.substeps_per_frame),
                frames: Some(sim.time.frames),
            }),
            initial_state: Some(FileInitialStateConfig {
                region_min: Some(sim.initial.region.min.into()),
                region_max: Some(sim.initial.region.max.into()),
                velocity: Some(sim.initial.velocity.into()),
                seed: Some(sim.initial.seed),
            }),
            output: Some(FileOutputConfig {
                enabled: Some(true),
                directory: Some(self.output_directory.clone()),
                format: Some(self.output_format),
                summary: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let defaults = DefaultsConfig::load().unwrap();
        let text = toml::to_string_pretty(&defaults.to_file_config()).unwrap();
        let parsed: FileConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, defaults.to_file_config());
    }

    #[test]
    fn defaults_use_reference_scene() {
        let defaults = DefaultsConfig::load().unwrap();
        assert_eq!(defaults.simulation.grid.resolution, 128);
        assert_eq!(defaults.simulation.particle_count(), 131072);
        assert_eq!(defaults.output_directory, PathBuf::from("particles"));
    }
}
