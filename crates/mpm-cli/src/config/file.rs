use crate::cli::FrameFormatArg;
use crate::error::{CliError, Result};
use crate::utils::parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileGridConfig {
    pub resolution: Option<usize>,
    pub boundary_width: Option<usize>,
    pub block_size: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileParticlesConfig {
    pub count: Option<usize>,
    pub block_size: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileMaterialConfig {
    pub particle_mass: Option<f32>,
    pub particle_volume: Option<f32>,
    pub stiffness: Option<f32>,
    pub gravity: Option<f32>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileTimeConfig {
    pub dt: Option<f32>,
    pub substeps_per_frame: Option<usize>,
    pub frames: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileInitialStateConfig {
    pub region_min: Option<[f32; 3]>,
    pub region_max: Option<[f32; 3]>,
    pub velocity: Option<[f32; 3]>,
    pub seed: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOutputConfig {
    pub enabled: Option<bool>,
    pub directory: Option<PathBuf>,
    pub format: Option<FrameFormatArg>,
    pub summary: Option<PathBuf>,
}

/// Contents of a configuration file. Every value is optional; missing ones fall back to the
/// built-in defaults.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub grid: Option<FileGridConfig>,
    pub particles: Option<FileParticlesConfig>,
    pub material: Option<FileMaterialConfig>,
    pub time: Option<FileTimeConfig>,
    pub initial_state: Option<FileInitialStateConfig>,
    pub output: Option<FileOutputConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Applies `section.key=value` overrides in order; later ones win.
    pub fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value) = parser::parse_key_value(kv_pair)
                .map_err(|e| CliError::Config(e.to_string()))?;
            self.set(key, value)?;
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "grid.resolution" => self.grid_mut().resolution = Some(parse_scalar(key, value)?),
            "grid.boundary-width" => {
                self.grid_mut().boundary_width = Some(parse_scalar(key, value)?)
            }
            "grid.block-size" => self.grid_mut().block_size = Some(parse_scalar(key, value)?),

            "particles.count" => self.particles_mut().count = Some(parse_scalar(key, value)?),
            "particles.block-size" => {
                self.particles_mut().block_size = Some(parse_scalar(key, value)?)
            }

            "material.particle-mass" => {
                self.material_mut().particle_mass = Some(parse_scalar(key, value)?)
            }
            "material.particle-volume" => {
                self.material_mut().particle_volume = Some(parse_scalar(key, value)?)
            }
            "material.stiffness" => {
                self.material_mut().stiffness = Some(parse_scalar(key, value)?)
            }
            "material.gravity" => self.material_mut().gravity = Some(parse_scalar(key, value)?),

            "time.dt" => self.time_mut().dt = Some(parse_scalar(key, value)?),
            "time.substeps-per-frame" => {
                self.time_mut().substeps_per_frame = Some(parse_scalar(key, value)?)
            }
            "time.frames" => self.time_mut().frames = Some(parse_scalar(key, value)?),

            "initial-state.region-min" => {
                self.initial_state_mut().region_min = Some(parse_vector(key, value)?)
            }
            "initial-state.region-max" => {
                self.initial_state_mut().region_max = Some(parse_vector(key, value)?)
            }
            "initial-state.velocity" => {
                self.initial_state_mut().velocity = Some(parse_vector(key, value)?)
            }
            "initial-state.seed" => {
                self.initial_state_mut().seed = Some(parse_scalar(key, value)?)
            }

            "output.enabled" => self.output_mut().enabled = Some(parse_scalar(key, value)?),
            "output.directory" => self.output_mut().directory = Some(PathBuf::from(value)),
            "output.format" => {
                self.output_mut().format = Some(match value {
                    "csv" => FrameFormatArg::Csv,
                    "ply" => FrameFormatArg::Ply,
                    other => {
                        return Err(CliError::Config(format!(
                            "Invalid value for {}: '{}'. Expected 'csv' or 'ply'.",
                            key, other
                        )));
                    }
                })
            }
            "output.summary" => self.output_mut().summary = Some(PathBuf::from(value)),

            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
        Ok(())
    }

    fn grid_mut(&mut self) -> &mut FileGridConfig {
        self.grid.get_or_insert_with(Default::default)
    }

    fn particles_mut(&mut self) -> &mut FileParticlesConfig {
        self.particles.get_or_insert_with(Default::default)
    }

    fn material_mut(&mut self) -> &mut FileMaterialConfig {
        self.material.get_or_insert_with(Default::default)
    }

    fn time_mut(&mut self) -> &mut FileTimeConfig {
        self.time.get_or_insert_with(Default::default)
    }

    fn initial_state_mut(&mut self) -> &mut FileInitialStateConfig {
        self.initial_state.get_or_insert_with(Default::default)
    }

    fn output_mut(&mut self) -> &mut FileOutputConfig {
        self.output.get_or_insert_with(Default::default)
    }
}

fn parse_scalar<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid value for {}: '{}' ({})",
            key,
            value,
            std::any::type_name::<T>()
        ))
    })
}

fn parse_vector(key: &str, value: &str) -> Result<[f32; 3]> {
    parser::parse_vector3(value).map_err(|e| CliError::Config(format!("{}: {}", key, e)))
}
