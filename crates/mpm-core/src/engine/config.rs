use crate::core::models::particle::{InitialDistribution, SamplingRegion};
use nalgebra::Vector3;
use thiserror::Error;

/// Minimum distance, in cells, between sampled particles and any domain face. A particle
/// this far inside never reaches outside the grid with its 3x3x3 stencil.
pub const STENCIL_MARGIN_CELLS: usize = 3;

/// Largest accepted grid resolution. Larger grids overflow `i32` node coordinates and
/// exceed any practical node allocation.
pub const MAX_RESOLUTION: usize = 1024;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Grid resolution must be a power of two, got {0}")]
    ResolutionNotPowerOfTwo(usize),

    #[error("{what} ({value}) is not divisible by block size {block_size}")]
    BlockSizeMismatch {
        what: &'static str,
        value: usize,
        block_size: usize,
    },

    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(
        "Sampling region {min:?}..{max:?} must stay at least {margin_cells} cells inside the domain"
    )]
    RegionOutsideInterior {
        min: [f32; 3],
        max: [f32; 3],
        margin_cells: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    /// Nodes per axis (`n`). The grid spans the unit cube, so `dx = 1 / n`.
    pub resolution: usize,
    /// Width, in cells, of the band near each face where outward velocity is removed.
    pub boundary_width: usize,
    pub block_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialConfig {
    pub particle_mass: f32,
    pub particle_volume: f32,
    /// Stiffness `E` of the isotropic pressure response `E * (J - 1)`.
    pub stiffness: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeConfig {
    pub dt: f32,
    pub substeps_per_frame: usize,
    pub frames: usize,
}

/// Immutable run parameters, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub grid: GridConfig,
    pub material: MaterialConfig,
    pub time: TimeConfig,
    /// Vertical acceleration applied to grid velocities (negative pulls down).
    pub gravity: f32,
    pub particle_block_size: usize,
    pub initial: InitialDistribution,
}

impl SimulationConfig {
    #[inline]
    pub fn dx(&self) -> f32 {
        1.0 / self.grid.resolution as f32
    }

    #[inline]
    pub fn inv_dx(&self) -> f32 {
        self.grid.resolution as f32
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.grid.resolution.pow(3)
    }

    #[inline]
    pub fn particle_count(&self) -> usize {
        self.initial.count
    }

    pub fn total_substeps(&self) -> usize {
        self.time.frames * self.time.substeps_per_frame
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulationConfigBuilder {
    resolution: Option<usize>,
    boundary_width: Option<usize>,
    grid_block_size: Option<usize>,
    particle_count: Option<usize>,
    particle_block_size: Option<usize>,
    particle_mass: Option<f32>,
    particle_volume: Option<f32>,
    stiffness: Option<f32>,
    gravity: Option<f32>,
    dt: Option<f32>,
    substeps_per_frame: Option<usize>,
    frames: Option<usize>,
    sampling_region: Option<SamplingRegion>,
    initial_velocity: Option<Vector3<f32>>,
    seed: Option<u64>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder pre-filled with the reference scene: a 128³ grid and 131072 particles
    /// dropped from a box above the domain floor, 20 substeps per frame for 1000 frames.
    pub fn reference() -> Self {
        Self::new()
            .resolution(128)
            .boundary_width(5)
            .grid_block_size(8)
            .particle_count(8192 * 16)
            .particle_block_size(256)
            .particle_mass(1.0)
            .particle_volume(1.0)
            .stiffness(1e3)
            .gravity(-200.0)
            .dt(1e-4)
            .substeps_per_frame(20)
            .frames(1000)
            .sampling_region(SamplingRegion::new(
                Vector3::new(0.3, 0.15, 0.3),
                Vector3::new(0.7, 0.9, 0.7),
            ))
            .initial_velocity(Vector3::new(0.0, -0.3, 0.0))
            .seed(0)
    }

    pub fn resolution(mut self, n: usize) -> Self {
        self.resolution = Some(n);
        self
    }
    pub fn boundary_width(mut self, cells: usize) -> Self {
        self.boundary_width = Some(cells);
        self
    }
    pub fn grid_block_size(mut self, size: usize) -> Self {
        self.grid_block_size = Some(size);
        self
    }
    pub fn particle_count(mut self, count: usize) -> Self {
        self.particle_count = Some(count);
        self
    }
    pub fn particle_block_size(mut self, size: usize) -> Self {
        self.particle_block_size = Some(size);
        self
    }
    pub fn particle_mass(mut self, mass: f32) -> Self {
        self.particle_mass = Some(mass);
        self
    }
    pub fn particle_volume(mut self, volume: f32) -> Self {
        self.particle_volume = Some(volume);
        self
    }
    pub fn stiffness(mut self, e: f32) -> Self {
        self.stiffness = Some(e);
        self
    }
    pub fn gravity(mut self, g: f32) -> Self {
        self.gravity = Some(g);
        self
    }
    pub fn dt(mut self, dt: f32) -> Self {
        self.dt = Some(dt);
        self
    }
    pub fn substeps_per_frame(mut self, substeps: usize) -> Self {
        self.substeps_per_frame = Some(substeps);
        self
    }
    pub fn frames(mut self, frames: usize) -> Self {
        self.frames = Some(frames);
        self
    }
    pub fn sampling_region(mut self, region: SamplingRegion) -> Self {
        self.sampling_region = Some(region);
        self
    }
    pub fn initial_velocity(mut self, velocity: Vector3<f32>) -> Self {
        self.initial_velocity = Some(velocity);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let config = SimulationConfig {
            grid: GridConfig {
                resolution: self
                    .resolution
                    .ok_or(ConfigError::MissingParameter("resolution"))?,
                boundary_width: self
                    .boundary_width
                    .ok_or(ConfigError::MissingParameter("boundary_width"))?,
                block_size: self
                    .grid_block_size
                    .ok_or(ConfigError::MissingParameter("grid_block_size"))?,
            },
            material: MaterialConfig {
                particle_mass: self
                    .particle_mass
                    .ok_or(ConfigError::MissingParameter("particle_mass"))?,
                particle_volume: self
                    .particle_volume
                    .ok_or(ConfigError::MissingParameter("particle_volume"))?,
                stiffness: self
                    .stiffness
                    .ok_or(ConfigError::MissingParameter("stiffness"))?,
            },
            time: TimeConfig {
                dt: self.dt.ok_or(ConfigError::MissingParameter("dt"))?,
                substeps_per_frame: self
                    .substeps_per_frame
                    .ok_or(ConfigError::MissingParameter("substeps_per_frame"))?,
                frames: self.frames.ok_or(ConfigError::MissingParameter("frames"))?,
            },
            gravity: self.gravity.ok_or(ConfigError::MissingParameter("gravity"))?,
            particle_block_size: self
                .particle_block_size
                .ok_or(ConfigError::MissingParameter("particle_block_size"))?,
            initial: InitialDistribution {
                count: self
                    .particle_count
                    .ok_or(ConfigError::MissingParameter("particle_count"))?,
                region: self
                    .sampling_region
                    .ok_or(ConfigError::MissingParameter("sampling_region"))?,
                velocity: self
                    .initial_velocity
                    .ok_or(ConfigError::MissingParameter("initial_velocity"))?,
                seed: self.seed.ok_or(ConfigError::MissingParameter("seed"))?,
            },
        };
        validate(&config)?;
        Ok(config)
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

fn require_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(name, format!("must be finite and positive, got {}", value)))
    }
}

fn validate(config: &SimulationConfig) -> Result<(), ConfigError> {
    let grid = &config.grid;
    if !grid.resolution.is_power_of_two() {
        return Err(ConfigError::ResolutionNotPowerOfTwo(grid.resolution));
    }
    if grid.resolution > MAX_RESOLUTION || grid.resolution.checked_pow(3).is_none() {
        return Err(invalid(
            "resolution",
            format!("{} exceeds the maximum of {}", grid.resolution, MAX_RESOLUTION),
        ));
    }
    if grid.block_size == 0 {
        return Err(invalid("grid_block_size", "must be at least 1"));
    }
    if grid.resolution % grid.block_size != 0 {
        return Err(ConfigError::BlockSizeMismatch {
            what: "grid resolution",
            value: grid.resolution,
            block_size: grid.block_size,
        });
    }
    if grid.boundary_width * 2 >= grid.resolution {
        return Err(invalid(
            "boundary_width",
            format!(
                "{} cells leaves no interior on a grid of resolution {}",
                grid.boundary_width, grid.resolution
            ),
        ));
    }

    if config.particle_block_size == 0 {
        return Err(invalid("particle_block_size", "must be at least 1"));
    }
    if config.initial.count % config.particle_block_size != 0 {
        return Err(ConfigError::BlockSizeMismatch {
            what: "particle count",
            value: config.initial.count,
            block_size: config.particle_block_size,
        });
    }

    require_positive("particle_mass", config.material.particle_mass)?;
    require_positive("particle_volume", config.material.particle_volume)?;
    require_positive("dt", config.time.dt)?;
    if !(config.material.stiffness.is_finite() && config.material.stiffness >= 0.0) {
        return Err(invalid("stiffness", "must be finite and non-negative"));
    }
    if !config.gravity.is_finite() {
        return Err(invalid("gravity", "must be finite"));
    }
    if config.time.substeps_per_frame == 0 {
        return Err(invalid("substeps_per_frame", "must be at least 1"));
    }
    if !config.initial.velocity.iter().all(|c| c.is_finite()) {
        return Err(invalid("initial_velocity", "must be finite"));
    }

    let region = &config.initial.region;
    if region.is_empty() {
        return Err(invalid("sampling_region", "min must be below max on every axis"));
    }
    let margin = STENCIL_MARGIN_CELLS as f32 * config.dx();
    if !region.is_within(margin, 1.0 - margin) {
        return Err(ConfigError::RegionOutsideInterior {
            min: region.min.into(),
            max: region.max.into(),
            margin_cells: STENCIL_MARGIN_CELLS,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_builder_produces_reference_constants() {
        let config = SimulationConfigBuilder::reference().build().unwrap();
        assert_eq!(config.grid.resolution, 128);
        assert_eq!(config.particle_count(), 131072);
        assert_eq!(config.time.dt, 1e-4);
        assert_eq!(config.dx(), 1.0 / 128.0);
        assert_eq!(config.inv_dx(), 128.0);
        assert_eq!(config.node_count(), 128 * 128 * 128);
        assert_eq!(config.total_substeps(), 20_000);
        assert_eq!(config.initial.velocity, Vector3::new(0.0, -0.3, 0.0));
    }

    #[test]
    fn missing_parameter_is_reported_by_name() {
        let result = SimulationConfigBuilder::new().resolution(64).build();
        assert!(matches!(result, Err(ConfigError::MissingParameter(_))));
    }

    #[test]
    fn non_power_of_two_resolution_is_rejected() {
        let result = SimulationConfigBuilder::reference()
            .resolution(96)
            .grid_block_size(8)
            .build();
        assert_eq!(result, Err(ConfigError::ResolutionNotPowerOfTwo(96)));
    }

    #[test]
    fn oversized_resolution_is_rejected_before_allocation() {
        for resolution in [2 * MAX_RESOLUTION, 1 << 22] {
            let result = SimulationConfigBuilder::reference()
                .resolution(resolution)
                .build();
            assert!(
                matches!(result, Err(ConfigError::InvalidParameter { name: "resolution", .. })),
                "{:?}",
                result
            );
        }
        assert!(
            SimulationConfigBuilder::reference()
                .resolution(MAX_RESOLUTION)
                .build()
                .is_ok()
        );
    }

    #[test]
    fn particle_count_must_divide_into_blocks() {
        let result = SimulationConfigBuilder::reference()
            .particle_count(1000)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::BlockSizeMismatch {
                what: "particle count",
                ..
            })
        ));
    }

    #[test]
    fn grid_resolution_must_divide_into_blocks() {
        let result = SimulationConfigBuilder::reference()
            .resolution(4)
            .boundary_width(1)
            .sampling_region(SamplingRegion::new(
                Vector3::repeat(0.75),
                Vector3::repeat(0.75),
            ))
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::BlockSizeMismatch {
                what: "grid resolution",
                ..
            })
        ));
    }

    #[test]
    fn region_touching_the_domain_edge_is_rejected() {
        let result = SimulationConfigBuilder::reference()
            .sampling_region(SamplingRegion::new(
                Vector3::new(0.0, 0.15, 0.3),
                Vector3::new(0.7, 0.9, 0.7),
            ))
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::RegionOutsideInterior { .. })
        ));
    }

    #[test]
    fn non_positive_time_step_is_rejected() {
        let result = SimulationConfigBuilder::reference().dt(0.0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { name: "dt", .. })
        ));
    }

    #[test]
    fn oversized_boundary_band_is_rejected() {
        let result = SimulationConfigBuilder::reference()
            .boundary_width(64)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "boundary_width",
                ..
            })
        ));
    }
}
