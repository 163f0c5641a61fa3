use crate::core::models::grid::Grid;
use crate::core::models::particle::ParticleSet;
use crate::engine::config::SimulationConfig;
use crate::engine::error::EngineError;
use crate::engine::tasks::{clear_grid, g2p, grid_solve, p2g};
use crate::engine::timing::{Phase, PhaseTimings};
use nalgebra::Point3;
use tracing::{debug, info, instrument};

/// Owns the particle set and the background grid and advances them in lock-step.
///
/// The grid is scratch space: it carries no information between substeps.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    particles: ParticleSet,
    grid: Grid,
    substep: u64,
    frame: usize,
    dropped_contributions: u64,
    timings: PhaseTimings,
}

impl Simulation {
    /// Allocates the grid and samples the initial particle distribution.
    pub fn new(config: SimulationConfig) -> Self {
        let particles = ParticleSet::sample(&config.initial);
        info!(
            particles = particles.len(),
            resolution = config.grid.resolution,
            "Sampled initial particle distribution."
        );
        Self::from_parts(config, particles)
    }

    /// Starts from an explicit particle set instead of sampling one.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Initialization`] if the set's size differs from the configured
    /// particle count.
    pub fn with_particles(
        config: SimulationConfig,
        particles: ParticleSet,
    ) -> Result<Self, EngineError> {
        if particles.len() != config.particle_count() {
            return Err(EngineError::Initialization(format!(
                "particle set holds {} particles but the configuration expects {}",
                particles.len(),
                config.particle_count()
            )));
        }
        Ok(Self::from_parts(config, particles))
    }

    fn from_parts(config: SimulationConfig, particles: ParticleSet) -> Self {
        Self {
            grid: Grid::new(config.grid.resolution),
            config,
            particles,
            substep: 0,
            frame: 0,
            dropped_contributions: 0,
            timings: PhaseTimings::new(),
        }
    }

    /// Runs one full clear, scatter, solve and gather cycle.
    pub fn substep(&mut self) {
        let config = &self.config;
        let grid = &mut self.grid;
        let particles = &mut self.particles;

        self.timings
            .measure(Phase::ClearGrid, || clear_grid::run(grid, config.grid.block_size));
        let dropped = self
            .timings
            .measure(Phase::ParticleToGrid, || p2g::run(particles, grid, config));
        self.timings
            .measure(Phase::GridSolve, || grid_solve::run(grid, config));
        self.timings
            .measure(Phase::GridToParticle, || g2p::run(particles, grid, config));

        self.timings.finish_substep();
        self.dropped_contributions += dropped as u64;
        self.substep += 1;
    }

    /// Runs the configured number of substeps and returns the index of the frame just
    /// completed. Frames are numbered from zero.
    #[instrument(level = "debug", skip_all, fields(frame = self.frame))]
    pub fn advance_frame(&mut self) -> usize {
        for _ in 0..self.config.time.substeps_per_frame {
            self.substep();
        }
        let completed = self.frame;
        self.frame += 1;
        completed
    }

    /// Restores the initial particle distribution and zeroes the counters.
    pub fn restart(&mut self) {
        self.particles.reset(&self.config.initial);
        self.substep = 0;
        self.frame = 0;
        self.dropped_contributions = 0;
        self.timings.reset();
        debug!("Simulation restarted from the initial distribution.");
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn positions(&self) -> Vec<Point3<f32>> {
        self.particles.positions()
    }

    /// Substeps run since construction or the last restart.
    pub fn substeps_run(&self) -> u64 {
        self.substep
    }

    /// Frames completed since construction or the last restart.
    pub fn frames_run(&self) -> usize {
        self.frame
    }

    pub fn elapsed_time(&self) -> f64 {
        self.substep as f64 * self.config.time.dt as f64
    }

    /// Stencil contributions that fell outside the grid during particle-to-grid transfer.
    pub fn dropped_contributions(&self) -> u64 {
        self.dropped_contributions
    }

    pub fn timings(&self) -> &PhaseTimings {
        &self.timings
    }

    /// Returns the accumulated phase timings and starts a fresh accumulation.
    pub fn take_timings(&mut self) -> PhaseTimings {
        std::mem::take(&mut self.timings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::particle::{Particle, SamplingRegion};
    use crate::engine::config::SimulationConfigBuilder;
    use nalgebra::{Matrix3, Vector3};

    const TOLERANCE: f32 = 1e-6;

    fn f32_approx_equal(a: f32, b: f32) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn builder(particle_count: usize) -> SimulationConfigBuilder {
        SimulationConfigBuilder::reference()
            .resolution(32)
            .grid_block_size(4)
            .particle_count(particle_count)
            .particle_block_size(1)
            .gravity(0.0)
            .substeps_per_frame(4)
            .frames(2)
            .sampling_region(SamplingRegion::new(
                Vector3::repeat(0.3),
                Vector3::repeat(0.7),
            ))
    }

    fn total_momentum(particles: &ParticleSet, mass: f32) -> Vector3<f64> {
        particles
            .iter()
            .map(|p| (p.velocity * mass).cast::<f64>())
            .fold(Vector3::zeros(), |acc, m| acc + m)
    }

    #[test]
    fn particle_at_rest_stays_at_rest_under_stiffness() {
        let config = builder(1).stiffness(1e3).build().unwrap();
        let start = Particle::at_rest(Vector3::new(0.5, 0.5, 0.5));
        let mut sim =
            Simulation::with_particles(config, ParticleSet::from_particles(vec![start])).unwrap();

        sim.substep();

        let p = sim.particles().get(0).unwrap();
        assert_eq!(p.velocity, Vector3::zeros());
        assert_eq!(p.position, start.position);
        assert_eq!(p.volume_change, 1.0);
    }

    #[test]
    fn resting_cluster_at_center_is_unchanged_after_one_substep() {
        let config = builder(8).stiffness(0.0).dt(1e-4).build().unwrap();
        let offsets = [-0.01f32, 0.01];
        let start: Vec<Particle> = offsets
            .iter()
            .flat_map(|&x| offsets.iter().map(move |&y| (x, y)))
            .flat_map(|(x, y)| offsets.iter().map(move |&z| Vector3::new(x, y, z)))
            .map(|d| Particle::at_rest(Vector3::repeat(0.5) + d))
            .collect();
        let mut sim =
            Simulation::with_particles(config, ParticleSet::from_particles(start.clone()))
                .unwrap();

        sim.substep();

        for (before, after) in start.iter().zip(sim.particles().iter()) {
            assert!((after.position - before.position).norm() < TOLERANCE);
            assert!(after.velocity.norm() < TOLERANCE);
            assert!(f32_approx_equal(after.volume_change, 1.0));
        }
    }

    #[test]
    fn falling_particle_moves_by_velocity_times_dt() {
        let config = builder(1).stiffness(0.0).dt(1e-4).build().unwrap();
        let start = Particle::new(Vector3::repeat(0.5), Vector3::new(0.0, -0.3, 0.0));
        let mut sim =
            Simulation::with_particles(config, ParticleSet::from_particles(vec![start])).unwrap();

        sim.substep();

        let p = sim.particles().get(0).unwrap();
        assert!(f32_approx_equal(p.position.y, 0.5 - 0.3 * 1e-4));
        assert!(f32_approx_equal(p.position.x, 0.5));
        assert!(f32_approx_equal(p.position.z, 0.5));
        assert!(f32_approx_equal(p.velocity.y, -0.3));
    }

    #[test]
    fn momentum_is_conserved_through_a_full_cycle_without_forces() {
        let config = builder(64).stiffness(0.0).build().unwrap();
        let mut particles = ParticleSet::sample(&config.initial);
        for (i, p) in particles.as_mut_slice().iter_mut().enumerate() {
            let phase = i as f32 * 0.37;
            p.velocity = Vector3::new(phase.sin(), -0.3, phase.cos() * 0.5);
            p.affine_velocity = Matrix3::new(0.2, 0.0, -0.1, 0.3, 0.1, 0.0, 0.0, -0.2, 0.4);
        }
        let before = total_momentum(&particles, config.material.particle_mass);
        let mut sim = Simulation::with_particles(config, particles).unwrap();

        sim.substep();

        let after = total_momentum(sim.particles(), config.material.particle_mass);
        assert!((after - before).norm() < 1e-4 * before.norm());
        assert_eq!(sim.dropped_contributions(), 0);
    }

    #[test]
    fn advance_frame_runs_configured_substeps_and_numbers_frames_from_zero() {
        let config = builder(8).build().unwrap();
        let mut sim = Simulation::new(config);

        assert_eq!(sim.advance_frame(), 0);
        assert_eq!(sim.advance_frame(), 1);
        assert_eq!(sim.substeps_run(), 8);
        assert_eq!(sim.frames_run(), 2);
        assert_eq!(sim.timings().substeps(), 8);
        assert!((sim.elapsed_time() - 8.0 * config.time.dt as f64).abs() < 1e-9);
    }

    #[test]
    fn restart_reproduces_the_initial_distribution() {
        let config = builder(16).gravity(-200.0).build().unwrap();
        let mut sim = Simulation::new(config);
        let initial = sim.particles().clone();

        sim.advance_frame();
        assert_ne!(sim.particles(), &initial);

        sim.restart();
        assert_eq!(sim.particles(), &initial);
        assert_eq!(sim.substeps_run(), 0);
        assert_eq!(sim.frames_run(), 0);
    }

    #[test]
    fn take_timings_resets_accumulation() {
        let config = builder(8).build().unwrap();
        let mut sim = Simulation::new(config);
        sim.substep();

        let taken = sim.take_timings();
        assert_eq!(taken.substeps(), 1);
        assert_eq!(sim.timings().substeps(), 0);
    }

    #[test]
    fn mismatched_particle_count_is_rejected() {
        let config = builder(8).build().unwrap();
        let result = Simulation::with_particles(config, ParticleSet::default());
        assert!(matches!(result, Err(EngineError::Initialization(_))));
    }
}
