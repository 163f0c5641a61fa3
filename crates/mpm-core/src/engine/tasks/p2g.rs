use crate::core::kernel::{Stencil, stencil_offsets};
use crate::core::models::grid::Grid;
use crate::core::models::particle::{Particle, ParticleSet};
use crate::engine::config::SimulationConfig;
use nalgebra::Matrix3;
use tracing::{instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Scatters mass and momentum from every particle onto its 27 stencil nodes.
///
/// The isotropic stress response `E * (J - 1)` is folded into the APIC affine term, so a
/// single scatter carries both momentum transport and internal force. Contributions to
/// nodes outside the grid are dropped; the number of dropped node contributions is returned.
/// The grid must have been cleared beforehand.
#[instrument(level = "trace", skip_all, name = "p2g_task")]
pub fn run(particles: &ParticleSet, grid: &Grid, config: &SimulationConfig) -> usize {
    let block_size = config.particle_block_size.max(1);

    #[cfg(not(feature = "parallel"))]
    let blocks = particles.as_slice().chunks(block_size);

    #[cfg(feature = "parallel")]
    let blocks = particles.as_slice().par_chunks(block_size);

    let dropped: usize = blocks
        .map(|block| {
            block
                .iter()
                .map(|particle| scatter(particle, grid, config))
                .sum::<usize>()
        })
        .sum();

    if dropped > 0 {
        trace!(dropped, "Dropped stencil contributions outside the grid.");
    }
    dropped
}

fn scatter(particle: &Particle, grid: &Grid, config: &SimulationConfig) -> usize {
    let dx = config.dx();
    let inv_dx = config.inv_dx();
    let mass = config.material.particle_mass;
    let stress_scale =
        -4.0 * inv_dx * inv_dx * config.time.dt * config.material.particle_volume;

    let stencil = Stencil::new(&particle.position, inv_dx);
    let cauchy = config.material.stiffness * (particle.volume_change - 1.0);
    let affine = particle.affine_velocity * mass
        + Matrix3::from_diagonal_element(stress_scale * cauchy);
    let momentum = particle.velocity * mass;

    let mut dropped = 0;
    for offset in stencil_offsets() {
        let Some(node) = grid.get(&stencil.node(offset)) else {
            dropped += 1;
            continue;
        };
        let weight = stencil.weight(offset);
        let dpos = stencil.node_offset(offset) * dx;
        node.accumulate(&((momentum + affine * dpos) * weight), weight * mass);
    }
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::particle::SamplingRegion;
    use crate::engine::config::SimulationConfigBuilder;
    use nalgebra::Vector3;

    fn small_config(stiffness: f32) -> SimulationConfig {
        SimulationConfigBuilder::reference()
            .resolution(32)
            .grid_block_size(4)
            .particle_count(64)
            .particle_block_size(8)
            .stiffness(stiffness)
            .sampling_region(SamplingRegion::new(
                Vector3::repeat(0.3),
                Vector3::repeat(0.7),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn total_grid_mass_equals_total_particle_mass() {
        let config = small_config(1e3);
        let particles = ParticleSet::sample(&config.initial);
        let grid = Grid::new(config.grid.resolution);

        let dropped = run(&particles, &grid, &config);

        assert_eq!(dropped, 0);
        let expected = particles.len() as f64 * config.material.particle_mass as f64;
        assert!((grid.total_mass() - expected).abs() < 1e-3 * expected);
    }

    #[test]
    fn grid_momentum_equals_particle_momentum_without_stress() {
        let config = small_config(0.0);
        let mut particles = ParticleSet::sample(&config.initial);
        for (i, p) in particles.as_mut_slice().iter_mut().enumerate() {
            p.velocity = Vector3::new(0.1 * i as f32, -0.3, 0.05);
            p.affine_velocity = Matrix3::new(0.5, 0.1, 0.0, -0.2, 0.3, 0.0, 0.0, 0.4, -0.1);
        }
        let grid = Grid::new(config.grid.resolution);

        run(&particles, &grid, &config);

        let expected: Vector3<f64> = particles
            .iter()
            .map(|p| (p.velocity * config.material.particle_mass).cast::<f64>())
            .fold(Vector3::zeros(), |acc, m| acc + m);
        assert!((grid.total_momentum() - expected).norm() < 1e-4 * expected.norm());
    }

    #[test]
    fn compressed_particle_pushes_momentum_outward() {
        let config = small_config(1e3);
        let mut particle = Particle::at_rest(Vector3::new(0.5, 0.5, 0.5));
        particle.volume_change = 0.9;
        let particles = ParticleSet::from_particles(vec![particle]);
        let grid = Grid::new(config.grid.resolution);

        run(&particles, &grid, &config);

        let stencil = Stencil::new(&particle.position, config.inv_dx());
        let upper = grid.get(&stencil.node([2, 1, 1])).unwrap().vector();
        let lower = grid.get(&stencil.node([0, 1, 1])).unwrap().vector();
        assert!(upper.x > 0.0);
        assert!(lower.x < 0.0);
        assert!(grid.total_momentum().norm() < 1e-6);
    }

    #[test]
    fn particle_near_edge_drops_out_of_range_contributions() {
        let config = small_config(0.0);
        let particles =
            ParticleSet::from_particles(vec![Particle::at_rest(Vector3::new(0.001, 0.5, 0.5))]);
        let grid = Grid::new(config.grid.resolution);

        let dropped = run(&particles, &grid, &config);

        assert_eq!(dropped, 9);
        assert!(grid.total_mass() < config.material.particle_mass as f64);
    }

    #[test]
    fn diverged_particle_drops_its_whole_stencil() {
        let config = small_config(1e3);
        let particles = ParticleSet::from_particles(vec![
            Particle::at_rest(Vector3::new(f32::INFINITY, 0.5, 0.5)),
            Particle::at_rest(Vector3::new(0.5, 0.5, 0.5)),
        ]);
        let grid = Grid::new(config.grid.resolution);

        let dropped = run(&particles, &grid, &config);

        assert_eq!(dropped, 27);
        assert!((grid.total_mass() - config.material.particle_mass as f64).abs() < 1e-5);
    }
}
