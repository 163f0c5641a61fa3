use crate::core::kernel::{Stencil, stencil_offsets};
use crate::core::models::grid::{Grid, GridNode};
use crate::core::models::particle::{Particle, ParticleSet};
use crate::engine::config::SimulationConfig;
use nalgebra::{Matrix3, Vector3};
use tracing::instrument;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Gathers grid velocities back onto every particle, rebuilds its affine velocity, updates
/// `J` from the divergence, and advects the position.
///
/// The grid is read-only here and each particle writes only its own state. Stencil nodes
/// outside the grid contribute zero velocity.
#[instrument(level = "trace", skip_all, name = "g2p_task")]
pub fn run(particles: &mut ParticleSet, grid: &Grid, config: &SimulationConfig) {
    let block_size = config.particle_block_size.max(1);

    #[cfg(not(feature = "parallel"))]
    let blocks = particles.as_mut_slice().chunks_mut(block_size);

    #[cfg(feature = "parallel")]
    let blocks = particles.as_mut_slice().par_chunks_mut(block_size);

    blocks.for_each(|block| {
        for particle in block.iter_mut() {
            gather(particle, grid, config);
        }
    });
}

fn gather(particle: &mut Particle, grid: &Grid, config: &SimulationConfig) {
    let inv_dx = config.inv_dx();
    let dt = config.time.dt;
    let stencil = Stencil::new(&particle.position, inv_dx);

    let mut velocity = Vector3::zeros();
    let mut affine = Matrix3::zeros();
    for offset in stencil_offsets() {
        let grid_velocity = grid
            .get(&stencil.node(offset))
            .map_or_else(Vector3::zeros, GridNode::velocity);
        let wv = grid_velocity * stencil.weight(offset);
        velocity += wv;
        affine += wv * stencil.node_offset(offset).transpose() * (4.0 * inv_dx);
    }

    particle.volume_change *= 1.0 + dt * affine.trace();
    particle.position += velocity * dt;
    particle.velocity = velocity;
    particle.affine_velocity = affine;
}
