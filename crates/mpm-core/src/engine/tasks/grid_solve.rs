use crate::core::models::grid::{Grid, GridNode, split_index};
use crate::engine::config::SimulationConfig;
use nalgebra::Vector3;
use tracing::instrument;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Converts accumulated momentum to velocity in place, applies gravity, and removes the
/// outward velocity component on nodes inside the boundary band.
///
/// Nodes without mass are never divided; their velocity stays at the (zero) accumulated
/// value. The wall condition applies to every node regardless of mass.
#[instrument(level = "trace", skip_all, name = "grid_solve_task")]
pub fn run(grid: &mut Grid, config: &SimulationConfig) {
    let resolution = grid.resolution();
    let chunk_len = config.grid.block_size.pow(3).max(1);

    #[cfg(not(feature = "parallel"))]
    let blocks = grid.nodes_mut().chunks_mut(chunk_len).enumerate();

    #[cfg(feature = "parallel")]
    let blocks = grid.nodes_mut().par_chunks_mut(chunk_len).enumerate();

    blocks.for_each(|(block_index, block)| {
        let first = block_index * chunk_len;
        for (offset, node) in block.iter_mut().enumerate() {
            let coord = split_index(first + offset, resolution);
            solve_node(node, coord, resolution, config);
        }
    });
}

fn solve_node(node: &mut GridNode, coord: [usize; 3], resolution: usize, config: &SimulationConfig) {
    let mut velocity = Vector3::new(
        node.momentum[0].get(),
        node.momentum[1].get(),
        node.momentum[2].get(),
    );

    let mass = node.mass.get();
    if mass > 0.0 {
        velocity /= mass;
        velocity.y += config.time.dt * config.gravity;
    }

    apply_boundary(&mut velocity, coord, resolution, config.grid.boundary_width);
    node.set_vector(&velocity);
}

/// Slip wall: on each axis, a node closer than `width` cells to the high face may not move
/// outward through it, and likewise for the low face. Tangential components are untouched.
#[inline]
pub fn apply_boundary(velocity: &mut Vector3<f32>, coord: [usize; 3], resolution: usize, width: usize) {
    for axis in 0..3 {
        if coord[axis] + width > resolution {
            velocity[axis] = velocity[axis].min(0.0);
        }
        if coord[axis] < width {
            velocity[axis] = velocity[axis].max(0.0);
        }
    }
}
