use crate::core::models::grid::{Grid, GridNode};
use tracing::instrument;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Zeroes momentum and mass on every node.
#[instrument(level = "trace", skip_all, name = "clear_grid_task")]
pub fn run(grid: &mut Grid, block_size: usize) {
    let chunk_len = block_size.pow(3).max(1);

    #[cfg(not(feature = "parallel"))]
    let blocks = grid.nodes_mut().chunks_mut(chunk_len);

    #[cfg(feature = "parallel")]
    let blocks = grid.nodes_mut().par_chunks_mut(chunk_len);

    blocks.for_each(|block| block.iter_mut().for_each(GridNode::clear));
}
