//! The four phases of one substep.
//!
//! Each phase must observe the complete output of the previous one: [`clear_grid`] zeroes
//! every node, [`p2g`] scatters particle mass and momentum onto the grid, [`grid_solve`]
//! turns momentum into velocity and applies gravity and wall conditions, and [`g2p`] gathers
//! velocities back and advects the particles. Within a phase, work is data-parallel.

pub mod clear_grid;
pub mod g2p;
pub mod grid_solve;
pub mod p2g;
