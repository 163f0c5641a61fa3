//! Data models for the particle set and the background grid.
//!
//! Particles persist for the whole run; grid nodes have no identity across substeps and
//! are cleared before every particle-to-grid transfer.

pub mod grid;
pub mod particle;
