//! # MPM3D Core Library
//!
//! An explicit Material Point Method solver for a weakly-compressible, fluid-like continuum
//! in three dimensions. Particles carry the material state; a dense background grid is used
//! only as a transient medium through which particles exchange momentum every substep.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Plain data models (`ParticleSet`, `Grid`), the quadratic
//!   B-spline interpolation kernel, and frame export utilities.
//!
//! - **[`engine`]: The Logic Core.** The immutable `SimulationConfig`, the four per-substep
//!   tasks (grid clear, particle-to-grid, grid solve, grid-to-particle), and the `Simulation`
//!   stepper that sequences them behind phase barriers.
//!
//! - **[`workflows`]: The Public API.** Complete procedures such as running a configured number
//!   of frames and handing every frame's particle positions to an output sink.

pub mod core;
pub mod engine;
pub mod workflows;
