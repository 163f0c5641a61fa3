//! # Core Module
//!
//! Stateless building blocks of the solver.
//!
//! - **Simulation State** ([`models`]) - Particle and grid storage
//! - **Interpolation** ([`kernel`]) - Quadratic B-spline weights and the 3x3x3 stencil
//! - **Frame Export** ([`io`]) - Sinks that persist per-frame particle positions
//! - **Utilities** ([`utils`]) - Lock-free accumulation primitives

pub mod io;
pub mod kernel;
pub mod models;
pub mod utils;
