//! # Engine Module
//!
//! Time integration of the particle set through the background grid.
//!
//! ## Overview
//!
//! A [`simulation::Simulation`] owns the particles and the grid and advances them one substep
//! at a time. Every substep runs four data-parallel phases in strict order: clear the grid,
//! scatter particle mass and momentum onto it, solve for node velocities under gravity and the
//! slip walls, and gather velocities back onto the particles. A phase never starts before the
//! previous one has finished.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Immutable, validated run parameters and their builder
//! - **Stepping** ([`simulation`]) - The substep and frame loop
//! - **Instrumentation** ([`diagnostics`], [`timing`]) - Conservation and stability checks,
//!   per-phase wall-clock accounting
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events for front ends
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod progress;
pub mod simulation;
pub(crate) mod tasks;
pub mod timing;
