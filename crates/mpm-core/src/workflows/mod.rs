//! # Workflows Module
//!
//! Top-level entry points that run a complete simulation from a validated configuration.
//!
//! - **Simulation Workflow** ([`simulate`]) - Runs the configured frames, hands every frame's
//!   particle positions to a [`FrameSink`](crate::core::io::traits::FrameSink), and reports
//!   progress and per-frame diagnostics.

pub mod simulate;
