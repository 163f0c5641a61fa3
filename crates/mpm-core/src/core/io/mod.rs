//! Frame export for particle positions.
//!
//! After every rendered frame the workflow hands a snapshot of all particle positions to a
//! [`traits::FrameSink`]. The sinks here write one file per frame, named by the zero-padded
//! four-digit frame index (`0000.csv`, `0001.csv`, ...).

pub mod csv;
pub mod ply;
pub mod traits;
