//! Layered configuration: built-in defaults, then a TOML file, then `--set KEY=VALUE`
//! overrides, then dedicated command-line flags.

pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;
