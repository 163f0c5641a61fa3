use crate::cli::FrameFormatArg;
use mpm3d::engine::config::SimulationConfig;
use std::path::PathBuf;

/// Where and how frames are exported. `directory` is `None` when output is disabled.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub directory: Option<PathBuf>,
    pub format: FrameFormatArg,
    pub summary_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub core_config: SimulationConfig,
    pub output: OutputConfig,
}
