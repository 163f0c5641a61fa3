use super::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Failed to write frame {frame}: {source}")]
    FrameOutput {
        frame: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
