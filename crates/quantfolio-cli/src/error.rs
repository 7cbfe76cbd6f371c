use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] quantfolio_core::ValidationError),

    #[error(transparent)]
    Engine(#[from] quantfolio_core::EngineError),

    #[error("data file error: {0}")]
    DataFile(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Engine(_) => 3,
            Self::DataFile(_) => 4,
            Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
