use kwforge::core::registry::{LookupError, RegistryError};
use kwforge::engine::error::ConstructionError;
use kwforge::workflows::document::DocumentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Failed to set up the component catalog: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
