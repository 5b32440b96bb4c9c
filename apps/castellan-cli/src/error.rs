//! CLI error types.

use castellan_directory::DirectoryError;
use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not read config file {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("directory check failed: {0}")]
    Directory(#[from] DirectoryError),

    #[error("check failed: {0}")]
    CheckFailed(String),
}
