//! Errors shared by the config loader and the listing store

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Listing store query or connection failure
    #[cfg(feature = "sqlx")]
    #[error("Listing store error: {0}")]
    Database(#[from] sqlx::Error),

    /// Reading input, config files, or creating the database directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable config file, missing API key, or a client that cannot be built
    #[error("Configuration error: {0}")]
    Config(String),
}
