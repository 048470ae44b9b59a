//! Error types for the tut-dl library.

use thiserror::Error;

/// Errors that can occur while driving a download run.
#[derive(Error, Debug)]
pub enum Error {
    /// A start parameter (credentials, output directory, queue file) is missing or unusable.
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The browser session refused or failed a command.
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration file could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// A page did not have the layout the site profile expects.
    #[error("Unexpected page: {0}")]
    UnexpectedPage(String),

    /// Download operation failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// The engine cannot do this in its current state.
    #[error("Invalid engine state: {0}")]
    InvalidState(&'static str),

    /// The run was cancelled by the caller.
    #[error("Cancelled")]
    Cancelled,
}

/// A specialized `Result` type for tut-dl operations.
pub type Result<T> = std::result::Result<T, Error>;
