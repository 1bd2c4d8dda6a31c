use thiserror::Error;

/// Core error types for tensortap
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid tensor shape: {0}")]
    InvalidShape(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid capture format: {0}")]
    InvalidFormat(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
