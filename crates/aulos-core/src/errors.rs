#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown media type: {0}")]
    UnknownMediaType(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
