use std::io;

use thiserror::Error;

/// Why a fetch produced no content.
///
/// The queue logs these and drops the request; recipients are never told.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("source not found: {0}")]
    NotFound(String),

    #[error("failed to read source: {0}")]
    Io(#[from] io::Error),

    #[error("failed to decode content: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while setting up a [`crate::LoadQueue`].
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("max_concurrent must be at least 1")]
    ZeroConcurrency,

    #[error("failed to spawn loader worker thread")]
    Spawn(#[source] io::Error),
}
