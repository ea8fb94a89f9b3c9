use thiserror::Error;

/// Library error type for showcase operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Caption side file or manifest could not be encoded/decoded.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),

    /// A request named a carousel that the session does not own.
    #[error("unknown carousel: {0}")]
    UnknownCarousel(String),
}
