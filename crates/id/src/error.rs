use crate::fmt::TriceId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IdError>;

#[derive(Error, Debug)]
pub enum IdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot read {path}: {source} - maybe need to create an empty file first? (Safety feature)")]
    CatalogUnreadable {
        path: String,
        source: std::io::Error,
    },

    #[error("no free ID left in [{min},{max}], {used} in use")]
    IdSpaceExhausted {
        min: TriceId,
        max: TriceId,
        used: usize,
    },

    #[error("unknown ID search method: {0}")]
    UnknownSearchMethod(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}
