use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A write targeted a document that does not exist.
    /// Reads never produce this; a missing document reads as `None`.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// An insert collided with an existing document id.
    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    /// A pagination cursor could not be decoded.
    #[error("Invalid pagination cursor")]
    InvalidCursor,

    /// An atomic increment targeted a non-numeric field.
    #[error("Field is not a number: {0}")]
    NotANumber(String),

    /// An array mutation targeted a non-array field.
    #[error("Field is not an array: {0}")]
    NotAnArray(String),

    /// A caller-supplied value failed domain validation.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The backend could not be reached. Transient; retry is a new
    /// caller-triggered action.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
