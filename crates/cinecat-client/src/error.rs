use thiserror::Error;

use cinecat_store::StoreError;

/// Errors surfaced to the presentation layer.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A mutating action was attempted without a signed-in identity.
    /// Fails fast; no network or cache effect.
    #[error("Sign-in required")]
    AuthorizationRequired,

    /// Acting on another user's record. Checked against the locally cached
    /// copy only; the store's own access rules are the real gate.
    #[error("Only the author can modify this record")]
    AuthorshipViolation,

    /// Error propagated from the store layer.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
