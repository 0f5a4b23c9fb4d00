//! Error types for cache operations.
//!
//! Only two classes of error ever reach a caller of this crate:
//!
//! - **Fatal setup errors** ([`Error::InvalidInput`], [`Error::Configuration`]):
//!   a cache was constructed without an id, or an explicitly provided
//!   configuration value could not be coerced to its declared type. These
//!   propagate immediately; a malformed override must never be silently
//!   replaced with a default.
//! - **Serialization errors** ([`Error::Serialization`]): a value could not
//!   be encoded for storage, or stored bytes could not be decoded. These
//!   surface from `put`/`get` because they indicate a programming or
//!   data-compatibility defect, not a transient infrastructure issue.
//!
//! Connectivity failures are deliberately absent from this enum: they are
//! caught at the store-access seam, logged at warning level, and mapped to
//! each operation's degraded default (see [`crate::store::StoreError`]).

use thiserror::Error;

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cache setup and value codec failures.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// Input validation error.
    ///
    /// **Recovery:** Fix the caller - construction requires a non-empty id.
    /// Not retryable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error.
    ///
    /// **Recovery:** Fix the offending key in the configuration file.
    /// Not retryable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    ///
    /// **Recovery:** Check that the cached type matches what was stored.
    /// Not retryable.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
