//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::Persist`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No route matches the request.
    #[error("not found: {0}")]
    NotFound(String),

    /// Writing to the database failed (network, auth, write conflict).
    #[error("persist failure: {0}")]
    Persist(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::Persist(_) => 500,
        }
    }

    /// Short machine-readable code placed in error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Persist(_) => "internal_error",
        }
    }
}
