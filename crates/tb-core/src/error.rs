//! # AppError
//!
//! Centralized error handling for the Tagbox ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all tb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Post, Tag, media id)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty title, malformed tag list)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Missing or unresolvable identity token
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is known but not allowed (e.g., patching someone else's post)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Infrastructure failure (e.g., DB down, storage write failed)
    #[error("internal service error: {0}")]
    Internal(String),

    /// A remote collaborator failed (e.g., the tagging service)
    #[error("upstream service error: {0}")]
    Upstream(String),
}

/// A specialized Result type for Tagbox logic.
pub type Result<T> = std::result::Result<T, AppError>;
