//! # Error Types
//!
//! Errors raised by the commerce platform boundary.

use thiserror::Error;

/// Errors reported by the commerce platform.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// The platform could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The catalog lookup rejected one or more identifiers.
    #[error("Unknown product identifiers: {0:?}")]
    UnknownProducts(Vec<String>),

    /// The subscription status lookup failed for a group.
    #[error("Subscription status unavailable for group {0}")]
    StatusUnavailable(String),

    /// The transaction could not be finished.
    #[error("Failed to finish transaction {0}")]
    FinishFailed(u64),

    /// The customer is not allowed to make payments.
    #[error("Purchases not allowed: {0}")]
    PurchaseNotAllowed(String),

    /// Anything else the platform reported.
    #[error("Platform error: {0}")]
    Other(String),
}
