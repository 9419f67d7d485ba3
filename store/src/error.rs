//! Error types for declaration store operations.
//!
//! Covers I/O and (de)serialization failures, declarations rejected by the
//! engine, and packages written for an incompatible contract version.

use argschema_core::ConfigurationError;
use thiserror::Error;

/// Errors that can occur while loading or writing declarations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A loaded declaration is inconsistent.
    #[error("invalid declaration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Package metadata is unusable (e.g., incompatible contract version).
    #[error("invalid package: {0}")]
    InvalidPackage(String),

    /// All configured loader sources failed.
    #[error("no declaration sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
