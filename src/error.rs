//! Error types for the document synchronization system
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages.

use thiserror::Error;

/// Main error type for preparation and synchronization operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// The record has no resolvable primary key, so no document can be built
    #[error(
        "Record of type '{record_type}' has no value for primary-key attribute '{attribute}'"
    )]
    MissingPrimaryKey {
        record_type: String,
        attribute: String,
    },

    /// Required field value is absent on the source record
    #[error("Field '{field}' is required but the source record supplied no value")]
    MissingValue { field: String },

    /// Field value could not be coerced to the declared type
    #[error("Field '{field}' expected a {expected} value, got: {got}")]
    InvalidValue {
        field: String,
        expected: &'static str,
        got: String,
    },

    /// An embedding field's dependency value was absent after preparation
    #[error(
        "Embedding field '{field}' depends on '{dependency}', which produced no value for this record"
    )]
    MissingDependency { field: String, dependency: String },

    /// A locally computed embedding field was used without an injected encoder
    #[error(
        "Field '{field}' is computed by a local model but no encoder was configured. Attach one with CollectionIndexer::with_encoder"
    )]
    EncoderMissing { field: String },

    /// The encoder failed to produce a vector
    #[error("Embedding encode failed for '{context}': {reason}")]
    EncodeFailed { context: String, reason: String },

    /// Schema declaration errors (duplicate names, dangling dependencies)
    #[error("Invalid field set: {reason}")]
    InvalidSchema { reason: String },

    /// Configuration errors
    #[error("Invalid configuration: {reason}")]
    ConfigError { reason: String },

    /// Remote engine transport errors
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised by the remote search-engine transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// The addressed collection, document, or synonym does not exist remotely
    #[error("Remote resource not found: {0}")]
    NotFound(String),

    /// The engine rejected the request
    #[error("Search engine returned HTTP {status} during {operation}: {body}")]
    Engine {
        operation: String,
        status: u16,
        body: String,
    },

    /// The request never reached the engine or the connection broke
    #[error("Network failure during {operation}: {source}")]
    Network {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// The engine responded with something we could not decode
    #[error("Failed to decode engine response during {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },
}

impl TransportError {
    /// True when the failure means "the remote resource does not exist".
    ///
    /// Update falls back to create on this, and delete treats it as success.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias for preparation and synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
