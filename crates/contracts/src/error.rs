//! Layered error definitions
//!
//! Categorized by source: config / registry / ingest / dispatch

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Registry Errors =====
    /// Device id not present in the registry
    #[error("unknown device: {device_id}")]
    UnknownDevice { device_id: String },

    /// Profile id the registry does not hold (dangling reference)
    #[error("unknown profile: {profile_id}")]
    UnknownProfile { profile_id: String },

    /// Profile deletion blocked while devices still reference it
    #[error("profile '{profile_id}' is in use by devices: {referenced_by:?}")]
    ProfileInUse {
        profile_id: String,
        referenced_by: Vec<String>,
    },

    // ===== Ingest Errors =====
    /// Status payload could not be decoded
    #[error("malformed status payload: {message}")]
    MalformedPayload { message: String },

    // ===== Dispatch Errors =====
    /// Device endpoint rejected or refused the command
    #[error("device '{device_id}' unreachable: {message}")]
    Unreachable { device_id: String, message: String },

    /// Command did not complete within the dispatch timeout
    #[error("dispatch to '{device_id}' timed out after {waited_ms}ms")]
    Timeout { device_id: String, waited_ms: u64 },

    /// A dispatch is already outstanding and the device queue is full
    #[error("device '{device_id}' is busy with an outstanding dispatch")]
    Busy { device_id: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create unknown-device error
    pub fn unknown_device(device_id: impl Into<String>) -> Self {
        Self::UnknownDevice {
            device_id: device_id.into(),
        }
    }

    /// Create malformed-payload error
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    /// Create unreachable error
    pub fn unreachable(device_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            device_id: device_id.into(),
            message: message.into(),
        }
    }
}
