// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for topology operations

use thiserror::Error;

use crate::domain::{InstanceTypeError, NameError, NetworkError, SecretError, ValidationError};

/// Errors that can occur while declaring, building or handing off a topology
#[derive(Debug, Error)]
pub enum TopologyError {
    /// Descriptor rejected before handoff
    #[error("Descriptor validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Malformed logical name
    #[error("Invalid logical name: {0}")]
    Name(#[from] NameError),

    /// Malformed network literal
    #[error("Invalid network value: {0}")]
    Network(#[from] NetworkError),

    /// Malformed instance type
    #[error("Invalid instance type: {0}")]
    InstanceType(#[from] InstanceTypeError),

    /// Malformed secret name
    #[error("Invalid secret name: {0}")]
    Secret(#[from] SecretError),

    /// Two rendered resources map to the same logical id
    #[error("Logical id collision: {0}")]
    LogicalIdCollision(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error while persisting a plan
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the provisioning engine, passed through unmodified
    #[error("Provisioning engine error: {0}")]
    Engine(String),
}

/// Result type for topology operations
pub type TopologyResult<T> = Result<T, TopologyError>;

impl From<serde_json::Error> for TopologyError {
    fn from(err: serde_json::Error) -> Self {
        TopologyError::Serialization(err.to_string())
    }
}

impl TopologyError {
    /// Check whether the error was raised locally, before any handoff
    pub fn is_local(&self) -> bool {
        !matches!(self, TopologyError::Engine(_))
    }
}
