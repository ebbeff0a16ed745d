// Copyright (c) 2025 - Cowboy AI, Inc.
//! Logical Names and Deterministic Node Identity
//!
//! Every entity in a topology descriptor is identified by a [`LogicalName`]
//! that is unique within the descriptor. Names are lowercase, hyphen-separated
//! segments (`bastion-sg`, `rds-credentials`) so they map one-to-one onto the
//! PascalCase logical ids used in the rendered plan document.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Logical name validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("Logical name is empty")]
    Empty,

    #[error("Logical name exceeds maximum length of 64 characters: {0}")]
    TooLong(usize),

    #[error("Invalid character {ch:?} in logical name {name:?}")]
    InvalidCharacter { name: String, ch: char },

    #[error("Each segment of {0:?} must start with a lowercase letter")]
    InvalidSegment(String),
}

/// Logical name of a declared entity
///
/// Invariants:
/// - 1 to 64 characters
/// - Segments separated by single hyphens
/// - Each segment starts with `a-z` and continues with `a-z0-9`
///
/// # Examples
///
/// ```rust
/// use cim_topology::domain::LogicalName;
///
/// let name = LogicalName::new("bastion-sg").unwrap();
/// assert_eq!(name.to_logical_id(), "BastionSg");
///
/// assert!(LogicalName::new("Bastion").is_err());
/// assert!(LogicalName::new("db--sg").is_err());
/// assert!(LogicalName::new("sg-1").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalName(String);

impl LogicalName {
    /// Maximum length of a declared name
    pub const MAX_LENGTH: usize = 64;

    /// Create a new logical name with validation
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();

        if name.is_empty() {
            return Err(NameError::Empty);
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(NameError::TooLong(name.len()));
        }

        if let Some(ch) = name
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(NameError::InvalidCharacter { name, ch });
        }

        let segments_valid = name
            .split('-')
            .all(|segment| segment.starts_with(|c: char| c.is_ascii_lowercase()));
        if !segments_valid {
            return Err(NameError::InvalidSegment(name));
        }

        Ok(Self(name))
    }

    /// Name from a literal known to be valid
    pub(crate) fn from_static(name: &'static str) -> Self {
        debug_assert!(Self::new(name).is_ok(), "invalid literal name {:?}", name);
        Self(name.to_string())
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of a resource derived from this one (subnets, subnet groups)
    ///
    /// The suffix must itself be a valid sequence of segments. Derived names
    /// may exceed [`Self::MAX_LENGTH`].
    pub(crate) fn derived(&self, suffix: &str) -> Self {
        Self(format!("{}-{}", self.0, suffix))
    }

    /// PascalCase logical id used in the plan document
    ///
    /// Injective over valid names because every segment starts with a letter.
    pub fn to_logical_id(&self) -> String {
        self.0
            .split('-')
            .map(|segment| {
                let mut chars = segment.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect()
    }
}

impl fmt::Display for LogicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LogicalName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LogicalName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogicalName> for String {
    fn from(name: LogicalName) -> Self {
        name.0
    }
}

/// Deterministic node identifier
///
/// A UUID v5 derived from `<stack>/<name>`, so evaluating the same descriptor
/// twice yields the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Namespace for all topology node ids
    pub const NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_2a9e_4b7d_5e30_9a41_c2d8_f05b_7e13);

    /// Derive the id of `name` within `stack`
    pub fn derive(stack: &LogicalName, name: &LogicalName) -> Self {
        let path = format!("{}/{}", stack, name);
        Self(Uuid::new_v5(&Self::NAMESPACE, path.as_bytes()))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
