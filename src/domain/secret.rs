// Copyright (c) 2025 - Cowboy AI, Inc.
//! Secret References and Credential Sources
//!
//! A [`SecretReference`] points into an external secret store by name. It is
//! resolved by the provisioning engine at apply time; the descriptor never
//! sees the secret value.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use super::LogicalName;

/// Secret name validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("Secret name is empty")]
    Empty,

    #[error("Secret name exceeds maximum length of 512 characters: {0}")]
    TooLong(usize),

    #[error("Invalid character {ch:?} in secret name {name:?}")]
    InvalidCharacter { name: String, ch: char },
}

/// Name or path of a secret in the external store (`rds/admin`)
///
/// Invariants:
/// - 1 to 512 characters
/// - Alphanumerics and `/_+=.@-` only
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecretName(String);

impl SecretName {
    pub const MAX_LENGTH: usize = 512;

    pub fn new(name: impl Into<String>) -> Result<Self, SecretError> {
        let name = name.into();

        if name.is_empty() {
            return Err(SecretError::Empty);
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(SecretError::TooLong(name.len()));
        }

        if let Some(ch) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || "/_+=.@-".contains(*c)))
        {
            return Err(SecretError::InvalidCharacter { name, ch });
        }

        Ok(Self(name))
    }

    /// Name from a literal known to be valid
    pub(crate) fn from_static(name: &'static str) -> Self {
        debug_assert!(Self::new(name).is_ok());
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SecretName {
    type Error = SecretError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SecretName> for String {
    fn from(name: SecretName) -> Self {
        name.0
    }
}

/// Declared reference to an externally stored secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretReference {
    pub name: LogicalName,
    pub secret_name: SecretName,
}

impl SecretReference {
    pub fn from_secret_name(name: LogicalName, secret_name: SecretName) -> Self {
        Self { name, secret_name }
    }

    /// Dynamic reference to one JSON key of the secret, resolved at apply time
    pub fn dynamic_reference(&self, json_key: &str) -> String {
        format!(
            "{{{{resolve:secretsmanager:{}:SecretString:{}}}}}",
            self.secret_name, json_key
        )
    }
}

/// Where a database gets its master credentials from
///
/// `Inline` exists so configuration carrying a literal can be rejected with a
/// precise error. Its password never appears in `Debug` or serialized output.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// A declared [`SecretReference`], by logical name
    FromSecret(LogicalName),
    /// Literal username and password
    Inline { username: String, password: String },
}

const REDACTED: &str = "<redacted>";

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FromSecret(name) => f.debug_tuple("FromSecret").field(name).finish(),
            Self::Inline { username, .. } => f
                .debug_struct("Inline")
                .field("username", username)
                .field("password", &REDACTED)
                .finish(),
        }
    }
}

impl Serialize for CredentialSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "snake_case")]
        enum Redacted<'a> {
            FromSecret(&'a LogicalName),
            Inline { username: &'a str, password: &'a str },
        }

        match self {
            Self::FromSecret(name) => Redacted::FromSecret(name).serialize(serializer),
            Self::Inline { username, .. } => Redacted::Inline {
                username,
                password: REDACTED,
            }
            .serialize(serializer),
        }
    }
}
