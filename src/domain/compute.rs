// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compute Instances
//!
//! A compute instance sits in exactly one subnet tier of one network, runs a
//! referenced machine image, and may assume an IAM role.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::{LogicalName, SubnetTier};

/// Instance type validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstanceTypeError {
    #[error("Instance type must be <class>.<size>: {0}")]
    InvalidFormat(String),

    #[error("Invalid instance class {0:?}")]
    InvalidClass(String),

    #[error("Invalid instance size {0:?}")]
    InvalidSize(String),
}

/// Instance size class (`t2.nano`, `t3.micro`)
///
/// # Examples
///
/// ```rust
/// use cim_topology::domain::InstanceType;
///
/// let nano: InstanceType = "t2.nano".parse().unwrap();
/// assert_eq!(nano.class(), "t2");
/// assert_eq!(nano.database_class(), "db.t2.nano");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceType {
    class: String,
    size: String,
}

impl InstanceType {
    pub fn new(
        class: impl Into<String>,
        size: impl Into<String>,
    ) -> Result<Self, InstanceTypeError> {
        let class = class.into();
        let size = size.into();

        // Class: lowercase family letters followed by a generation and
        // optional attribute letters (t3, m6gd, r5a)
        let valid_class = class.starts_with(|c: char| c.is_ascii_lowercase())
            && class.chars().any(|c| c.is_ascii_digit())
            && class.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !valid_class {
            return Err(InstanceTypeError::InvalidClass(class));
        }

        let valid_size = !size.is_empty()
            && size.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !valid_size {
            return Err(InstanceTypeError::InvalidSize(size));
        }

        Ok(Self { class, size })
    }

    /// Type from literals known to be valid
    pub(crate) fn from_static(class: &'static str, size: &'static str) -> Self {
        debug_assert!(Self::new(class, size).is_ok());
        Self {
            class: class.to_string(),
            size: size.to_string(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    /// The same type as a managed-database instance class
    pub fn database_class(&self) -> String {
        format!("db.{}", self)
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.size)
    }
}

impl FromStr for InstanceType {
    type Err = InstanceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (class, size) = s
            .split_once('.')
            .ok_or_else(|| InstanceTypeError::InvalidFormat(s.to_string()))?;
        Self::new(class, size)
    }
}

impl TryFrom<String> for InstanceType {
    type Error = InstanceTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InstanceType> for String {
    fn from(instance_type: InstanceType) -> Self {
        instance_type.to_string()
    }
}

/// Amazon Linux generation for the latest-image lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmazonLinuxGeneration {
    AmazonLinux2,
    AmazonLinux2023,
}

/// Machine image reference, never resolved locally
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineImage {
    /// Latest public Amazon Linux image, looked up through its parameter path
    LatestAmazonLinux(AmazonLinuxGeneration),
    /// Explicit image id (`ami-0123456789abcdef0`)
    Ami(String),
    /// Arbitrary parameter-store path holding an image id
    SsmParameter(String),
}

impl MachineImage {
    pub fn latest_amazon_linux() -> Self {
        Self::LatestAmazonLinux(AmazonLinuxGeneration::AmazonLinux2)
    }

    /// Image id as rendered in the plan: a literal id or a dynamic reference
    pub fn image_id_reference(&self) -> String {
        match self {
            Self::LatestAmazonLinux(AmazonLinuxGeneration::AmazonLinux2) => {
                "{{resolve:ssm:/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2}}"
                    .to_string()
            }
            Self::LatestAmazonLinux(AmazonLinuxGeneration::AmazonLinux2023) => {
                concat!(
                    "{{resolve:ssm:/aws/service/ami-amazon-linux-latest/",
                    "al2023-ami-kernel-default-x86_64}}"
                )
                .to_string()
            }
            Self::Ami(id) => id.clone(),
            Self::SsmParameter(path) => format!("{{{{resolve:ssm:{}}}}}", path),
        }
    }
}

/// Compute instance declaration
///
/// # Invariants
/// - Exactly one subnet tier (enforced by the type)
/// - Referenced network, role and security groups are declared (checked on build)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeInstance {
    pub name: LogicalName,
    pub network: LogicalName,
    pub subnet_tier: SubnetTier,
    pub instance_type: InstanceType,
    pub machine_image: MachineImage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<LogicalName>,
    pub security_groups: Vec<LogicalName>,
}

impl ComputeInstance {
    pub fn new(
        name: LogicalName,
        network: LogicalName,
        subnet_tier: SubnetTier,
        instance_type: InstanceType,
        machine_image: MachineImage,
    ) -> Self {
        Self {
            name,
            network,
            subnet_tier,
            instance_type,
            machine_image,
            role: None,
            security_groups: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: LogicalName) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_security_group(mut self, group: LogicalName) -> Self {
        if !self.security_groups.contains(&group) {
            self.security_groups.push(group);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("t2.nano", "t2", "nano")]
    #[test_case("t3.micro", "t3", "micro")]
    #[test_case("m6gd.2xlarge", "m6gd", "2xlarge")]
    fn test_instance_type_parse(input: &str, class: &str, size: &str) {
        let parsed: InstanceType = input.parse().unwrap();
        assert_eq!(parsed.class(), class);
        assert_eq!(parsed.size(), size);
        assert_eq!(parsed.to_string(), input);
    }

    #[test]
    fn test_invalid_instance_types() {
        assert!(matches!(
            "t2nano".parse::<InstanceType>(),
            Err(InstanceTypeError::InvalidFormat(_))
        ));
        assert!(matches!(
            "T2.nano".parse::<InstanceType>(),
            Err(InstanceTypeError::InvalidClass(_))
        ));
        assert!(matches!(
            "t.nano".parse::<InstanceType>(),
            Err(InstanceTypeError::InvalidClass(_))
        ));
        assert!(matches!(
            "t2.".parse::<InstanceType>(),
            Err(InstanceTypeError::InvalidSize(_))
        ));
    }

    #[test]
    fn test_database_class() {
        let micro: InstanceType = "t3.micro".parse().unwrap();
        assert_eq!(micro.database_class(), "db.t3.micro");
    }

    #[test]
    fn test_machine_image_references() {
        assert_eq!(
            MachineImage::latest_amazon_linux().image_id_reference(),
            "{{resolve:ssm:/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2}}"
        );
        assert_eq!(
            MachineImage::Ami("ami-0123456789abcdef0".into()).image_id_reference(),
            "ami-0123456789abcdef0"
        );
        assert_eq!(
            MachineImage::SsmParameter("/golden/bastion".into()).image_id_reference(),
            "{{resolve:ssm:/golden/bastion}}"
        );
    }

    #[test]
    fn test_security_groups_deduplicated() {
        let sg = LogicalName::new("bastion-sg").unwrap();
        let instance = ComputeInstance::new(
            LogicalName::new("bastion").unwrap(),
            LogicalName::new("vpc").unwrap(),
            SubnetTier::Public,
            "t2.nano".parse().unwrap(),
            MachineImage::latest_amazon_linux(),
        )
        .with_security_group(sg.clone())
        .with_security_group(sg);

        assert_eq!(instance.security_groups.len(), 1);
    }
}
