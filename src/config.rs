// Copyright (c) 2025 - Cowboy AI, Inc.
//! Descriptor configuration
//!
//! [`DeploymentContext`] carries the account/region a descriptor is evaluated
//! for; it is passed in explicitly rather than read from ambient state during
//! evaluation. [`TopologyConfig`] holds the knobs of the bastion + database
//! stack. Its `Default` reproduces the reference stack exactly, and a JSON
//! file may override any subset of fields.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::{
    CredentialSource, DatabaseEngine, InstanceType, Ipv4Cidr, LogicalName, MachineImage,
    SecretName, SubnetGroup,
};
use crate::errors::{TopologyError, TopologyResult};

/// Account and region the descriptor targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentContext {
    /// Account id; left to the provisioning engine when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    pub region: String,
    pub partition: String,
}

impl Default for DeploymentContext {
    fn default() -> Self {
        Self {
            account: None,
            region: "us-east-1".to_string(),
            partition: "aws".to_string(),
        }
    }
}

impl DeploymentContext {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Default::default()
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Load the context from environment variables
    ///
    /// `TOPOLOGY_ACCOUNT` / `TOPOLOGY_REGION` / `TOPOLOGY_PARTITION`, falling
    /// back to `CDK_DEFAULT_ACCOUNT` / `CDK_DEFAULT_REGION`.
    pub fn from_env() -> TopologyResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the context through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TopologyResult<Self> {
        let defaults = Self::default();

        let account = lookup("TOPOLOGY_ACCOUNT").or_else(|| lookup("CDK_DEFAULT_ACCOUNT"));
        if let Some(account) = &account {
            if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
                return Err(TopologyError::Configuration(format!(
                    "account id must be 12 digits, got {:?}",
                    account
                )));
            }
        }

        let region = lookup("TOPOLOGY_REGION")
            .or_else(|| lookup("CDK_DEFAULT_REGION"))
            .unwrap_or(defaults.region);
        if region.is_empty() {
            return Err(TopologyError::Configuration("region must not be empty".into()));
        }

        let partition = lookup("TOPOLOGY_PARTITION").unwrap_or(defaults.partition);

        Ok(Self {
            account,
            region,
            partition,
        })
    }
}

/// Network knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub cidr: Ipv4Cidr,
    pub max_azs: u8,
    /// No NAT gateways by default: the private tier needs no outbound path
    pub nat_gateways: u8,
    pub cidr_mask: u8,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cidr: Ipv4Cidr::DEFAULT_VPC,
            max_azs: 2,
            nat_gateways: 0,
            cidr_mask: SubnetGroup::DEFAULT_CIDR_MASK,
        }
    }
}

/// Bastion host knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BastionConfig {
    pub instance_type: InstanceType,
    pub machine_image: MachineImage,
    /// Provider-managed policies attached to the bastion role, by name
    pub managed_policies: Vec<String>,
}

impl Default for BastionConfig {
    fn default() -> Self {
        Self {
            instance_type: InstanceType::from_static("t2", "nano"),
            machine_image: MachineImage::latest_amazon_linux(),
            managed_policies: vec!["AmazonSSMManagedInstanceCore".to_string()],
        }
    }
}

/// Database knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub engine: DatabaseEngine,
    pub instance_type: InstanceType,
    pub allocated_storage_gib: u32,
    pub max_allocated_storage_gib: Option<u32>,
    /// Listener port; the engine default when unset
    pub port: Option<u16>,
    pub publicly_accessible: bool,
    pub deletion_protection: bool,
    pub credentials: CredentialSource,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: DatabaseEngine::postgres("15"),
            instance_type: InstanceType::from_static("t3", "micro"),
            allocated_storage_gib: 20,
            max_allocated_storage_gib: Some(100),
            port: None,
            publicly_accessible: false,
            deletion_protection: false,
            credentials: CredentialSource::FromSecret(default_secret_logical_name()),
        }
    }
}

/// Secret store knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretConfig {
    /// Logical name of the declared secret reference
    pub name: LogicalName,
    /// Path of the secret in the external store
    pub secret_name: SecretName,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            name: default_secret_logical_name(),
            secret_name: SecretName::from_static("rds/admin"),
        }
    }
}

fn default_secret_logical_name() -> LogicalName {
    LogicalName::from_static("rds-credentials")
}

/// Configuration of the bastion + database stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub stack_name: LogicalName,
    pub network: NetworkConfig,
    pub bastion: BastionConfig,
    pub database: DatabaseConfig,
    pub secret: SecretConfig,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            stack_name: LogicalName::from_static("infra-stack"),
            network: NetworkConfig::default(),
            bastion: BastionConfig::default(),
            database: DatabaseConfig::default(),
            secret: SecretConfig::default(),
        }
    }
}

impl TopologyConfig {
    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> TopologyResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| TopologyError::Configuration(format!("invalid topology config: {}", e)))
    }

    /// Read a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> TopologyResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            TopologyError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}
