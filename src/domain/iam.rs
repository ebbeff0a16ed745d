// Copyright (c) 2025 - Cowboy AI, Inc.
//! IAM Roles

use serde::{Deserialize, Serialize};
use std::fmt;

use super::LogicalName;

/// Service allowed to assume a role (`ec2.amazonaws.com`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServicePrincipal(String);

impl ServicePrincipal {
    /// The compute service principal
    pub fn ec2() -> Self {
        Self("ec2.amazonaws.com".to_string())
    }

    /// Any principal string; emptiness is checked when the descriptor is built
    pub fn new(principal: impl Into<String>) -> Self {
        Self(principal.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ServicePrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Managed policy attached to a role
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedPolicyRef {
    /// Provider-managed policy, by name
    AwsManaged(String),
    /// Any policy, by full ARN
    Arn(String),
}

impl ManagedPolicyRef {
    pub fn aws_managed(name: impl Into<String>) -> Self {
        Self::AwsManaged(name.into())
    }

    /// Full policy ARN within `partition`
    pub fn arn(&self, partition: &str) -> String {
        match self {
            Self::AwsManaged(name) => format!("arn:{}:iam::aws:policy/{}", partition, name),
            Self::Arn(arn) => arn.clone(),
        }
    }
}

/// IAM role declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamRole {
    pub name: LogicalName,
    pub assumed_by: ServicePrincipal,
    pub managed_policies: Vec<ManagedPolicyRef>,
}

impl IamRole {
    pub fn new(name: LogicalName, assumed_by: ServicePrincipal) -> Self {
        Self {
            name,
            assumed_by,
            managed_policies: Vec::new(),
        }
    }

    /// Attach a managed policy; attaching the same policy twice is a no-op
    pub fn with_managed_policy(mut self, policy: ManagedPolicyRef) -> Self {
        if !self.managed_policies.contains(&policy) {
            self.managed_policies.push(policy);
        }
        self
    }
}
