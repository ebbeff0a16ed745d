// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-topology
//!
//! Deterministic contexts and descriptors shared by the integration tests.
//! Fixtures never read the process environment.

#![allow(dead_code)]

use cim_topology::domain::{
    CredentialSource, DatabaseEngine, DatabaseInstance, InstanceType, LogicalName, Network,
    PeerSource, Port, SecretName, SecretReference, SecurityGroup, StorageBounds, SubnetGroup,
    SubnetTier,
};
use cim_topology::engine::ProvisioningEngine;
use cim_topology::{DeploymentContext, PlanDocument, TopologyConfig, TopologyDescriptor};
use std::convert::Infallible;

pub const ACCOUNT: &str = "123456789012";
pub const REGION: &str = "us-east-1";
pub const SECRET_PATH: &str = "rds/admin";

pub fn name(s: &str) -> LogicalName {
    LogicalName::new(s).expect("Invalid logical name in test fixture")
}

/// Fixed deployment context
pub fn context() -> DeploymentContext {
    DeploymentContext::new(REGION).with_account(ACCOUNT)
}

/// Default stack config with the given storage bounds
pub fn config_with_storage(allocated: u32, max: Option<u32>) -> TopologyConfig {
    let mut config = TopologyConfig::default();
    config.database.allocated_storage_gib = allocated;
    config.database.max_allocated_storage_gib = max;
    config
}

/// Two-tier network over two AZs
pub fn two_tier_network() -> Network {
    Network::new(name("vpc"), "10.0.0.0/16".parse().expect("Invalid CIDR in test fixture"))
        .with_subnet_group(SubnetGroup::new(name("public"), SubnetTier::Public))
        .with_subnet_group(SubnetGroup::new(name("private"), SubnetTier::PrivateWithEgress))
}

/// Network and security groups only: db-sg admits bastion-sg on 5432
pub fn scoped_ingress_descriptor() -> TopologyDescriptor {
    TopologyDescriptor::new(name("scoped-ingress"), context())
        .with_network(two_tier_network())
        .with_security_group(SecurityGroup::new(name("bastion-sg"), name("vpc"), "bastion"))
        .with_security_group(
            SecurityGroup::new(name("db-sg"), name("vpc"), "database").with_ingress_rule(
                PeerSource::SecurityGroup(name("bastion-sg")),
                Port::tcp(5432),
                "Allow bastion to access the database",
            ),
        )
}

/// Minimal database declaration in the private tier
pub fn database(storage: StorageBounds) -> DatabaseInstance {
    DatabaseInstance::new(
        name("database"),
        DatabaseEngine::postgres("15"),
        name("vpc"),
        SubnetTier::PrivateWithEgress,
        InstanceType::new("t3", "micro").expect("Invalid instance type in test fixture"),
        CredentialSource::FromSecret(name("rds-credentials")),
    )
    .with_storage(storage)
    .with_security_group(name("db-sg"))
}

/// Secret reference the fixture database reads its credentials from
pub fn secret() -> SecretReference {
    SecretReference::from_secret_name(
        name("rds-credentials"),
        SecretName::new(SECRET_PATH).expect("Invalid secret name in test fixture"),
    )
}

/// Engine double that records every submitted plan
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub submitted: Vec<PlanDocument>,
}

impl ProvisioningEngine for RecordingEngine {
    type Error = Infallible;

    fn submit(&mut self, plan: &PlanDocument) -> Result<(), Self::Error> {
        self.submitted.push(plan.clone());
        Ok(())
    }
}
