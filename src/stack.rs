// Copyright (c) 2025 - Cowboy AI, Inc.
//! Bastion + Database Stack
//!
//! A two-tier VPC with a bastion host in the public tier and a managed
//! database in the private tier. The database accepts traffic only from the
//! bastion's security group and takes its master credentials from an
//! externally stored secret.

use tracing::debug;

use crate::config::{DeploymentContext, TopologyConfig};
use crate::descriptor::TopologyDescriptor;
use crate::domain::{
    ComputeInstance, DatabaseInstance, IamRole, LogicalName, ManagedPolicyRef, Network, PeerSource,
    Port, SecretReference, SecurityGroup, ServicePrincipal, StorageBounds, SubnetGroup, SubnetTier,
};
use crate::errors::TopologyResult;

pub const NETWORK: &str = "vpc";
pub const PUBLIC_GROUP: &str = "public";
pub const PRIVATE_GROUP: &str = "private";
pub const BASTION_ROLE: &str = "bastion-role";
pub const BASTION_SECURITY_GROUP: &str = "bastion-sg";
pub const DATABASE_SECURITY_GROUP: &str = "db-sg";
pub const BASTION: &str = "bastion";
pub const DATABASE: &str = "database";

/// Declare the bastion + database topology
pub fn bastion_database_stack(
    context: DeploymentContext,
    config: &TopologyConfig,
) -> TopologyResult<TopologyDescriptor> {
    let network_name = LogicalName::new(NETWORK)?;
    let bastion_sg = LogicalName::new(BASTION_SECURITY_GROUP)?;
    let db_sg = LogicalName::new(DATABASE_SECURITY_GROUP)?;
    let role_name = LogicalName::new(BASTION_ROLE)?;

    let network = Network::new(network_name.clone(), config.network.cidr)
        .with_max_azs(config.network.max_azs)
        .with_nat_gateways(config.network.nat_gateways)
        .with_subnet_group(
            SubnetGroup::new(LogicalName::new(PUBLIC_GROUP)?, SubnetTier::Public)
                .with_cidr_mask(config.network.cidr_mask),
        )
        .with_subnet_group(
            SubnetGroup::new(LogicalName::new(PRIVATE_GROUP)?, SubnetTier::PrivateWithEgress)
                .with_cidr_mask(config.network.cidr_mask),
        );

    let role = config.bastion.managed_policies.iter().fold(
        IamRole::new(role_name.clone(), ServicePrincipal::ec2()),
        |role, policy| role.with_managed_policy(ManagedPolicyRef::aws_managed(policy.as_str())),
    );

    let bastion_group = SecurityGroup::new(
        bastion_sg.clone(),
        network_name.clone(),
        "Security group for the bastion host",
    );

    // A publicly accessible database needs an internet-routable subnet
    let database_tier = if config.database.publicly_accessible {
        SubnetTier::Public
    } else {
        SubnetTier::PrivateWithEgress
    };
    let database = DatabaseInstance::new(
        LogicalName::new(DATABASE)?,
        config.database.engine.clone(),
        network_name.clone(),
        database_tier,
        config.database.instance_type.clone(),
        config.database.credentials.clone(),
    )
    .with_storage(StorageBounds::new(
        config.database.allocated_storage_gib,
        config.database.max_allocated_storage_gib,
    ))
    .with_security_group(db_sg.clone())
    .publicly_accessible(config.database.publicly_accessible)
    .deletion_protection(config.database.deletion_protection);
    let database = match config.database.port {
        Some(port) => database.with_port(port),
        None => database,
    };

    let database_group = SecurityGroup::new(
        db_sg,
        network_name.clone(),
        "Security group for the database",
    )
    .with_ingress_rule(
        PeerSource::SecurityGroup(bastion_sg.clone()),
        Port::tcp(database.effective_port()),
        "Allow bastion to access the database",
    );

    let bastion = ComputeInstance::new(
        LogicalName::new(BASTION)?,
        network_name,
        SubnetTier::Public,
        config.bastion.instance_type.clone(),
        config.bastion.machine_image.clone(),
    )
    .with_role(role_name)
    .with_security_group(bastion_sg);

    let secret = SecretReference::from_secret_name(
        config.secret.name.clone(),
        config.secret.secret_name.clone(),
    );

    debug!(
        "Declaring stack {} in {}",
        config.stack_name, context.region
    );

    Ok(TopologyDescriptor::new(config.stack_name.clone(), context)
        .with_network(network)
        .with_role(role)
        .with_security_group(bastion_group)
        .with_security_group(database_group)
        .with_instance(bastion)
        .with_secret(secret)
        .with_database(database))
}
