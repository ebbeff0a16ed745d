// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Descriptor
//!
//! Collects entity declarations and turns them into a validated
//! [`ResourceGraph`]. Declaring is infallible and side-effect free; all
//! cross-entity rules run in [`TopologyDescriptor::build`], which rejects the
//! first violation it finds.
//!
//! # Example
//!
//! ```rust
//! use cim_topology::config::DeploymentContext;
//! use cim_topology::descriptor::TopologyDescriptor;
//! use cim_topology::domain::*;
//!
//! let n = |s: &str| LogicalName::new(s).unwrap();
//!
//! let descriptor = TopologyDescriptor::new(n("demo"), DeploymentContext::new("us-east-1"))
//!     .with_network(
//!         Network::new(n("vpc"), "10.0.0.0/16".parse().unwrap())
//!             .with_subnet_group(SubnetGroup::new(n("public"), SubnetTier::Public)),
//!     )
//!     .with_security_group(SecurityGroup::new(n("web-sg"), n("vpc"), "web"));
//!
//! let graph = descriptor.build().unwrap();
//! assert!(graph.node(&n("web-sg")).is_some());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::config::DeploymentContext;
use crate::domain::invariants::{
    validate_attached_security_groups, validate_credentials, validate_database_placement,
    validate_ingress_sources, validate_network, validate_network_reference,
    validate_role_reference, validate_storage_bounds, validate_subnet_tier,
    validate_trust_principal, validate_unique_name,
};
use crate::domain::{
    ComputeInstance, CredentialSource, DatabaseInstance, IamRole, LogicalName, Network,
    SecretReference, SecurityGroup, ValidationError,
};
use crate::errors::TopologyResult;
use crate::graph::{EdgeKind, Resource, ResourceGraph};

/// Declarations of one stack, not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyDescriptor {
    stack_name: LogicalName,
    context: DeploymentContext,
    networks: Vec<Network>,
    security_groups: Vec<SecurityGroup>,
    roles: Vec<IamRole>,
    secrets: Vec<SecretReference>,
    instances: Vec<ComputeInstance>,
    databases: Vec<DatabaseInstance>,
}

impl TopologyDescriptor {
    pub fn new(stack_name: LogicalName, context: DeploymentContext) -> Self {
        Self {
            stack_name,
            context,
            networks: Vec::new(),
            security_groups: Vec::new(),
            roles: Vec::new(),
            secrets: Vec::new(),
            instances: Vec::new(),
            databases: Vec::new(),
        }
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.networks.push(network);
        self
    }

    pub fn with_security_group(mut self, group: SecurityGroup) -> Self {
        self.security_groups.push(group);
        self
    }

    pub fn with_role(mut self, role: IamRole) -> Self {
        self.roles.push(role);
        self
    }

    pub fn with_secret(mut self, secret: SecretReference) -> Self {
        self.secrets.push(secret);
        self
    }

    pub fn with_instance(mut self, instance: ComputeInstance) -> Self {
        self.instances.push(instance);
        self
    }

    pub fn with_database(mut self, database: DatabaseInstance) -> Self {
        self.databases.push(database);
        self
    }

    pub fn stack_name(&self) -> &LogicalName {
        &self.stack_name
    }

    pub fn context(&self) -> &DeploymentContext {
        &self.context
    }

    /// Validate every declaration and assemble the resource graph
    ///
    /// Performs no I/O. Building the same descriptor twice yields equal graphs.
    pub fn build(&self) -> TopologyResult<ResourceGraph> {
        info!(
            "Building topology {} for region {}",
            self.stack_name, self.context.region
        );

        self.validate()?;

        let mut graph = ResourceGraph::new(self.stack_name.clone(), self.context.clone());

        let mut subnets_by_tier = BTreeMap::new();
        for network in &self.networks {
            insert(&mut graph, &network.name, Resource::Network(network.clone()))?;

            let subnets = network
                .allocate_subnets(&self.context.region)
                .map_err(|reason| ValidationError::SubnetAllocation {
                    network: network.name.clone(),
                    reason,
                })?;
            for subnet in subnets {
                graph.connect(&network.name, &subnet.name, EdgeKind::Owns);
                subnets_by_tier
                    .entry((network.name.clone(), subnet.tier))
                    .or_insert_with(Vec::new)
                    .push(subnet.name.clone());
                let name = subnet.name.clone();
                insert(&mut graph, &name, Resource::Subnet(subnet))?;
            }
        }

        for group in &self.security_groups {
            insert(&mut graph, &group.name, Resource::SecurityGroup(group.clone()))?;
            graph.connect(&group.network, &group.name, EdgeKind::Owns);
            for source in group.referenced_groups() {
                graph.connect(&group.name, source, EdgeKind::AllowsIngressFrom);
            }
        }

        for role in &self.roles {
            insert(&mut graph, &role.name, Resource::IamRole(role.clone()))?;
        }

        for secret in &self.secrets {
            insert(&mut graph, &secret.name, Resource::Secret(secret.clone()))?;
        }

        for instance in &self.instances {
            insert(&mut graph, &instance.name, Resource::ComputeInstance(instance.clone()))?;

            // Instances land in the first AZ of their tier
            if let Some(subnet) = subnets_by_tier
                .get(&(instance.network.clone(), instance.subnet_tier))
                .and_then(|subnets| subnets.first())
            {
                graph.connect(&instance.name, subnet, EdgeKind::PlacedIn);
            }
            if let Some(role) = &instance.role {
                graph.connect(&instance.name, role, EdgeKind::AssumesRole);
            }
            for group in &instance.security_groups {
                graph.connect(&instance.name, group, EdgeKind::AttachedTo);
            }
        }

        for database in &self.databases {
            let subnet_group = database.subnet_group_name();
            let subnets = subnets_by_tier
                .get(&(database.network.clone(), database.subnet_tier))
                .cloned()
                .unwrap_or_default();

            for subnet in &subnets {
                graph.connect(&subnet_group, subnet, EdgeKind::Spans);
            }
            insert(&mut graph, &subnet_group, Resource::DbSubnetGroup { subnets })?;

            insert(&mut graph, &database.name, Resource::DatabaseInstance(database.clone()))?;
            graph.connect(&database.name, &subnet_group, EdgeKind::PlacedIn);
            for group in &database.security_groups {
                graph.connect(&database.name, group, EdgeKind::AttachedTo);
            }
            if let CredentialSource::FromSecret(secret) = &database.credentials {
                graph.connect(&database.name, secret, EdgeKind::UsesCredential);
            }
        }

        info!(
            "Topology {} built: {} nodes, {} edges",
            self.stack_name,
            graph.len(),
            graph.edges().count()
        );

        Ok(graph)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = BTreeSet::new();
        let names = self
            .networks
            .iter()
            .map(|n| &n.name)
            .chain(self.security_groups.iter().map(|g| &g.name))
            .chain(self.roles.iter().map(|r| &r.name))
            .chain(self.secrets.iter().map(|s| &s.name))
            .chain(self.instances.iter().map(|i| &i.name))
            .chain(self.databases.iter().map(|d| &d.name));
        for name in names {
            validate_unique_name(name, &mut seen)?;
        }

        let mut networks = BTreeMap::new();
        for network in &self.networks {
            debug!("Validating network {} ({})", network.name, network.cidr);
            validate_network(network, &self.context.region)?;
            if network.lacks_egress_path() {
                warn!(
                    "Network {} has private-with-egress subnets but no NAT gateways; \
                     they have no outbound path",
                    network.name
                );
            }
            networks.insert(network.name.clone(), network.clone());
        }

        let groups: BTreeMap<_, _> = self
            .security_groups
            .iter()
            .map(|g| (g.name.clone(), g.clone()))
            .collect();
        for group in &self.security_groups {
            debug!(
                "Validating security group {} ({} ingress rules)",
                group.name,
                group.ingress.len()
            );
            validate_network_reference(&group.name, &group.network, &networks)?;
            validate_ingress_sources(group, &groups)?;
        }

        let roles: BTreeMap<_, _> = self
            .roles
            .iter()
            .map(|r| (r.name.clone(), r.clone()))
            .collect();
        for role in &self.roles {
            debug!("Validating role {} assumed by {}", role.name, role.assumed_by);
            validate_trust_principal(role)?;
        }

        for instance in &self.instances {
            debug!(
                "Validating instance {} ({}, {})",
                instance.name, instance.instance_type, instance.subnet_tier
            );
            let network = validate_network_reference(&instance.name, &instance.network, &networks)?;
            validate_subnet_tier(&instance.name, network, instance.subnet_tier)?;
            validate_role_reference(&instance.name, instance.role.as_ref(), &roles)?;
            validate_attached_security_groups(
                &instance.name,
                &instance.network,
                &instance.security_groups,
                &groups,
            )?;
        }

        let secrets: BTreeSet<_> = self.secrets.iter().map(|s| s.name.clone()).collect();
        for database in &self.databases {
            debug!(
                "Validating database {} ({}, {})",
                database.name, database.engine, database.subnet_tier
            );
            let network = validate_network_reference(&database.name, &database.network, &networks)?;
            validate_subnet_tier(&database.name, network, database.subnet_tier)?;
            validate_database_placement(database, network)?;
            validate_attached_security_groups(
                &database.name,
                &database.network,
                &database.security_groups,
                &groups,
            )?;
            validate_credentials(database, &secrets)?;
            validate_storage_bounds(&database.name, &database.storage)?;
        }

        Ok(())
    }
}

/// Insert a node; derived names may still collide with declared ones
fn insert(
    graph: &mut ResourceGraph,
    name: &LogicalName,
    resource: Resource,
) -> Result<(), ValidationError> {
    if graph.insert(name.clone(), resource) {
        Ok(())
    } else {
        Err(ValidationError::DuplicateName { name: name.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        DatabaseEngine, MachineImage, PeerSource, Port, SecretName, ServicePrincipal,
        StorageBounds, SubnetGroup, SubnetTier,
    };
    use crate::errors::TopologyError;
    use crate::graph::ResourceKind;

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    fn network() -> Network {
        Network::new(name("vpc"), "10.0.0.0/16".parse().unwrap())
            .with_subnet_group(SubnetGroup::new(name("public"), SubnetTier::Public))
            .with_subnet_group(SubnetGroup::new(name("private"), SubnetTier::PrivateWithEgress))
    }

    fn database() -> DatabaseInstance {
        DatabaseInstance::new(
            name("database"),
            DatabaseEngine::postgres("15"),
            name("vpc"),
            SubnetTier::PrivateWithEgress,
            "t3.micro".parse().unwrap(),
            CredentialSource::FromSecret(name("rds-credentials")),
        )
        .with_security_group(name("db-sg"))
        .with_storage(StorageBounds::new(20, Some(100)))
    }

    fn descriptor() -> TopologyDescriptor {
        TopologyDescriptor::new(name("test-stack"), DeploymentContext::default())
            .with_network(network())
            .with_role(IamRole::new(name("bastion-role"), ServicePrincipal::ec2()))
            .with_security_group(SecurityGroup::new(name("bastion-sg"), name("vpc"), "bastion"))
            .with_security_group(
                SecurityGroup::new(name("db-sg"), name("vpc"), "database").with_ingress_rule(
                    PeerSource::SecurityGroup(name("bastion-sg")),
                    Port::tcp(5432),
                    "Allow bastion to reach the database",
                ),
            )
            .with_instance(
                ComputeInstance::new(
                    name("bastion"),
                    name("vpc"),
                    SubnetTier::Public,
                    "t2.nano".parse().unwrap(),
                    MachineImage::latest_amazon_linux(),
                )
                .with_role(name("bastion-role"))
                .with_security_group(name("bastion-sg")),
            )
            .with_secret(SecretReference::from_secret_name(
                name("rds-credentials"),
                SecretName::new("rds/admin").unwrap(),
            ))
    }

    fn validation_error(result: TopologyResult<ResourceGraph>) -> ValidationError {
        match result {
            Err(TopologyError::Validation(err)) => err,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_build_complete_topology() {
        let graph = descriptor().with_database(database()).build().unwrap();

        assert_eq!(graph.nodes_of_kind(ResourceKind::Subnet).count(), 4);
        assert_eq!(graph.nodes_of_kind(ResourceKind::DbSubnetGroup).count(), 1);

        let bastion_deps: Vec<&str> = graph
            .dependencies_of(&name("bastion"))
            .into_iter()
            .map(|n| n.as_str())
            .collect();
        assert_eq!(bastion_deps, vec!["bastion-role", "bastion-sg", "vpc-public-az1"]);

        let db_deps: Vec<&str> = graph
            .dependencies_of(&name("database"))
            .into_iter()
            .map(|n| n.as_str())
            .collect();
        assert_eq!(db_deps, vec!["database-subnets", "db-sg", "rds-credentials"]);

        let database_subnets = name("database-subnets");
        let spans: Vec<&str> = graph
            .edges_from(&database_subnets)
            .map(|e| e.to.as_str())
            .collect();
        assert_eq!(spans, vec!["vpc-private-az1", "vpc-private-az2"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = descriptor()
            .with_role(IamRole::new(name("bastion-sg"), ServicePrincipal::ec2()))
            .build();
        assert_eq!(
            validation_error(result),
            ValidationError::DuplicateName { name: name("bastion-sg") }
        );
    }

    #[test]
    fn test_derived_name_collision_rejected() {
        // A declared role named like a derived subnet
        let result = descriptor()
            .with_role(IamRole::new(name("vpc-public-az1"), ServicePrincipal::ec2()))
            .build();
        assert_eq!(
            validation_error(result),
            ValidationError::DuplicateName { name: name("vpc-public-az1") }
        );
    }

    #[test]
    fn test_undeclared_tier_rejected() {
        let public_only = Network::new(name("vpc"), "10.0.0.0/16".parse().unwrap())
            .with_subnet_group(SubnetGroup::new(name("public"), SubnetTier::Public));
        let result = TopologyDescriptor::new(name("test-stack"), DeploymentContext::default())
            .with_network(public_only)
            .with_security_group(SecurityGroup::new(name("db-sg"), name("vpc"), "database"))
            .with_secret(SecretReference::from_secret_name(
                name("rds-credentials"),
                SecretName::new("rds/admin").unwrap(),
            ))
            .with_database(database())
            .build();

        assert!(matches!(
            validation_error(result),
            ValidationError::UndeclaredSubnetTier { tier: SubnetTier::PrivateWithEgress, .. }
        ));
    }

    #[test]
    fn test_az_count_beyond_zone_letters_rejected() {
        let result = TopologyDescriptor::new(name("test-stack"), DeploymentContext::default())
            .with_network(network().with_max_azs(27))
            .build();
        assert_eq!(
            validation_error(result),
            ValidationError::TooManyAvailabilityZones {
                network: name("vpc"),
                max_azs: 27,
                limit: Network::AZ_LIMIT,
            }
        );

        let widest = TopologyDescriptor::new(name("test-stack"), DeploymentContext::default())
            .with_network(network().with_max_azs(Network::AZ_LIMIT))
            .build()
            .unwrap();
        let zones: BTreeSet<String> = widest
            .nodes_of_kind(ResourceKind::Subnet)
            .filter_map(|node| match &node.resource {
                Resource::Subnet(subnet) => Some(subnet.availability_zone.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(zones.len(), 26);
        assert!(zones.contains("us-east-1z"));
    }

    #[test]
    fn test_unknown_network_rejected() {
        let result = descriptor()
            .with_security_group(SecurityGroup::new(name("stray-sg"), name("other-vpc"), "stray"))
            .build();
        assert!(matches!(
            validation_error(result),
            ValidationError::UnknownNetwork { .. }
        ));
    }

    #[test]
    fn test_dangling_ingress_source_rejected() {
        let result = descriptor()
            .with_security_group(
                SecurityGroup::new(name("cache-sg"), name("vpc"), "cache").with_ingress_rule(
                    PeerSource::SecurityGroup(name("app-sg")),
                    Port::tcp(6379),
                    "from app",
                ),
            )
            .build();
        assert_eq!(
            validation_error(result),
            ValidationError::DanglingSecurityGroup {
                entity: name("cache-sg"),
                field: "ingress",
                referenced: name("app-sg"),
            }
        );
    }

    #[test]
    fn test_inline_credentials_rejected() {
        let mut db = database();
        db.credentials = CredentialSource::Inline {
            username: "admin".into(),
            password: "hunter2".into(),
        };
        let result = descriptor().with_database(db).build();
        assert_eq!(
            validation_error(result),
            ValidationError::InlineCredentials { entity: name("database") }
        );
    }

    #[test]
    fn test_inverted_storage_rejected() {
        let db = database().with_storage(StorageBounds::new(200, Some(100)));
        let result = descriptor().with_database(db).build();
        assert!(matches!(
            validation_error(result),
            ValidationError::StorageBoundsInverted { allocated: 200, max: 100, .. }
        ));
    }

    #[test]
    fn test_build_is_idempotent() {
        let descriptor = descriptor().with_database(database());
        let first = descriptor.build().unwrap();
        let second = descriptor.build().unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
