// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Descriptor Invariants
//!
//! Every rule a topology descriptor must satisfy before it is handed to the
//! provisioning engine. All functions are pure: no I/O, and the same inputs
//! always give the same verdict. Only [`validate_unique_name`] writes, to the
//! name set it is handed.
//!
//! # Invariant Categories
//!
//! 1. **Structural**: names, AZ counts, subnet groups
//! 2. **Referential**: every cross-reference resolves inside the descriptor
//! 3. **Numeric**: storage bounds
//! 4. **Policy**: credentials come from the secret store, placement rules
//!
//! Each error names the offending entity and, where there is one, the field.

use std::collections::{BTreeMap, BTreeSet};

use super::{
    CredentialSource, DatabaseInstance, IamRole, LogicalName, Network, NetworkError, PeerSource,
    Port, SecurityGroup, StorageBounds, SubnetTier,
};

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Two entities share a logical name
    #[error("Duplicate logical name: {name}")]
    DuplicateName { name: LogicalName },

    /// Network has no availability zones
    #[error("Network {network}: max_azs must be at least 1")]
    NoAvailabilityZones { network: LogicalName },

    /// Network asks for more AZs than a region can name
    #[error("{network}.max_azs: {max_azs} exceeds the limit of {limit} availability zones")]
    TooManyAvailabilityZones {
        network: LogicalName,
        max_azs: u8,
        limit: u8,
    },

    /// Network has no subnet groups
    #[error("Network {network}: subnet_groups must not be empty")]
    NoSubnetGroups { network: LogicalName },

    /// Two subnet groups of one network share a name
    #[error("Network {network}: duplicate subnet group {group}")]
    DuplicateSubnetGroup {
        network: LogicalName,
        group: LogicalName,
    },

    /// Subnets cannot be carved out of the address space
    #[error("Network {network}: subnet allocation failed: {reason}")]
    SubnetAllocation {
        network: LogicalName,
        reason: NetworkError,
    },

    /// Entity references a network that is not declared
    #[error("{entity}.network references undeclared network {network}")]
    UnknownNetwork {
        entity: LogicalName,
        network: LogicalName,
    },

    /// Entity is placed in a tier the network has no subnet group for
    #[error("{entity}.subnet_tier: network {network} declares no {tier} subnet group")]
    UndeclaredSubnetTier {
        entity: LogicalName,
        network: LogicalName,
        tier: SubnetTier,
    },

    /// Reference to a security group that is not declared
    #[error("{entity}.{field} references undeclared security group {referenced}")]
    DanglingSecurityGroup {
        entity: LogicalName,
        field: &'static str,
        referenced: LogicalName,
    },

    /// Two ingress rules admit the same peer on the same port
    #[error("{entity}.ingress: duplicate rule for {peer} on {port}")]
    DuplicateIngressRule {
        entity: LogicalName,
        peer: PeerSource,
        port: Port,
    },

    /// Attached security group lives in a different network
    #[error(
        "{entity}.security_groups: {group} belongs to network {group_network}, not {network}"
    )]
    SecurityGroupNetworkMismatch {
        entity: LogicalName,
        group: LogicalName,
        group_network: LogicalName,
        network: LogicalName,
    },

    /// Instance or database has no security group attached
    #[error("{entity}.security_groups must not be empty")]
    NoSecurityGroups { entity: LogicalName },

    /// Instance references a role that is not declared
    #[error("{entity}.role references undeclared IAM role {role}")]
    UnknownRole {
        entity: LogicalName,
        role: LogicalName,
    },

    /// Role without a trust principal
    #[error("{role}.assumed_by: trust principal must not be empty")]
    EmptyTrustPrincipal { role: LogicalName },

    /// Database credentials given as a literal
    #[error(
        "{entity}.credentials: inline credentials are not allowed, use a secret reference"
    )]
    InlineCredentials { entity: LogicalName },

    /// Database credentials reference a secret that is not declared
    #[error("{entity}.credentials references undeclared secret {secret}")]
    UnknownSecret {
        entity: LogicalName,
        secret: LogicalName,
    },

    /// Allocated storage below the managed-database minimum
    #[error(
        "{entity}.storage.allocated_gib: {allocated} GiB is below the minimum of {minimum} GiB"
    )]
    StorageBelowMinimum {
        entity: LogicalName,
        allocated: u32,
        minimum: u32,
    },

    /// Allocated storage above the autoscaling ceiling
    #[error("{entity}.storage: allocated_gib ({allocated}) exceeds max_allocated_gib ({max})")]
    StorageBoundsInverted {
        entity: LogicalName,
        allocated: u32,
        max: u32,
    },

    /// Database placed in a network with too few AZs
    #[error(
        "{entity}.network: a database needs subnets in at least {required} AZs, \
         {network} spans {available}"
    )]
    InsufficientAvailabilityZones {
        entity: LogicalName,
        network: LogicalName,
        required: u8,
        available: u8,
    },

    /// Publicly accessible database outside the public tier
    #[error(
        "{entity}.publicly_accessible: a public database must be placed in the public tier, \
         not {tier}"
    )]
    PublicDatabaseInPrivateTier {
        entity: LogicalName,
        tier: SubnetTier,
    },
}

/// Availability zones a database subnet group must span
pub const MIN_DATABASE_AZS: u8 = 2;

/// Validate a name has not been declared yet, recording it if not
///
/// # Rules
/// - Logical names are unique across every entity kind
pub fn validate_unique_name(
    name: &LogicalName,
    seen: &mut BTreeSet<LogicalName>,
) -> ValidationResult {
    if !seen.insert(name.clone()) {
        return Err(ValidationError::DuplicateName { name: name.clone() });
    }
    Ok(())
}

/// Validate the structure of a network
///
/// # Rules
/// - AZ count ≥ 1 and ≤ [`Network::AZ_LIMIT`]
/// - At least one subnet group
/// - Subnet group names unique within the network
/// - Subnets fit in the address space
pub fn validate_network(network: &Network, region: &str) -> ValidationResult {
    if network.max_azs == 0 {
        return Err(ValidationError::NoAvailabilityZones {
            network: network.name.clone(),
        });
    }

    if network.max_azs > Network::AZ_LIMIT {
        return Err(ValidationError::TooManyAvailabilityZones {
            network: network.name.clone(),
            max_azs: network.max_azs,
            limit: Network::AZ_LIMIT,
        });
    }

    if network.subnet_groups.is_empty() {
        return Err(ValidationError::NoSubnetGroups {
            network: network.name.clone(),
        });
    }

    let mut groups = BTreeSet::new();
    for group in &network.subnet_groups {
        if !groups.insert(&group.name) {
            return Err(ValidationError::DuplicateSubnetGroup {
                network: network.name.clone(),
                group: group.name.clone(),
            });
        }
    }

    network
        .allocate_subnets(region)
        .map_err(|reason| ValidationError::SubnetAllocation {
            network: network.name.clone(),
            reason,
        })?;

    Ok(())
}

/// Validate an entity's network reference, returning the network
pub fn validate_network_reference<'a>(
    entity: &LogicalName,
    network: &LogicalName,
    networks: &'a BTreeMap<LogicalName, Network>,
) -> Result<&'a Network, ValidationError> {
    networks
        .get(network)
        .ok_or_else(|| ValidationError::UnknownNetwork {
            entity: entity.clone(),
            network: network.clone(),
        })
}

/// Validate an entity is placed in a tier its network declares
///
/// # Rules
/// - The network has at least one subnet group of `tier`
pub fn validate_subnet_tier(
    entity: &LogicalName,
    network: &Network,
    tier: SubnetTier,
) -> ValidationResult {
    if !network.has_tier(tier) {
        return Err(ValidationError::UndeclaredSubnetTier {
            entity: entity.clone(),
            network: network.name.clone(),
            tier,
        });
    }
    Ok(())
}

/// Validate the ingress rules of a group
///
/// # Rules
/// - Each source group is declared in the same descriptor
/// - No two rules share a peer and port
/// - CIDR sources are well-formed by construction
pub fn validate_ingress_sources(
    group: &SecurityGroup,
    declared: &BTreeMap<LogicalName, SecurityGroup>,
) -> ValidationResult {
    let mut seen: Vec<(&PeerSource, &Port)> = Vec::with_capacity(group.ingress.len());
    for rule in &group.ingress {
        let key = (&rule.source, &rule.port);
        if seen.contains(&key) {
            return Err(ValidationError::DuplicateIngressRule {
                entity: group.name.clone(),
                peer: rule.source.clone(),
                port: rule.port,
            });
        }
        seen.push(key);
    }

    for source in group.referenced_groups() {
        if !declared.contains_key(source) {
            return Err(ValidationError::DanglingSecurityGroup {
                entity: group.name.clone(),
                field: "ingress",
                referenced: source.clone(),
            });
        }
    }
    Ok(())
}

/// Validate the security groups attached to an instance or database
///
/// # Rules
/// - At least one group attached
/// - Every group declared
/// - Every group belongs to the entity's network
pub fn validate_attached_security_groups(
    entity: &LogicalName,
    network: &LogicalName,
    attached: &[LogicalName],
    declared: &BTreeMap<LogicalName, SecurityGroup>,
) -> ValidationResult {
    if attached.is_empty() {
        return Err(ValidationError::NoSecurityGroups {
            entity: entity.clone(),
        });
    }

    for name in attached {
        let group = declared
            .get(name)
            .ok_or_else(|| ValidationError::DanglingSecurityGroup {
                entity: entity.clone(),
                field: "security_groups",
                referenced: name.clone(),
            })?;

        if &group.network != network {
            return Err(ValidationError::SecurityGroupNetworkMismatch {
                entity: entity.clone(),
                group: name.clone(),
                group_network: group.network.clone(),
                network: network.clone(),
            });
        }
    }
    Ok(())
}

/// Validate an instance's role reference
pub fn validate_role_reference(
    entity: &LogicalName,
    role: Option<&LogicalName>,
    declared: &BTreeMap<LogicalName, IamRole>,
) -> ValidationResult {
    match role {
        Some(role) if !declared.contains_key(role) => Err(ValidationError::UnknownRole {
            entity: entity.clone(),
            role: role.clone(),
        }),
        _ => Ok(()),
    }
}

/// Validate a role can be assumed by someone
pub fn validate_trust_principal(role: &IamRole) -> ValidationResult {
    if role.assumed_by.is_empty() {
        return Err(ValidationError::EmptyTrustPrincipal {
            role: role.name.clone(),
        });
    }
    Ok(())
}

/// Validate database credentials
///
/// # Rules
/// - Never an inline literal
/// - The referenced secret is declared
pub fn validate_credentials(
    database: &DatabaseInstance,
    secrets: &BTreeSet<LogicalName>,
) -> ValidationResult {
    match &database.credentials {
        CredentialSource::Inline { .. } => Err(ValidationError::InlineCredentials {
            entity: database.name.clone(),
        }),
        CredentialSource::FromSecret(secret) if !secrets.contains(secret) => {
            Err(ValidationError::UnknownSecret {
                entity: database.name.clone(),
                secret: secret.clone(),
            })
        }
        CredentialSource::FromSecret(_) => Ok(()),
    }
}

/// Validate storage bounds
///
/// # Rules
/// - allocated ≥ 20 GiB
/// - allocated ≤ max, when a max is set
pub fn validate_storage_bounds(
    entity: &LogicalName,
    storage: &StorageBounds,
) -> ValidationResult {
    if storage.allocated_gib < StorageBounds::MIN_ALLOCATED_GIB {
        return Err(ValidationError::StorageBelowMinimum {
            entity: entity.clone(),
            allocated: storage.allocated_gib,
            minimum: StorageBounds::MIN_ALLOCATED_GIB,
        });
    }

    if let Some(max) = storage.max_allocated_gib {
        if storage.allocated_gib > max {
            return Err(ValidationError::StorageBoundsInverted {
                entity: entity.clone(),
                allocated: storage.allocated_gib,
                max,
            });
        }
    }
    Ok(())
}

/// Validate database placement
///
/// # Rules
/// - The network spans at least [`MIN_DATABASE_AZS`] AZs
/// - A publicly accessible database sits in the public tier
pub fn validate_database_placement(
    database: &DatabaseInstance,
    network: &Network,
) -> ValidationResult {
    if network.max_azs < MIN_DATABASE_AZS {
        return Err(ValidationError::InsufficientAvailabilityZones {
            entity: database.name.clone(),
            network: network.name.clone(),
            required: MIN_DATABASE_AZS,
            available: network.max_azs,
        });
    }

    if database.publicly_accessible && !database.subnet_tier.is_public() {
        return Err(ValidationError::PublicDatabaseInPrivateTier {
            entity: database.name.clone(),
            tier: database.subnet_tier,
        });
    }
    Ok(())
}
