// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Domain Models
//!
//! Entities and value objects a topology descriptor is made of. Everything
//! here is plain, immutable data validated on construction; cross-entity
//! rules live in [`invariants`] and run when a descriptor is built.
//!
//! # Value Objects with Invariants
//!
//! - [`LogicalName`] - entity identity within a descriptor
//! - [`Ipv4Cidr`] - network-aligned IPv4 blocks
//! - [`Port`] - protocol and port range
//! - [`InstanceType`] - `<class>.<size>` size classes
//! - [`SecretName`] - paths into the external secret store
//!
//! # Entities
//!
//! - [`Network`] with its [`SubnetGroup`]s
//! - [`SecurityGroup`] with ordered [`IngressRule`]s
//! - [`IamRole`]
//! - [`SecretReference`]
//! - [`ComputeInstance`]
//! - [`DatabaseInstance`]

pub mod compute;
pub mod database;
pub mod iam;
pub mod invariants;
pub mod names;
pub mod network;
pub mod secret;
pub mod security;

pub use compute::{
    AmazonLinuxGeneration, ComputeInstance, InstanceType, InstanceTypeError, MachineImage,
};
pub use database::{DatabaseEngine, DatabaseInstance, EngineKind, StorageBounds};
pub use iam::{IamRole, ManagedPolicyRef, ServicePrincipal};
pub use invariants::{ValidationError, ValidationResult};
pub use names::{LogicalName, NameError, NodeId};
pub use network::{
    AvailabilityZone, Ipv4Cidr, Network, NetworkError, Subnet, SubnetGroup, SubnetTier,
};
pub use secret::{CredentialSource, SecretError, SecretName, SecretReference};
pub use security::{EgressPolicy, IngressRule, PeerSource, Port, Protocol, SecurityGroup};
