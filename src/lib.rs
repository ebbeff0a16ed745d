// Copyright (c) 2025 - Cowboy AI, Inc.
//! Declarative cloud topology for the Composable Information Machine
//!
//! Describes a VPC, a bastion host, a managed database and the security-group
//! and IAM glue between them as typed, validated data. A validated descriptor
//! is rendered into a plan document and handed to an external provisioning
//! engine; nothing here talks to a cloud API.
//!
//! ```rust,no_run
//! use cim_topology::{
//!     bastion_database_stack, synthesize, DeploymentContext, JsonPlanWriter, TopologyConfig,
//! };
//!
//! # fn main() -> Result<(), cim_topology::TopologyError> {
//! let descriptor =
//!     bastion_database_stack(DeploymentContext::from_env()?, &TopologyConfig::default())?;
//! let mut engine = JsonPlanWriter::new(std::io::stdout());
//! synthesize(&descriptor, &mut engine)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod descriptor;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod plan;
pub mod stack;

// Re-export commonly used types
pub use config::{DeploymentContext, TopologyConfig};
pub use descriptor::TopologyDescriptor;
pub use engine::{synthesize, synthesize_to_file, JsonPlanWriter, ProvisioningEngine};
pub use errors::{TopologyError, TopologyResult};
pub use graph::{Edge, EdgeKind, Resource, ResourceGraph, ResourceKind, ResourceNode};
pub use plan::{render, PlanDocument, PlanResource};
pub use stack::bastion_database_stack;
