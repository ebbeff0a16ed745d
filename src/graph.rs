// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Graph
//!
//! The validated output of a topology descriptor: named nodes plus typed
//! edges. Nodes are kept in a `BTreeMap` and edges in a `BTreeSet`, so two
//! evaluations of the same descriptor produce graphs that compare equal and
//! serialize identically.
//!
//! # Edge Semantics
//!
//! ```text
//! Owns               network ──▶ subnet, network ──▶ security group
//! PlacedIn           instance ──▶ subnet, database ──▶ db subnet group
//! Spans              db subnet group ──▶ subnet
//! AttachedTo         instance/database ──▶ security group
//! AssumesRole        instance ──▶ role
//! UsesCredential     database ──▶ secret
//! AllowsIngressFrom  security group ──▶ source security group
//! ```
//!
//! For `Owns` the target depends on the source; for every other kind the
//! source depends on the target.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::config::DeploymentContext;
use crate::domain::{
    ComputeInstance, DatabaseInstance, IamRole, IngressRule, LogicalName, Network, NodeId,
    SecretReference, SecurityGroup, Subnet,
};

/// Kind of a node, for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    Subnet,
    SecurityGroup,
    IamRole,
    ComputeInstance,
    Secret,
    DbSubnetGroup,
    DatabaseInstance,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Subnet => "subnet",
            Self::SecurityGroup => "security_group",
            Self::IamRole => "iam_role",
            Self::ComputeInstance => "compute_instance",
            Self::Secret => "secret",
            Self::DbSubnetGroup => "db_subnet_group",
            Self::DatabaseInstance => "database_instance",
        };
        write!(f, "{}", name)
    }
}

/// Payload of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Network(Network),
    Subnet(Subnet),
    SecurityGroup(SecurityGroup),
    IamRole(IamRole),
    ComputeInstance(ComputeInstance),
    Secret(SecretReference),
    /// Subnets a database may be placed in, one per AZ
    DbSubnetGroup { subnets: Vec<LogicalName> },
    DatabaseInstance(DatabaseInstance),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Network(_) => ResourceKind::Network,
            Self::Subnet(_) => ResourceKind::Subnet,
            Self::SecurityGroup(_) => ResourceKind::SecurityGroup,
            Self::IamRole(_) => ResourceKind::IamRole,
            Self::ComputeInstance(_) => ResourceKind::ComputeInstance,
            Self::Secret(_) => ResourceKind::Secret,
            Self::DbSubnetGroup { .. } => ResourceKind::DbSubnetGroup,
            Self::DatabaseInstance(_) => ResourceKind::DatabaseInstance,
        }
    }

    /// Check whether the node lives outside the graph and is only referenced
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Secret(_))
    }
}

/// A named node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNode {
    pub id: NodeId,
    pub name: LogicalName,
    pub resource: Resource,
}

impl ResourceNode {
    pub fn kind(&self) -> ResourceKind {
        self.resource.kind()
    }
}

/// Relationship between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Owns,
    PlacedIn,
    Spans,
    AttachedTo,
    AssumesRole,
    UsesCredential,
    AllowsIngressFrom,
}

/// Typed, directed edge
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    pub from: LogicalName,
    pub to: LogicalName,
    pub kind: EdgeKind,
}

impl Edge {
    /// The `(dependent, dependency)` pair this edge implies
    pub fn dependency(&self) -> (&LogicalName, &LogicalName) {
        match self.kind {
            EdgeKind::Owns => (&self.to, &self.from),
            _ => (&self.from, &self.to),
        }
    }
}

/// Validated resource graph handed to the provisioning engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceGraph {
    stack: LogicalName,
    context: DeploymentContext,
    nodes: BTreeMap<LogicalName, ResourceNode>,
    edges: BTreeSet<Edge>,
}

impl ResourceGraph {
    pub(crate) fn new(stack: LogicalName, context: DeploymentContext) -> Self {
        Self {
            stack,
            context,
            nodes: BTreeMap::new(),
            edges: BTreeSet::new(),
        }
    }

    /// Insert a node, returning `false` if the name is already taken
    pub(crate) fn insert(&mut self, name: LogicalName, resource: Resource) -> bool {
        if self.nodes.contains_key(&name) {
            return false;
        }
        let id = NodeId::derive(&self.stack, &name);
        self.nodes.insert(name.clone(), ResourceNode { id, name, resource });
        true
    }

    pub(crate) fn connect(&mut self, from: &LogicalName, to: &LogicalName, kind: EdgeKind) {
        self.edges.insert(Edge {
            from: from.clone(),
            to: to.clone(),
            kind,
        });
    }

    pub fn stack(&self) -> &LogicalName {
        &self.stack
    }

    pub fn context(&self) -> &DeploymentContext {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by name
    pub fn node(&self, name: &LogicalName) -> Option<&ResourceNode> {
        self.nodes.get(name)
    }

    /// All nodes, in name order
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    /// Nodes of one kind, in name order
    pub fn nodes_of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values().filter(move |node| node.kind() == kind)
    }

    /// All edges, ordered
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Outgoing edges of a node
    pub fn edges_from<'a>(&'a self, name: &'a LogicalName) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |edge| &edge.from == name)
    }

    /// Names of the nodes `name` directly depends on
    pub fn dependencies_of(&self, name: &LogicalName) -> BTreeSet<&LogicalName> {
        self.edges
            .iter()
            .map(Edge::dependency)
            .filter(|(dependent, _)| *dependent == name)
            .map(|(_, dependency)| dependency)
            .collect()
    }

    /// Ingress rules declared on a security group
    pub fn ingress_rules_of(&self, group: &LogicalName) -> Option<&[IngressRule]> {
        match &self.nodes.get(group)?.resource {
            Resource::SecurityGroup(sg) => Some(&sg.ingress),
            _ => None,
        }
    }
}
