// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Groups and Ingress Rules
//!
//! A security group belongs to one network, carries a default egress policy
//! and an ordered list of ingress rules. Rule sources are either another
//! declared security group (scoped ingress) or a CIDR block.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Ipv4Cidr, LogicalName, NetworkError};

/// IP protocol of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    /// Every protocol
    All,
}

impl Protocol {
    /// Protocol identifier as used by the control plane (`-1` for all)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Icmp => "icmp",
            Self::All => "-1",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
            Self::Icmp => write!(f, "ICMP"),
            Self::All => write!(f, "ALL"),
        }
    }
}

/// Protocol plus an optional inclusive port range
///
/// # Examples
///
/// ```rust
/// use cim_topology::domain::{Port, Protocol};
///
/// let postgres = Port::tcp(5432);
/// assert_eq!(postgres.protocol(), Protocol::Tcp);
/// assert_eq!(postgres.to_string(), "TCP 5432");
///
/// assert!(Port::tcp_range(9000, 8000).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    protocol: Protocol,
    #[serde(skip_serializing_if = "Option::is_none")]
    from_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to_port: Option<u16>,
}

impl Port {
    /// A single TCP port
    pub fn tcp(port: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            from_port: Some(port),
            to_port: Some(port),
        }
    }

    /// An inclusive TCP port range
    pub fn tcp_range(from: u16, to: u16) -> Result<Self, NetworkError> {
        if from > to {
            return Err(NetworkError::InvalidPortRange { from, to });
        }
        Ok(Self {
            protocol: Protocol::Tcp,
            from_port: Some(from),
            to_port: Some(to),
        })
    }

    /// A single UDP port
    pub fn udp(port: u16) -> Self {
        Self {
            protocol: Protocol::Udp,
            from_port: Some(port),
            to_port: Some(port),
        }
    }

    /// Every ICMP type
    pub fn all_icmp() -> Self {
        Self {
            protocol: Protocol::Icmp,
            from_port: None,
            to_port: None,
        }
    }

    /// Every protocol and port
    pub fn all_traffic() -> Self {
        Self {
            protocol: Protocol::All,
            from_port: None,
            to_port: None,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn from_port(&self) -> Option<u16> {
        self.from_port
    }

    pub fn to_port(&self) -> Option<u16> {
        self.to_port
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.protocol, self.from_port, self.to_port) {
            (Protocol::All, _, _) => write!(f, "ALL TRAFFIC"),
            (protocol, Some(from), Some(to)) if from == to => write!(f, "{} {}", protocol, from),
            (protocol, Some(from), Some(to)) => write!(f, "{} {}-{}", protocol, from, to),
            (protocol, _, _) => write!(f, "ALL {}", protocol),
        }
    }
}

/// Source of an ingress rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerSource {
    /// Another security group declared in the same descriptor
    SecurityGroup(LogicalName),
    /// A CIDR block
    Cidr(Ipv4Cidr),
}

impl fmt::Display for PeerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SecurityGroup(name) => write!(f, "security group {}", name),
            Self::Cidr(cidr) => write!(f, "{}", cidr),
        }
    }
}

/// Inbound allow rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngressRule {
    pub source: PeerSource,
    pub port: Port,
    pub description: String,
}

/// Default outbound policy of a security group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EgressPolicy {
    /// All outbound traffic to anywhere
    AllowAll,
    /// No outbound traffic
    DenyAll,
}

/// Security group declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub name: LogicalName,
    pub network: LogicalName,
    pub description: String,
    pub egress: EgressPolicy,
    pub ingress: Vec<IngressRule>,
}

impl SecurityGroup {
    /// Create a security group that allows all outbound traffic
    pub fn new(name: LogicalName, network: LogicalName, description: impl Into<String>) -> Self {
        Self {
            name,
            network,
            description: description.into(),
            egress: EgressPolicy::AllowAll,
            ingress: Vec::new(),
        }
    }

    pub fn allow_all_outbound(mut self, allow: bool) -> Self {
        self.egress = if allow {
            EgressPolicy::AllowAll
        } else {
            EgressPolicy::DenyAll
        };
        self
    }

    /// Append an ingress rule; rule order is preserved
    pub fn with_ingress_rule(
        mut self,
        source: PeerSource,
        port: Port,
        description: impl Into<String>,
    ) -> Self {
        self.ingress.push(IngressRule {
            source,
            port,
            description: description.into(),
        });
        self
    }

    /// Security groups named as ingress sources
    pub fn referenced_groups(&self) -> impl Iterator<Item = &LogicalName> {
        self.ingress.iter().filter_map(|rule| match &rule.source {
            PeerSource::SecurityGroup(name) => Some(name),
            PeerSource::Cidr(_) => None,
        })
    }
}
