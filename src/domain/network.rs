// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants
//!
//! An address space ([`Ipv4Cidr`]), subnet groups classified by tier, and the
//! deterministic carving of per-AZ subnets out of the address space.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

use super::LogicalName;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4)")]
    InvalidPrefixLength(u8),

    #[error("Host bits set in network address: {0}")]
    HostBitsSet(String),

    #[error("Subnet mask /{mask} is wider than the address space /{space}")]
    MaskWiderThanSpace { mask: u8, space: u8 },

    #[error("Subnets need {needed} addresses but the address space holds {available}")]
    AllocationOverflow { needed: u64, available: u64 },

    #[error("Invalid port range: {from}-{to}")]
    InvalidPortRange { from: u16, to: u16 },
}

/// IPv4 network in CIDR notation
///
/// Invariants:
/// - Prefix length 0-32
/// - Address is the network address (no host bits set)
///
/// # Examples
///
/// ```rust
/// use cim_topology::domain::Ipv4Cidr;
///
/// let cidr: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
/// assert_eq!(cidr.size(), 65536);
///
/// assert!("10.0.0.1/16".parse::<Ipv4Cidr>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    address: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Cidr {
    /// Every IPv4 address
    pub const ANY: Ipv4Cidr = Ipv4Cidr {
        address: Ipv4Addr::UNSPECIFIED,
        prefix_len: 0,
    };

    /// Default network address space
    pub const DEFAULT_VPC: Ipv4Cidr = Ipv4Cidr {
        address: Ipv4Addr::new(10, 0, 0, 0),
        prefix_len: 16,
    };

    /// Create a new network with validation
    ///
    /// # Invariants
    /// - Prefix length ≤ 32
    /// - No host bits set
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, NetworkError> {
        if prefix_len > 32 {
            return Err(NetworkError::InvalidPrefixLength(prefix_len));
        }

        if u32::from(address) & !Self::mask_bits(prefix_len) != 0 {
            return Err(NetworkError::HostBitsSet(format!("{}/{}", address, prefix_len)));
        }

        Ok(Self {
            address,
            prefix_len,
        })
    }

    fn mask_bits(prefix_len: u8) -> u32 {
        if prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix_len))
        }
    }

    /// Get the network address
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Get the prefix length
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Number of addresses in the network
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_len))
    }

    /// Check whether `other` lies entirely within this network
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix_len >= self.prefix_len
            && u32::from(other.address) & Self::mask_bits(self.prefix_len)
                == u32::from(self.address)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, prefix_str) = s
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(s.to_string()))?;

        let address = addr_str
            .parse::<Ipv4Addr>()
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_len = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(s.to_string()))?;

        Self::new(address, prefix_len)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(cidr: Ipv4Cidr) -> Self {
        cidr.to_string()
    }
}

/// Reachability class of a subnet group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubnetTier {
    /// Internet-routable
    Public,
    /// Outbound-only via a NAT gateway
    PrivateWithEgress,
}

impl SubnetTier {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::PrivateWithEgress => "private-with-egress",
        }
    }

    /// Check if instances in this tier get public addresses
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }
}

impl fmt::Display for SubnetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named group of subnets, one per availability zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetGroup {
    pub name: LogicalName,
    pub tier: SubnetTier,
    /// Prefix length of each subnet in the group
    pub cidr_mask: u8,
}

impl SubnetGroup {
    /// Default subnet size
    pub const DEFAULT_CIDR_MASK: u8 = 24;

    pub fn new(name: LogicalName, tier: SubnetTier) -> Self {
        Self {
            name,
            tier,
            cidr_mask: Self::DEFAULT_CIDR_MASK,
        }
    }

    pub fn with_cidr_mask(mut self, cidr_mask: u8) -> Self {
        self.cidr_mask = cidr_mask;
        self
    }
}

/// Availability zone name (`us-east-1a`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilityZone(String);

impl AvailabilityZone {
    /// Zone `index` (zero-based) of `region`
    ///
    /// `index` must be below [`Network::AZ_LIMIT`].
    pub fn for_region(region: &str, index: u8) -> Self {
        let letter = char::from(b'a' + index % Network::AZ_LIMIT);
        Self(format!("{}{}", region, letter))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AvailabilityZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A concrete subnet carved out of a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// Derived name: `<network>-<group>-az<n>`
    pub name: LogicalName,
    pub network: LogicalName,
    pub group: LogicalName,
    pub tier: SubnetTier,
    pub availability_zone: AvailabilityZone,
    pub cidr: Ipv4Cidr,
}

/// Network (VPC) declaration
///
/// # Invariants
/// - At least one availability zone
/// - At least one subnet group, group names unique
/// - Subnets of all groups fit inside the address space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub name: LogicalName,
    pub cidr: Ipv4Cidr,
    pub max_azs: u8,
    pub nat_gateways: u8,
    pub subnet_groups: Vec<SubnetGroup>,
}

impl Network {
    /// Default AZ count
    pub const DEFAULT_MAX_AZS: u8 = 2;

    /// Zones per region addressable by a single letter suffix
    pub const AZ_LIMIT: u8 = 26;

    /// Create a network with no subnet groups, two AZs and no NAT gateways
    pub fn new(name: LogicalName, cidr: Ipv4Cidr) -> Self {
        Self {
            name,
            cidr,
            max_azs: Self::DEFAULT_MAX_AZS,
            nat_gateways: 0,
            subnet_groups: Vec::new(),
        }
    }

    pub fn with_max_azs(mut self, max_azs: u8) -> Self {
        self.max_azs = max_azs;
        self
    }

    pub fn with_nat_gateways(mut self, nat_gateways: u8) -> Self {
        self.nat_gateways = nat_gateways;
        self
    }

    pub fn with_subnet_group(mut self, group: SubnetGroup) -> Self {
        self.subnet_groups.push(group);
        self
    }

    /// Check whether any subnet group has the given tier
    pub fn has_tier(&self, tier: SubnetTier) -> bool {
        self.subnet_groups.iter().any(|g| g.tier == tier)
    }

    /// First subnet group of the given tier
    pub fn group_for_tier(&self, tier: SubnetTier) -> Option<&SubnetGroup> {
        self.subnet_groups.iter().find(|g| g.tier == tier)
    }

    /// Private-with-egress subnets that have no NAT gateway to egress through
    ///
    /// NAT gateways live in public subnets, so a network without a public tier
    /// has no egress path whatever its NAT count.
    pub fn lacks_egress_path(&self) -> bool {
        (self.nat_gateways == 0 || !self.has_tier(SubnetTier::Public))
            && self.has_tier(SubnetTier::PrivateWithEgress)
    }

    /// Carve one subnet per AZ for every group, in declaration order
    ///
    /// Subnets are packed from the start of the address space; each subnet is
    /// aligned to its own size.
    pub fn allocate_subnets(&self, region: &str) -> Result<Vec<Subnet>, NetworkError> {
        let base = u64::from(u32::from(self.cidr.address()));
        let available = self.cidr.size();
        let mut cursor: u64 = 0;
        let mut subnets = Vec::new();

        for group in &self.subnet_groups {
            if group.cidr_mask > 32 {
                return Err(NetworkError::InvalidPrefixLength(group.cidr_mask));
            }
            if group.cidr_mask < self.cidr.prefix_len() {
                return Err(NetworkError::MaskWiderThanSpace {
                    mask: group.cidr_mask,
                    space: self.cidr.prefix_len(),
                });
            }

            let size = 1u64 << (32 - u32::from(group.cidr_mask));
            for az in 0..self.max_azs {
                cursor = cursor.div_ceil(size) * size;
                if cursor + size > available {
                    return Err(NetworkError::AllocationOverflow {
                        needed: cursor + size,
                        available,
                    });
                }

                // base + cursor stays within the u32 address space
                let address = Ipv4Addr::from((base + cursor) as u32);
                subnets.push(Subnet {
                    name: self
                        .name
                        .derived(&format!("{}-az{}", group.name, az + 1)),
                    network: self.name.clone(),
                    group: group.name.clone(),
                    tier: group.tier,
                    availability_zone: AvailabilityZone::for_region(region, az),
                    cidr: Ipv4Cidr::new(address, group.cidr_mask)?,
                });
                cursor += size;
            }
        }

        Ok(subnets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    fn two_tier_network() -> Network {
        Network::new(name("vpc"), "10.0.0.0/16".parse().unwrap())
            .with_subnet_group(SubnetGroup::new(name("public"), SubnetTier::Public))
            .with_subnet_group(SubnetGroup::new(
                name("private"),
                SubnetTier::PrivateWithEgress,
            ))
    }

    #[test]
    fn test_cidr_parse() {
        let cidr: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        assert_eq!(cidr.address(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(cidr.prefix_len(), 16);
        assert_eq!(cidr.to_string(), "10.0.0.0/16");
    }

    #[test]
    fn test_invalid_cidr() {
        assert!(matches!(
            "10.0.0.0".parse::<Ipv4Cidr>(),
            Err(NetworkError::InvalidCidr(_))
        ));
        assert!(matches!(
            "999.0.0.0/8".parse::<Ipv4Cidr>(),
            Err(NetworkError::InvalidIpAddress(_))
        ));
        assert_eq!(
            "10.0.0.0/33".parse::<Ipv4Cidr>(),
            Err(NetworkError::InvalidPrefixLength(33))
        );
        assert!(matches!(
            "10.0.1.0/16".parse::<Ipv4Cidr>(),
            Err(NetworkError::HostBitsSet(_))
        ));
    }

    #[test]
    fn test_any_and_contains() {
        let vpc: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        let subnet: Ipv4Cidr = "10.0.3.0/24".parse().unwrap();
        let outside: Ipv4Cidr = "10.1.0.0/24".parse().unwrap();

        assert!(vpc.contains(&subnet));
        assert!(!vpc.contains(&outside));
        assert!(!subnet.contains(&vpc));
        assert!(Ipv4Cidr::ANY.contains(&vpc));
        assert_eq!(Ipv4Cidr::ANY.to_string(), "0.0.0.0/0");
    }

    #[test]
    fn test_default_two_tier_allocation() {
        let subnets = two_tier_network().allocate_subnets("us-east-1").unwrap();
        let layout: Vec<(String, String, String)> = subnets
            .iter()
            .map(|s| {
                (
                    s.name.to_string(),
                    s.availability_zone.to_string(),
                    s.cidr.to_string(),
                )
            })
            .collect();

        assert_eq!(
            layout,
            vec![
                ("vpc-public-az1".into(), "us-east-1a".into(), "10.0.0.0/24".into()),
                ("vpc-public-az2".into(), "us-east-1b".into(), "10.0.1.0/24".into()),
                ("vpc-private-az1".into(), "us-east-1a".into(), "10.0.2.0/24".into()),
                ("vpc-private-az2".into(), "us-east-1b".into(), "10.0.3.0/24".into()),
            ]
        );
    }

    #[test]
    fn test_allocation_aligns_mixed_masks() {
        let network = Network::new(name("vpc"), "10.0.0.0/16".parse().unwrap())
            .with_max_azs(1)
            .with_subnet_group(
                SubnetGroup::new(name("small"), SubnetTier::Public).with_cidr_mask(26),
            )
            .with_subnet_group(
                SubnetGroup::new(name("large"), SubnetTier::PrivateWithEgress)
                    .with_cidr_mask(24),
            );

        let subnets = network.allocate_subnets("eu-west-1").unwrap();
        assert_eq!(subnets[0].cidr.to_string(), "10.0.0.0/26");
        assert_eq!(subnets[1].cidr.to_string(), "10.0.1.0/24");
    }

    #[test]
    fn test_allocation_overflow() {
        let network = Network::new(name("vpc"), "10.0.0.0/23".parse().unwrap())
            .with_subnet_group(SubnetGroup::new(name("public"), SubnetTier::Public))
            .with_subnet_group(SubnetGroup::new(
                name("private"),
                SubnetTier::PrivateWithEgress,
            ));

        assert_eq!(
            network.allocate_subnets("us-east-1"),
            Err(NetworkError::AllocationOverflow {
                needed: 768,
                available: 512
            })
        );
    }

    #[test]
    fn test_mask_wider_than_space() {
        let network = Network::new(name("vpc"), "10.0.0.0/24".parse().unwrap())
            .with_subnet_group(
                SubnetGroup::new(name("public"), SubnetTier::Public).with_cidr_mask(16),
            );

        assert_eq!(
            network.allocate_subnets("us-east-1"),
            Err(NetworkError::MaskWiderThanSpace {
                mask: 16,
                space: 24
            })
        );
    }

    #[test]
    fn test_tier_lookup() {
        let network = two_tier_network();
        assert!(network.has_tier(SubnetTier::Public));
        assert_eq!(
            network
                .group_for_tier(SubnetTier::PrivateWithEgress)
                .map(|g| g.name.as_str()),
            Some("private")
        );
        assert!(network.lacks_egress_path());
        assert!(!network.with_nat_gateways(1).lacks_egress_path());
    }

    #[test]
    fn test_availability_zone_names() {
        assert_eq!(AvailabilityZone::for_region("ap-northeast-1", 0).as_str(), "ap-northeast-1a");
        assert_eq!(AvailabilityZone::for_region("ap-northeast-1", 2).as_str(), "ap-northeast-1c");
    }
}
