// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Descriptor Evaluation
//!
//! Evaluation must be deterministic, storage bounds must be accepted exactly
//! when they are ordered, and allocated subnets must tile the VPC without
//! overlap.

use cim_topology::domain::{Ipv4Cidr, LogicalName, Network, SubnetGroup, SubnetTier};
use cim_topology::{bastion_database_stack, render, TopologyConfig};
use proptest::prelude::*;
use std::net::Ipv4Addr;

use crate::fixtures::{config_with_storage, context};

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Stack configs that always validate
fn valid_config() -> impl Strategy<Value = TopologyConfig> {
    (2u8..=3, 0u8..=2, 20u8..=26, 20u32..=200, 0u32..=300).prop_map(
        |(max_azs, nat_gateways, cidr_mask, allocated, headroom)| {
            let mut config = config_with_storage(allocated, Some(allocated + headroom));
            config.network.max_azs = max_azs;
            config.network.nat_gateways = nat_gateways;
            config.network.cidr_mask = cidr_mask;
            config
        },
    )
}

/// Networks with 1-4 AZs and 1-3 subnet groups of mixed sizes
fn network() -> impl Strategy<Value = Network> {
    (
        0u8..=255,
        1u8..=4,
        prop::collection::vec((any::<bool>(), 18u8..=28), 1..=3),
    )
        .prop_map(|(second_octet, max_azs, groups)| {
            let cidr = Ipv4Cidr::new(Ipv4Addr::new(10, second_octet, 0, 0), 16)
                .expect("/16 with zero host bits");
            groups.into_iter().enumerate().fold(
                Network::new(LogicalName::new("vpc").expect("valid name"), cidr)
                    .with_max_azs(max_azs),
                |network, (i, (public, mask))| {
                    let tier = if public {
                        SubnetTier::Public
                    } else {
                        SubnetTier::PrivateWithEgress
                    };
                    let name = LogicalName::new(format!("group{}", i)).expect("valid name");
                    network.with_subnet_group(SubnetGroup::new(name, tier).with_cidr_mask(mask))
                },
            )
        })
}

fn range(cidr: &Ipv4Cidr) -> (u64, u64) {
    let start = u64::from(u32::from(cidr.address()));
    (start, start + cidr.size())
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Evaluation is deterministic
    ///
    /// The same configuration yields equal graphs and byte-identical plans.
    #[test]
    fn prop_evaluation_is_idempotent(config in valid_config()) {
        let descriptor = bastion_database_stack(context(), &config).unwrap();

        let first = descriptor.build().unwrap();
        let second = descriptor.build().unwrap();
        prop_assert_eq!(&first, &second);

        let first_plan = render(&first).unwrap().to_json_pretty().unwrap();
        let second_plan = render(&second).unwrap().to_json_pretty().unwrap();
        prop_assert_eq!(first_plan, second_plan);
    }

    /// Property: Storage bounds are accepted iff allocated ≤ max
    #[test]
    fn prop_storage_bounds(allocated in 20u32..=500, max in 20u32..=500) {
        let descriptor =
            bastion_database_stack(context(), &config_with_storage(allocated, Some(max))).unwrap();

        prop_assert_eq!(descriptor.build().is_ok(), allocated <= max);
    }

    /// Property: Allocated subnets stay inside the VPC, aligned and disjoint
    #[test]
    fn prop_subnets_tile_the_vpc(network in network()) {
        let subnets = match network.allocate_subnets("us-east-1") {
            Ok(subnets) => subnets,
            // Overflow is a legitimate outcome for oversized layouts
            Err(_) => return Ok(()),
        };

        let expected = network.subnet_groups.len() * usize::from(network.max_azs);
        prop_assert_eq!(subnets.len(), expected);

        for subnet in &subnets {
            prop_assert!(
                network.cidr.contains(&subnet.cidr),
                "{} outside {}",
                subnet.cidr,
                network.cidr
            );
            let (start, _) = range(&subnet.cidr);
            prop_assert_eq!(start % subnet.cidr.size(), 0, "{} is not aligned", subnet.cidr);
        }

        for (i, a) in subnets.iter().enumerate() {
            for b in &subnets[i + 1..] {
                let (a_start, a_end) = range(&a.cidr);
                let (b_start, b_end) = range(&b.cidr);
                prop_assert!(
                    a_end <= b_start || b_end <= a_start,
                    "{} overlaps {}",
                    a.cidr,
                    b.cidr
                );
            }
        }
    }
}
