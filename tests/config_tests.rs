// Copyright (c) 2025 - Cowboy AI, Inc.
//! Configuration Tests
//!
//! JSON overrides flow through to the declared stack and rendered plan.

mod fixtures;

use anyhow::Result;
use cim_topology::domain::{EngineKind, Port};
use cim_topology::{
    bastion_database_stack, render, DeploymentContext, TopologyConfig, TopologyError,
};
use fixtures::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_partial_override_keeps_defaults() -> Result<()> {
    let config = TopologyConfig::from_json(
        r#"{
            "stack_name": "staging-stack",
            "network": { "nat_gateways": 2 },
            "database": { "deletion_protection": true, "max_allocated_storage_gib": 50 }
        }"#,
    )?;

    assert_eq!(config.stack_name.as_str(), "staging-stack");
    assert_eq!(config.network.nat_gateways, 2);
    assert_eq!(config.network.max_azs, 2);
    assert_eq!(config.database.allocated_storage_gib, 20);
    assert_eq!(config.database.engine.kind, EngineKind::Postgres);

    let plan = render(&bastion_database_stack(context(), &config)?.build()?)?;
    let db = plan.resource("Database").expect("database rendered");
    assert_eq!(db.properties["DeletionProtection"], json!(true));
    assert_eq!(db.properties["MaxAllocatedStorage"], json!(50));
    assert_eq!(plan.resources_of_type("AWS::EC2::NatGateway").count(), 2);
    Ok(())
}

#[test]
fn test_custom_port_scopes_ingress() -> Result<()> {
    let config = TopologyConfig::from_json(r#"{ "database": { "port": 6543 } }"#)?;
    let graph = bastion_database_stack(context(), &config)?.build()?;

    let rules = graph.ingress_rules_of(&name("db-sg")).expect("db-sg declared");
    assert_eq!(rules[0].port, Port::tcp(6543));
    Ok(())
}

#[test]
fn test_malformed_values_are_configuration_errors() {
    for json in [
        r#"{ "network": { "cidr": "10.0.0.1/16" } }"#,
        r#"{ "bastion": { "instance_type": "nano" } }"#,
        r#"{ "stack_name": "Infra_Stack" }"#,
        r#"{ "secret": { "secret_name": "rds admin" } }"#,
    ] {
        assert!(
            matches!(TopologyConfig::from_json(json), Err(TopologyError::Configuration(_))),
            "accepted {}",
            json
        );
    }
}

#[test]
fn test_missing_config_file() {
    let err = TopologyConfig::from_file("/nonexistent/topology.json").unwrap_err();
    assert!(matches!(err, TopologyError::Configuration(_)));
    assert!(err.to_string().contains("/nonexistent/topology.json"));
}

#[test]
fn test_context_from_lookup_overrides_region() -> Result<()> {
    let context = DeploymentContext::from_lookup(|key| match key {
        "TOPOLOGY_REGION" => Some("eu-west-1".to_string()),
        "CDK_DEFAULT_REGION" => Some("us-west-2".to_string()),
        "CDK_DEFAULT_ACCOUNT" => Some(ACCOUNT.to_string()),
        _ => None,
    })?;
    assert_eq!(context.region, "eu-west-1");
    assert_eq!(context.account.as_deref(), Some(ACCOUNT));

    let graph = bastion_database_stack(context, &TopologyConfig::default())?.build()?;
    let plan = render(&graph)?;
    let subnet = plan.resource("VpcPublicAz2").expect("subnet rendered");
    assert_eq!(subnet.properties["AvailabilityZone"], json!("eu-west-1b"));
    Ok(())
}
