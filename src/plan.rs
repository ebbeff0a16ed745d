// Copyright (c) 2025 - Cowboy AI, Inc.
//! Plan Document Rendering
//!
//! Renders a validated [`ResourceGraph`] into the JSON document the
//! provisioning engine consumes. The layout follows the CloudFormation
//! template shape: `Resources` keyed by logical id, each with `Type`,
//! `Properties` and `DependsOn`; cross references are `Ref` / `Fn::GetAtt`
//! intrinsics and secrets appear only as dynamic references.
//!
//! Some graph nodes expand into several resources (a subnet brings its route
//! table, a network its internet gateway). The node's primary resource always
//! uses the node's own logical id, so `DependsOn` can be derived from graph
//! edges directly.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::domain::{
    ComputeInstance, CredentialSource, DatabaseInstance, EgressPolicy, IamRole, IngressRule,
    LogicalName, Network, NodeId, PeerSource, Port, Protocol, SecurityGroup, Subnet, SubnetTier,
    ValidationError,
};
use crate::errors::{TopologyError, TopologyResult};
use crate::graph::{EdgeKind, Resource, ResourceGraph};

/// A single resource in the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlanResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<String>,
}

impl PlanResource {
    fn new(resource_type: &str, properties: Value) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            properties,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    fn depends_on(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    fn retain_snapshot(mut self) -> Self {
        self.deletion_policy = Some("Snapshot".to_string());
        self.update_replace_policy = Some("Snapshot".to_string());
        self
    }
}

/// Stack-level metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlanMetadata {
    pub stack: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    pub region: String,
    /// Logical id → deterministic node id of every graph node
    pub nodes: BTreeMap<String, NodeId>,
}

/// Document handed to the provisioning engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlanDocument {
    pub description: String,
    pub metadata: PlanMetadata,
    pub resources: BTreeMap<String, PlanResource>,
}

impl PlanDocument {
    /// Look up a rendered resource by logical id
    pub fn resource(&self, logical_id: &str) -> Option<&PlanResource> {
        self.resources.get(logical_id)
    }

    /// Logical ids of every resource of one type, ordered
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a str> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
            .map(|(id, _)| id.as_str())
    }

    pub fn to_json_pretty(&self) -> TopologyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Render a resource graph into a plan document
pub fn render(graph: &ResourceGraph) -> TopologyResult<PlanDocument> {
    let mut renderer = Renderer {
        graph,
        resources: BTreeMap::new(),
    };

    for node in graph.nodes() {
        match &node.resource {
            Resource::Network(network) => renderer.network(network)?,
            // Subnets are rendered with their network so routes can see every AZ
            Resource::Subnet(_) => {}
            Resource::SecurityGroup(group) => renderer.security_group(group)?,
            Resource::IamRole(role) => renderer.role(role)?,
            Resource::ComputeInstance(instance) => renderer.instance(instance)?,
            Resource::Secret(_) => {}
            Resource::DbSubnetGroup { subnets } => renderer.db_subnet_group(&node.name, subnets)?,
            Resource::DatabaseInstance(database) => renderer.database(database)?,
        }
    }

    let context = graph.context();
    Ok(PlanDocument {
        description: format!("Topology {} ({})", graph.stack(), context.region),
        metadata: PlanMetadata {
            stack: graph.stack().to_string(),
            account: context.account.clone(),
            region: context.region.clone(),
            nodes: graph
                .nodes()
                .map(|node| (node.name.to_logical_id(), node.id))
                .collect(),
        },
        resources: renderer.resources,
    })
}

fn reference(name: &LogicalName) -> Value {
    json!({ "Ref": name.to_logical_id() })
}

fn ref_id(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

fn group_id(name: &LogicalName) -> Value {
    json!({ "Fn::GetAtt": [name.to_logical_id(), "GroupId"] })
}

/// Port fields of a rule; ICMP without a range means every type and code
fn port_fields(port: &Port, rule: &mut serde_json::Map<String, Value>) {
    rule.insert("IpProtocol".into(), json!(port.protocol().as_str()));
    match (port.protocol(), port.from_port(), port.to_port()) {
        (Protocol::All, _, _) => {}
        (_, Some(from), Some(to)) => {
            rule.insert("FromPort".into(), json!(from));
            rule.insert("ToPort".into(), json!(to));
        }
        _ => {
            rule.insert("FromPort".into(), json!(-1));
            rule.insert("ToPort".into(), json!(-1));
        }
    }
}

/// Logical id fragment for a port (`Tcp5432`, `Tcp8000To8080`, `AllTraffic`)
fn port_label(port: &Port) -> String {
    let protocol = match port.protocol() {
        Protocol::Tcp => "Tcp",
        Protocol::Udp => "Udp",
        Protocol::Icmp => "Icmp",
        Protocol::All => return "AllTraffic".to_string(),
    };
    match (port.from_port(), port.to_port()) {
        (Some(from), Some(to)) if from == to => format!("{}{}", protocol, from),
        (Some(from), Some(to)) => format!("{}{}To{}", protocol, from, to),
        _ => format!("{}All", protocol),
    }
}

struct Renderer<'g> {
    graph: &'g ResourceGraph,
    resources: BTreeMap<String, PlanResource>,
}

impl<'g> Renderer<'g> {
    fn add(&mut self, logical_id: String, resource: PlanResource) -> TopologyResult<()> {
        if self.resources.contains_key(&logical_id) {
            return Err(TopologyError::LogicalIdCollision(logical_id));
        }
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    fn tags(&self, name: &LogicalName) -> Value {
        json!([{ "Key": "Name", "Value": format!("{}/{}", self.graph.stack(), name) }])
    }

    /// Logical ids of the rendered nodes `name` depends on
    fn depends_on(&self, name: &LogicalName) -> Vec<String> {
        self.graph
            .dependencies_of(name)
            .into_iter()
            .filter(|dep| {
                self.graph
                    .node(dep)
                    .is_some_and(|node| !node.resource.is_external())
            })
            .map(LogicalName::to_logical_id)
            .collect()
    }

    fn network(&mut self, network: &Network) -> TopologyResult<()> {
        let vpc_id = network.name.to_logical_id();
        self.add(
            vpc_id.clone(),
            PlanResource::new(
                "AWS::EC2::VPC",
                json!({
                    "CidrBlock": network.cidr.to_string(),
                    "EnableDnsHostnames": true,
                    "EnableDnsSupport": true,
                    "InstanceTenancy": "default",
                    "Tags": self.tags(&network.name),
                }),
            ),
        )?;

        let igw_id = format!("{}Igw", vpc_id);
        let attachment_id = format!("{}GatewayAttachment", vpc_id);
        if network.has_tier(SubnetTier::Public) {
            self.add(
                igw_id.clone(),
                PlanResource::new(
                    "AWS::EC2::InternetGateway",
                    json!({ "Tags": self.tags(&network.name) }),
                ),
            )?;
            self.add(
                attachment_id.clone(),
                PlanResource::new(
                    "AWS::EC2::VPCGatewayAttachment",
                    json!({ "VpcId": ref_id(&vpc_id), "InternetGatewayId": ref_id(&igw_id) }),
                ),
            )?;
        }

        let subnets = network
            .allocate_subnets(&self.graph.context().region)
            .map_err(|reason| ValidationError::SubnetAllocation {
                network: network.name.clone(),
                reason,
            })?;

        // NAT gateways go into the first public group, one per AZ up to the
        // requested count
        let nat_count = network.nat_gateways.min(network.max_azs);
        let nat_group = network
            .group_for_tier(SubnetTier::Public)
            .map(|g| g.name.clone());
        let mut nat_ids = Vec::new();

        for (index, subnet) in subnets.iter().enumerate() {
            let az_index = (index % usize::from(network.max_azs.max(1))) as u8;
            let subnet_id = self.subnet(subnet, &vpc_id)?;
            let route_table_id = format!("{}RouteTable", subnet_id);

            if subnet.tier.is_public() {
                let default_route_id = format!("{}DefaultRoute", subnet_id);
                self.add(
                    default_route_id.clone(),
                    PlanResource::new(
                        "AWS::EC2::Route",
                        json!({
                            "RouteTableId": ref_id(&route_table_id),
                            "DestinationCidrBlock": "0.0.0.0/0",
                            "GatewayId": ref_id(&igw_id),
                        }),
                    )
                    .depends_on(vec![attachment_id.clone()]),
                )?;

                if Some(&subnet.group) == nat_group.as_ref() && az_index < nat_count {
                    let eip_id = format!("{}Eip", subnet_id);
                    let nat_id = format!("{}NatGateway", subnet_id);
                    self.add(
                        eip_id.clone(),
                        PlanResource::new("AWS::EC2::EIP", json!({ "Domain": "vpc" })),
                    )?;
                    self.add(
                        nat_id.clone(),
                        PlanResource::new(
                            "AWS::EC2::NatGateway",
                            json!({
                                "SubnetId": ref_id(&subnet_id),
                                "AllocationId": { "Fn::GetAtt": [eip_id, "AllocationId"] },
                                "Tags": self.tags(&subnet.name),
                            }),
                        )
                        .depends_on(vec![default_route_id]),
                    )?;
                    nat_ids.push(nat_id);
                }
            }
        }

        if nat_ids.is_empty() {
            return Ok(());
        }

        // Private subnets egress through the NAT gateway of their AZ, wrapping
        // around when there are fewer gateways than AZs
        for (index, subnet) in subnets.iter().enumerate() {
            if subnet.tier != SubnetTier::PrivateWithEgress {
                continue;
            }
            let az_index = index % usize::from(network.max_azs.max(1));
            let nat_id = &nat_ids[az_index % nat_ids.len()];
            let subnet_id = subnet.name.to_logical_id();
            self.add(
                format!("{}DefaultRoute", subnet_id),
                PlanResource::new(
                    "AWS::EC2::Route",
                    json!({
                        "RouteTableId": ref_id(&format!("{}RouteTable", subnet_id)),
                        "DestinationCidrBlock": "0.0.0.0/0",
                        "NatGatewayId": ref_id(nat_id),
                    }),
                ),
            )?;
        }

        Ok(())
    }

    /// Subnet, its route table and the association; returns the subnet id
    fn subnet(&mut self, subnet: &Subnet, vpc_id: &str) -> TopologyResult<String> {
        let subnet_id = subnet.name.to_logical_id();
        let route_table_id = format!("{}RouteTable", subnet_id);

        self.add(
            subnet_id.clone(),
            PlanResource::new(
                "AWS::EC2::Subnet",
                json!({
                    "VpcId": ref_id(vpc_id),
                    "CidrBlock": subnet.cidr.to_string(),
                    "AvailabilityZone": subnet.availability_zone.as_str(),
                    "MapPublicIpOnLaunch": subnet.tier.is_public(),
                    "Tags": self.tags(&subnet.name),
                }),
            )
            .depends_on(self.depends_on(&subnet.name)),
        )?;
        self.add(
            route_table_id.clone(),
            PlanResource::new(
                "AWS::EC2::RouteTable",
                json!({ "VpcId": ref_id(vpc_id), "Tags": self.tags(&subnet.name) }),
            ),
        )?;
        self.add(
            format!("{}RouteTableAssociation", subnet_id),
            PlanResource::new(
                "AWS::EC2::SubnetRouteTableAssociation",
                json!({ "RouteTableId": ref_id(&route_table_id), "SubnetId": ref_id(&subnet_id) }),
            ),
        )?;

        Ok(subnet_id)
    }

    fn security_group(&mut self, group: &SecurityGroup) -> TopologyResult<()> {
        let egress = match group.egress {
            EgressPolicy::AllowAll => json!([{
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": "-1",
            }]),
            // An unmatchable rule replaces the implicit allow-all
            EgressPolicy::DenyAll => json!([{
                "CidrIp": "255.255.255.255/32",
                "Description": "Disallow all traffic",
                "FromPort": 252,
                "IpProtocol": "icmp",
                "ToPort": 86,
            }]),
        };

        let mut cidr_rules = Vec::new();
        let mut group_rules = Vec::new();
        for rule in &group.ingress {
            match &rule.source {
                PeerSource::Cidr(cidr) => {
                    let mut fields = serde_json::Map::new();
                    fields.insert("CidrIp".into(), json!(cidr.to_string()));
                    fields.insert("Description".into(), json!(rule.description));
                    port_fields(&rule.port, &mut fields);
                    cidr_rules.push(Value::Object(fields));
                }
                PeerSource::SecurityGroup(source) => group_rules.push((source, rule)),
            }
        }

        let mut properties = json!({
            "GroupDescription": group.description,
            "VpcId": reference(&group.network),
            "SecurityGroupEgress": egress,
            "Tags": self.tags(&group.name),
        });
        if !cidr_rules.is_empty() {
            properties["SecurityGroupIngress"] = Value::Array(cidr_rules);
        }

        let group_logical_id = group.name.to_logical_id();
        let depends_on = self
            .depends_on(&group.name)
            .into_iter()
            .filter(|dep| *dep == group.network.to_logical_id())
            .collect();
        self.add(
            group_logical_id.clone(),
            PlanResource::new("AWS::EC2::SecurityGroup", properties).depends_on(depends_on),
        )?;

        // Group-sourced rules are standalone resources so groups may reference
        // each other without a cycle
        for (source, rule) in group_rules {
            self.add(
                format!(
                    "{}From{}{}",
                    group_logical_id,
                    source.to_logical_id(),
                    port_label(&rule.port)
                ),
                self.group_ingress(group, source, rule),
            )?;
        }

        Ok(())
    }

    fn group_ingress(
        &self,
        group: &SecurityGroup,
        source: &LogicalName,
        rule: &IngressRule,
    ) -> PlanResource {
        let mut fields = serde_json::Map::new();
        fields.insert("GroupId".into(), group_id(&group.name));
        fields.insert("SourceSecurityGroupId".into(), group_id(source));
        fields.insert("Description".into(), json!(rule.description));
        port_fields(&rule.port, &mut fields);
        PlanResource::new("AWS::EC2::SecurityGroupIngress", Value::Object(fields))
    }

    fn role(&mut self, role: &IamRole) -> TopologyResult<()> {
        let partition = &self.graph.context().partition;
        let policies: Vec<String> = role
            .managed_policies
            .iter()
            .map(|policy| policy.arn(partition))
            .collect();

        let mut properties = json!({
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": { "Service": role.assumed_by.as_str() },
                }],
            },
            "Tags": self.tags(&role.name),
        });
        if !policies.is_empty() {
            properties["ManagedPolicyArns"] = json!(policies);
        }

        self.add(role.name.to_logical_id(), PlanResource::new("AWS::IAM::Role", properties))
    }

    fn instance(&mut self, instance: &ComputeInstance) -> TopologyResult<()> {
        let graph = self.graph;
        let instance_id = instance.name.to_logical_id();

        let subnet = graph
            .edges_from(&instance.name)
            .find(|edge| edge.kind == EdgeKind::PlacedIn)
            .and_then(|edge| graph.node(&edge.to))
            .and_then(|node| match &node.resource {
                Resource::Subnet(subnet) => Some(subnet),
                _ => None,
            })
            .ok_or_else(|| ValidationError::UndeclaredSubnetTier {
                entity: instance.name.clone(),
                network: instance.network.clone(),
                tier: instance.subnet_tier,
            })?;

        let mut properties = json!({
            "AvailabilityZone": subnet.availability_zone.as_str(),
            "ImageId": instance.machine_image.image_id_reference(),
            "InstanceType": instance.instance_type.to_string(),
            "SecurityGroupIds": instance.security_groups.iter().map(group_id).collect::<Vec<_>>(),
            "SubnetId": reference(&subnet.name),
            "Tags": self.tags(&instance.name),
        });

        let mut depends_on = self.depends_on(&instance.name);
        if let Some(role) = &instance.role {
            let profile_id = format!("{}InstanceProfile", instance_id);
            let profile = json!({ "Roles": [reference(role)] });
            self.add(
                profile_id.clone(),
                PlanResource::new("AWS::IAM::InstanceProfile", profile),
            )?;
            properties["IamInstanceProfile"] = ref_id(&profile_id);
        }

        // Public instances wait for their route to the internet
        if subnet.tier.is_public() {
            depends_on.push(format!("{}DefaultRoute", subnet.name.to_logical_id()));
        }

        self.add(
            instance_id,
            PlanResource::new("AWS::EC2::Instance", properties).depends_on(depends_on),
        )
    }

    fn db_subnet_group(
        &mut self,
        name: &LogicalName,
        subnets: &[LogicalName],
    ) -> TopologyResult<()> {
        self.add(
            name.to_logical_id(),
            PlanResource::new(
                "AWS::RDS::DBSubnetGroup",
                json!({
                    "DBSubnetGroupDescription": format!("Subnets of {}", name),
                    "SubnetIds": subnets.iter().map(reference).collect::<Vec<_>>(),
                    "Tags": self.tags(name),
                }),
            ),
        )
    }

    fn database(&mut self, database: &DatabaseInstance) -> TopologyResult<()> {
        let graph = self.graph;
        let secret = match &database.credentials {
            CredentialSource::FromSecret(secret) => graph
                .node(secret)
                .and_then(|node| match &node.resource {
                    Resource::Secret(secret) => Some(secret),
                    _ => None,
                })
                .ok_or_else(|| ValidationError::UnknownSecret {
                    entity: database.name.clone(),
                    secret: secret.clone(),
                })?,
            CredentialSource::Inline { .. } => {
                return Err(ValidationError::InlineCredentials {
                    entity: database.name.clone(),
                }
                .into())
            }
        };

        let mut properties = json!({
            "AllocatedStorage": database.storage.allocated_gib.to_string(),
            "CopyTagsToSnapshot": true,
            "DBInstanceClass": database.instance_type.database_class(),
            "DBSubnetGroupName": reference(&database.subnet_group_name()),
            "DeletionProtection": database.deletion_protection,
            "Engine": database.engine.kind.as_str(),
            "EngineVersion": database.engine.version,
            "MasterUsername": secret.dynamic_reference("username"),
            "MasterUserPassword": secret.dynamic_reference("password"),
            "Port": database.effective_port().to_string(),
            "PubliclyAccessible": database.publicly_accessible,
            "StorageType": "gp2",
            "VPCSecurityGroups": database.security_groups.iter().map(group_id).collect::<Vec<_>>(),
            "Tags": self.tags(&database.name),
        });
        match database.storage.max_allocated_gib {
            Some(max) if database.storage.autoscales() => {
                properties["MaxAllocatedStorage"] = json!(max);
            }
            _ => {}
        }

        self.add(
            database.name.to_logical_id(),
            PlanResource::new("AWS::RDS::DBInstance", properties)
                .depends_on(self.depends_on(&database.name))
                .retain_snapshot(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_port_labels() {
        assert_eq!(port_label(&Port::tcp(5432)), "Tcp5432");
        assert_eq!(port_label(&Port::tcp_range(8000, 8080).unwrap()), "Tcp8000To8080");
        assert_eq!(port_label(&Port::all_icmp()), "IcmpAll");
        assert_eq!(port_label(&Port::all_traffic()), "AllTraffic");
    }

    #[test]
    fn test_port_fields() {
        let mut tcp = serde_json::Map::new();
        port_fields(&Port::tcp(22), &mut tcp);
        assert_eq!(
            Value::Object(tcp),
            json!({ "IpProtocol": "tcp", "FromPort": 22, "ToPort": 22 })
        );

        let mut icmp = serde_json::Map::new();
        port_fields(&Port::all_icmp(), &mut icmp);
        assert_eq!(
            Value::Object(icmp),
            json!({ "IpProtocol": "icmp", "FromPort": -1, "ToPort": -1 })
        );

        let mut all = serde_json::Map::new();
        port_fields(&Port::all_traffic(), &mut all);
        assert_eq!(Value::Object(all), json!({ "IpProtocol": "-1" }));
    }

    #[test]
    fn test_plan_resource_serialization() {
        let resource = PlanResource::new("AWS::RDS::DBInstance", json!({}))
            .depends_on(vec!["DbSg".into()])
            .retain_snapshot();
        assert_eq!(
            serde_json::to_value(&resource).unwrap(),
            json!({
                "Type": "AWS::RDS::DBInstance",
                "Properties": {},
                "DependsOn": ["DbSg"],
                "DeletionPolicy": "Snapshot",
                "UpdateReplacePolicy": "Snapshot",
            })
        );
    }
}
