// Copyright (c) 2025 - Cowboy AI, Inc.
//! Managed Database Instances

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{CredentialSource, InstanceType, LogicalName, SubnetTier};

/// Database engine family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Postgres,
    Mysql,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::Mysql => 3306,
        }
    }
}

/// Engine plus version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseEngine {
    pub kind: EngineKind,
    pub version: String,
}

impl DatabaseEngine {
    pub fn postgres(version: impl Into<String>) -> Self {
        Self {
            kind: EngineKind::Postgres,
            version: version.into(),
        }
    }

    pub fn mysql(version: impl Into<String>) -> Self {
        Self {
            kind: EngineKind::Mysql,
            version: version.into(),
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.version)
    }
}

/// Initial storage and optional autoscaling ceiling, in GiB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageBounds {
    pub allocated_gib: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_allocated_gib: Option<u32>,
}

impl StorageBounds {
    /// Smallest storage a managed instance accepts
    pub const MIN_ALLOCATED_GIB: u32 = 20;

    pub fn new(allocated_gib: u32, max_allocated_gib: Option<u32>) -> Self {
        Self {
            allocated_gib,
            max_allocated_gib,
        }
    }

    /// Check whether storage may grow beyond the initial allocation
    pub fn autoscales(&self) -> bool {
        self.max_allocated_gib
            .is_some_and(|max| max > self.allocated_gib)
    }
}

/// Database instance declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInstance {
    pub name: LogicalName,
    pub engine: DatabaseEngine,
    pub network: LogicalName,
    pub subnet_tier: SubnetTier,
    pub instance_type: InstanceType,
    pub credentials: CredentialSource,
    pub storage: StorageBounds,
    pub security_groups: Vec<LogicalName>,
    pub publicly_accessible: bool,
    pub deletion_protection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl DatabaseInstance {
    /// Create a private, unprotected database with minimum storage
    pub fn new(
        name: LogicalName,
        engine: DatabaseEngine,
        network: LogicalName,
        subnet_tier: SubnetTier,
        instance_type: InstanceType,
        credentials: CredentialSource,
    ) -> Self {
        Self {
            name,
            engine,
            network,
            subnet_tier,
            instance_type,
            credentials,
            storage: StorageBounds::new(StorageBounds::MIN_ALLOCATED_GIB, None),
            security_groups: Vec::new(),
            publicly_accessible: false,
            deletion_protection: false,
            port: None,
        }
    }

    pub fn with_storage(mut self, storage: StorageBounds) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_security_group(mut self, group: LogicalName) -> Self {
        if !self.security_groups.contains(&group) {
            self.security_groups.push(group);
        }
        self
    }

    pub fn publicly_accessible(mut self, public: bool) -> Self {
        self.publicly_accessible = public;
        self
    }

    pub fn deletion_protection(mut self, protect: bool) -> Self {
        self.deletion_protection = protect;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Listener port; the engine default unless overridden
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.engine.kind.default_port())
    }

    /// Name of the derived subnet group node
    pub fn subnet_group_name(&self) -> LogicalName {
        self.name.derived("subnets")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postgres() -> DatabaseInstance {
        DatabaseInstance::new(
            LogicalName::new("database").unwrap(),
            DatabaseEngine::postgres("15"),
            LogicalName::new("vpc").unwrap(),
            SubnetTier::PrivateWithEgress,
            "t3.micro".parse().unwrap(),
            CredentialSource::FromSecret(LogicalName::new("rds-credentials").unwrap()),
        )
    }

    #[test]
    fn test_defaults() {
        let db = postgres();
        assert!(!db.publicly_accessible);
        assert!(!db.deletion_protection);
        assert_eq!(db.storage.allocated_gib, 20);
        assert_eq!(db.effective_port(), 5432);
        assert_eq!(db.subnet_group_name().as_str(), "database-subnets");
    }

    #[test]
    fn test_port_override() {
        assert_eq!(postgres().with_port(6432).effective_port(), 6432);
        assert_eq!(EngineKind::Mysql.default_port(), 3306);
    }

    #[test]
    fn test_storage_autoscaling() {
        assert!(StorageBounds::new(20, Some(100)).autoscales());
        assert!(!StorageBounds::new(20, None).autoscales());
        assert!(!StorageBounds::new(100, Some(100)).autoscales());
    }

    #[test]
    fn test_engine_display() {
        assert_eq!(DatabaseEngine::postgres("15").to_string(), "postgres 15");
    }
}
