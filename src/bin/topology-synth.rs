// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Synthesizer
//!
//! Builds the bastion + database stack and writes its plan document as JSON.
//!
//! Run with: cargo run --bin topology-synth
//!
//! Environment:
//! - `TOPOLOGY_ACCOUNT` / `TOPOLOGY_REGION` / `TOPOLOGY_PARTITION` (falling
//!   back to `CDK_DEFAULT_ACCOUNT` / `CDK_DEFAULT_REGION`)
//! - `TOPOLOGY_CONFIG`: JSON file overriding any subset of the stack config
//! - `TOPOLOGY_OUTPUT`: plan file path; stdout when unset

use anyhow::{Context, Result};
use cim_topology::{
    bastion_database_stack, synthesize, synthesize_to_file, DeploymentContext, JsonPlanWriter,
    TopologyConfig,
};
use std::path::PathBuf;
use tracing::info;

/// Configuration for the synthesizer
#[derive(Debug, Clone)]
struct SynthConfig {
    /// Account and region the stack targets
    context: DeploymentContext,
    /// Optional stack config file
    config_path: Option<PathBuf>,
    /// Plan output path
    output_path: Option<PathBuf>,
}

impl SynthConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let context = DeploymentContext::from_env().context("Invalid deployment context")?;
        let config_path = std::env::var("TOPOLOGY_CONFIG").ok().map(PathBuf::from);
        let output_path = std::env::var("TOPOLOGY_OUTPUT").ok().map(PathBuf::from);

        Ok(Self {
            context,
            config_path,
            output_path,
        })
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("🚀 Starting topology synthesis");

    let config = SynthConfig::from_env()?;
    info!("📋 Configuration loaded:");
    info!("  - Region: {}", config.context.region);
    info!(
        "  - Account: {}",
        config.context.account.as_deref().unwrap_or("(unset)")
    );

    let topology = match &config.config_path {
        Some(path) => {
            info!("📄 Reading stack config from {}", path.display());
            TopologyConfig::from_file(path).context("Failed to load stack config")?
        }
        None => TopologyConfig::default(),
    };

    let descriptor = bastion_database_stack(config.context.clone(), &topology)
        .context("Failed to declare stack")?;

    let plan = match &config.output_path {
        Some(path) => {
            let plan = synthesize_to_file(&descriptor, path)
                .with_context(|| format!("Synthesis into {} failed", path.display()))?;
            info!("💾 Plan written to {}", path.display());
            plan
        }
        None => {
            let mut engine = JsonPlanWriter::new(std::io::stdout().lock());
            synthesize(&descriptor, &mut engine).context("Synthesis failed")?
        }
    };

    info!(
        "✅ Synthesized {} ({} resources)",
        plan.metadata.stack,
        plan.resources.len()
    );

    Ok(())
}
