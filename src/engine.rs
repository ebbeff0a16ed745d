// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Engine Handoff
//!
//! The topology crate stops at the plan document. Applying it (creating,
//! diffing, rolling back) belongs to an external engine behind
//! [`ProvisioningEngine`].
//!
//! ```text
//! TopologyDescriptor ──build──> ResourceGraph ──render──> PlanDocument
//!                                                              │
//!                                                           submit ──> engine
//! ```
//!
//! [`synthesize`] runs the whole pipeline and submits only when every
//! validation passed, so an invalid descriptor never reaches the engine.

use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::descriptor::TopologyDescriptor;
use crate::errors::{TopologyError, TopologyResult};
use crate::plan::{self, PlanDocument};

/// Consumer of rendered plans
///
/// Implementations must treat a submitted plan as the complete desired state
/// of its stack.
pub trait ProvisioningEngine {
    /// Error type for submission failures
    type Error: std::error::Error + Send + Sync + 'static;

    /// Hand a rendered plan to the engine
    fn submit(&mut self, plan: &PlanDocument) -> Result<(), Self::Error>;
}

/// Build, render and submit a descriptor
///
/// Returns the submitted plan. Validation and rendering errors are returned
/// before the engine is called.
pub fn synthesize<E: ProvisioningEngine>(
    descriptor: &TopologyDescriptor,
    engine: &mut E,
) -> TopologyResult<PlanDocument> {
    let graph = descriptor.build()?;
    let plan = plan::render(&graph)?;
    debug!(
        "Rendered {} resources for stack {}",
        plan.resources.len(),
        graph.stack()
    );

    engine
        .submit(&plan)
        .map_err(|e| TopologyError::Engine(e.to_string()))?;
    info!("Submitted plan for stack {}", graph.stack());

    Ok(plan)
}

/// Synthesize a descriptor into a JSON plan file
///
/// The plan is rendered in memory and `path` is written only after synthesis
/// succeeds. A rejected descriptor leaves any existing file untouched.
pub fn synthesize_to_file(
    descriptor: &TopologyDescriptor,
    path: &Path,
) -> TopologyResult<PlanDocument> {
    let mut writer = JsonPlanWriter::new(Vec::new());
    let plan = synthesize(descriptor, &mut writer)?;
    std::fs::write(path, writer.into_inner())?;
    info!("Plan written to {}", path.display());
    Ok(plan)
}

/// Engine that writes the plan as pretty-printed JSON
///
/// Used by the `topology-synth` binary to hand plans to external tooling
/// through a file or stdout.
#[derive(Debug)]
pub struct JsonPlanWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonPlanWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ProvisioningEngine for JsonPlanWriter<W> {
    type Error = serde_json::Error;

    fn submit(&mut self, plan: &PlanDocument) -> Result<(), Self::Error> {
        serde_json::to_writer_pretty(&mut self.writer, plan)?;
        self.writer.write_all(b"\n").map_err(serde_json::Error::io)?;
        self.writer.flush().map_err(serde_json::Error::io)?;
        info!(
            "Wrote plan for {} ({} resources)",
            plan.metadata.stack,
            plan.resources.len()
        );
        Ok(())
    }
}
