//! Topology Builder
//!
//! Derives the initial set of network segments from a building structure and
//! resolves which AHU serves a given terminal unit. No devices are created
//! here; registration is a separate step driven by the caller.

use std::sync::Arc;

use tracing::info;

use crate::building::BuildingStructure;
use crate::error::Result;
use crate::registry::TopologyRegistry;
use crate::transport::{NetworkTransport, VirtualTransport};

/// Creates segments for a building structure.
#[derive(Clone)]
pub struct TopologyBuilder {
    transport: Arc<dyn NetworkTransport>,
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::with_transport(Arc::new(VirtualTransport))
    }

    pub fn with_transport(transport: Arc<dyn NetworkTransport>) -> Self {
        Self { transport }
    }

    /// Build a fresh registry. On error nothing is returned, so a partially
    /// built topology never escapes.
    pub fn build(&self, structure: &BuildingStructure) -> Result<TopologyRegistry> {
        let registry = TopologyRegistry::with_transport(Arc::clone(&self.transport));
        self.populate(&registry, structure)?;
        info!(
            "Built topology for {}: {} networks",
            structure.building_name(),
            registry.segment_count()
        );
        Ok(registry)
    }

    /// Create the structure's segments in an existing registry.
    ///
    /// The central plant segment is created only when plant equipment is
    /// listed. AHU segments follow the structure's AHU order, so reordering
    /// the document renumbers the networks.
    pub fn populate(&self, registry: &TopologyRegistry, structure: &BuildingStructure) -> Result<()> {
        if structure.has_central_plant() {
            registry.create_central_plant_segment()?;
        }

        for (index, ahu_name) in structure.ahus.keys().enumerate() {
            registry.create_ahu_segment(ahu_name, index)?;
        }

        Ok(())
    }
}

/// Build a topology on virtual networks.
pub fn build_from_structure(structure: &BuildingStructure) -> Result<TopologyRegistry> {
    TopologyBuilder::new().build(structure)
}

/// The AHU whose feeds list `vav_name`.
///
/// Scans AHUs in structure order; the first AHU listing the VAV wins, even
/// if later AHUs list it as well. `None` is an expected outcome.
pub fn resolve_ahu_for_vav<'a>(vav_name: &str, structure: &'a BuildingStructure) -> Option<&'a str> {
    structure
        .ahus
        .iter()
        .find(|(_, ahu)| ahu.feeds.iter().any(|feed| feed == vav_name))
        .map(|(name, _)| name)
}
