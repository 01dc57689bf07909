//! Topology report rendering.

use std::fmt;

use crate::registry::TopologyRegistry;

const RULE_WIDTH: usize = 60;

/// Printable view of a registry: segments by number, their devices, totals.
pub struct TopologyReport<'a> {
    registry: &'a TopologyRegistry,
}

impl<'a> TopologyReport<'a> {
    pub fn new(registry: &'a TopologyRegistry) -> Self {
        Self { registry }
    }
}

impl fmt::Display for TopologyReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{rule}")?;
        writeln!(f, "BACnet Network Topology")?;
        writeln!(f, "{rule}")?;

        let segments = self.registry.all_segments();
        let mut total_devices = 0;
        for segment in &segments {
            writeln!(f)?;
            writeln!(f, "[Network {}] {}", segment.number(), segment.name().to_uppercase())?;
            for device in segment.devices() {
                writeln!(f, "    +-- {} (Device {})", device.name(), device.device_id())?;
                total_devices += 1;
            }
        }

        writeln!(f)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total: {} networks, {} devices", segments.len(), total_devices)?;
        writeln!(f, "{rule}")
    }
}
