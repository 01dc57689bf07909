//! Commissioning
//!
//! Brings a whole building onto its networks: terminal units first (on the
//! segment of the AHU feeding them), then the AHUs, then the central plant.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::building::BuildingStructure;
use crate::builder::resolve_ahu_for_vav;
use crate::equipment::{Equipment, EquipmentKind, EquipmentState, EquipmentUnit};
use crate::error::{Result, TopologyError};
use crate::registrar::{DeviceRegistrar, RegisterOptions};
use crate::segment::NetworkSegment;
use crate::stack::ProtocolStack;

/// Why a unit was left off the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No AHU lists the terminal unit in its feeds
    NoAhuAssignment,
    /// The AHU has no segment in this topology
    NoNetworkForAhu(String),
    /// The unit declined to create its device
    Declined(TopologyError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoAhuAssignment => write!(f, "no AHU assignment found"),
            SkipReason::NoNetworkForAhu(ahu) => write!(f, "no network found for AHU {ahu}"),
            SkipReason::Declined(err) => write!(f, "{err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEquipment {
    pub name: String,
    pub kind: EquipmentKind,
    pub reason: SkipReason,
}

/// Outcome of commissioning a building.
#[derive(Debug, Default)]
pub struct CommissionReport {
    /// Registered equipment, in registration order
    pub commissioned: Vec<Arc<EquipmentUnit>>,
    pub skipped: Vec<SkippedEquipment>,
}

impl CommissionReport {
    pub fn commissioned_names(&self) -> Vec<&str> {
        self.commissioned.iter().map(|unit| unit.name()).collect()
    }

    fn skip(&mut self, name: &str, kind: EquipmentKind, reason: SkipReason) {
        warn!("  {}: {}, skipping", name, reason);
        self.skipped.push(SkippedEquipment {
            name: name.to_string(),
            kind,
            reason,
        });
    }
}

/// Create and register every unit in `structure`.
///
/// Declined devices are recorded as skipped and commissioning carries on.
/// Any other registration error aborts.
pub async fn commission_building(
    structure: &BuildingStructure,
    registrar: &DeviceRegistrar,
    stack: Arc<dyn ProtocolStack>,
) -> Result<CommissionReport> {
    let registry = Arc::clone(registrar.registry());
    let mut report = CommissionReport::default();

    info!("Creating VAV boxes on their respective AHU networks");
    for (vav_name, vav_info) in structure.vavs.iter() {
        let Some(ahu_name) = resolve_ahu_for_vav(vav_name, structure) else {
            report.skip(vav_name, EquipmentKind::VavBox, SkipReason::NoAhuAssignment);
            continue;
        };
        let Some(segment) = registry.segment_for_ahu(ahu_name) else {
            report.skip(
                vav_name,
                EquipmentKind::VavBox,
                SkipReason::NoNetworkForAhu(ahu_name.to_string()),
            );
            continue;
        };

        let unit = EquipmentUnit::vav_box(vav_name, Arc::clone(&stack));
        unit.update_state(|state| {
            if let EquipmentState::VavBox(vav) = state {
                vav.has_reheat = vav_info.has_reheat;
            }
        });
        register(registrar, &mut report, unit, &segment, format!("VAV-{vav_name}")).await?;
    }

    info!("Creating AHUs on their networks");
    for ahu_name in structure.ahus.keys() {
        let Some(segment) = registry.segment_for_ahu(ahu_name) else {
            report.skip(
                ahu_name,
                EquipmentKind::AirHandlingUnit,
                SkipReason::NoNetworkForAhu(ahu_name.to_string()),
            );
            continue;
        };

        let unit = EquipmentUnit::air_handler(ahu_name, Arc::clone(&stack));
        register(registrar, &mut report, unit, &segment, format!("AHU-{ahu_name}")).await?;
    }

    if let Some(plant) = registry.central_plant_segment() {
        if structure.has_central_plant() {
            info!("Creating central plant equipment");
        }
        for name in &structure.boilers {
            let unit = EquipmentUnit::boiler(name, Arc::clone(&stack));
            register(registrar, &mut report, unit, &plant, format!("Boiler-{name}")).await?;
        }
        for name in &structure.chillers {
            let unit = EquipmentUnit::chiller(name, Arc::clone(&stack));
            register(registrar, &mut report, unit, &plant, format!("Chiller-{name}")).await?;
        }
        for name in &structure.cooling_towers {
            let unit = EquipmentUnit::cooling_tower(name, Arc::clone(&stack));
            register(registrar, &mut report, unit, &plant, format!("CoolingTower-{name}")).await?;
        }
    }

    info!(
        "Commissioned {} units ({} skipped)",
        report.commissioned.len(),
        report.skipped.len()
    );
    Ok(report)
}

async fn register(
    registrar: &DeviceRegistrar,
    report: &mut CommissionReport,
    unit: EquipmentUnit,
    segment: &Arc<NetworkSegment>,
    device_name: String,
) -> Result<()> {
    let unit = Arc::new(unit);
    let options = RegisterOptions::new().with_device_name(device_name);

    match registrar.register(unit.as_ref(), segment, options).await {
        Ok(_) => {
            report.commissioned.push(unit);
            Ok(())
        }
        Err(err) if err.is_recoverable() => {
            report.skip(unit.name(), unit.kind(), SkipReason::Declined(err));
            Ok(())
        }
        Err(err) => Err(err),
    }
}
