//! Equipment Capability Contract
//!
//! Everything the topology core needs from a piece of equipment: a process
//! variable snapshot, kind-level metadata describing those variables, and the
//! ability to instantiate a protocol device for itself.

mod metadata;
mod unit;

pub use metadata::{ValueType, VariableMeta};
pub use unit::{
    AirHandlerState, BuildingState, EquipmentState, EquipmentUnit, PlantState, PumpState,
    TerminalUnitState,
};

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::device::DeviceHandle;

/// Equipment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentKind {
    VavBox,
    AirHandlingUnit,
    Chiller,
    Boiler,
    CoolingTower,
    Pump,
    Building,
    Other,
}

impl EquipmentKind {
    /// Type name used for default device names (`VAVBox-101`).
    pub fn type_name(&self) -> &'static str {
        match self {
            EquipmentKind::VavBox => "VAVBox",
            EquipmentKind::AirHandlingUnit => "AirHandlingUnit",
            EquipmentKind::Chiller => "Chiller",
            EquipmentKind::Boiler => "Boiler",
            EquipmentKind::CoolingTower => "CoolingTower",
            EquipmentKind::Pump => "Pump",
            EquipmentKind::Building => "Building",
            EquipmentKind::Other => "Equipment",
        }
    }

    /// Human-readable label used in device descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            EquipmentKind::VavBox => "VAV Box",
            EquipmentKind::AirHandlingUnit => "Air Handling Unit",
            EquipmentKind::Chiller => "Chiller",
            EquipmentKind::Boiler => "Boiler",
            EquipmentKind::CoolingTower => "Cooling Tower",
            EquipmentKind::Pump => "Pump",
            EquipmentKind::Building => "Building",
            EquipmentKind::Other => "Equipment",
        }
    }

    /// Process-variable metadata shared by every unit of this kind.
    pub fn metadata(&self) -> &'static [VariableMeta] {
        metadata::for_kind(*self)
    }

    /// Whether equipment of this kind lives on the central-plant network.
    pub fn is_central_plant(&self) -> bool {
        matches!(
            self,
            EquipmentKind::Chiller | EquipmentKind::Boiler | EquipmentKind::CoolingTower
        )
    }
}

impl fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A single process-variable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<f64> for PointValue {
    fn from(value: f64) -> Self {
        PointValue::Number(value)
    }
}

impl From<bool> for PointValue {
    fn from(value: bool) -> Self {
        PointValue::Bool(value)
    }
}

impl From<&str> for PointValue {
    fn from(value: &str) -> Self {
        PointValue::Text(value.to_string())
    }
}

impl From<String> for PointValue {
    fn from(value: String) -> Self {
        PointValue::Text(value)
    }
}

/// Process variables keyed by name. Always contains `"name"`.
pub type ProcessVariables = BTreeMap<String, PointValue>;

/// Parameters for instantiating a protocol device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    pub device_id: u32,
    pub device_name: String,
    pub network_interface_name: String,
    pub mac_address: String,
}

/// Capability contract consumed by the device registrar.
#[async_trait]
pub trait Equipment: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> EquipmentKind;

    /// Snapshot of current process variables.
    fn process_variables(&self) -> ProcessVariables;

    /// Metadata for the variables; defined per kind, not per instance.
    fn process_variables_metadata(&self) -> &'static [VariableMeta] {
        self.kind().metadata()
    }

    /// Instantiate a protocol device for this equipment.
    ///
    /// Returning `None` declines the request; this is not an error for the
    /// equipment, the registrar reports it to its caller.
    async fn create_protocol_device(&self, request: DeviceRequest) -> Option<DeviceHandle>;

    fn attach_protocol_stack(&self, _handle: DeviceHandle) {}

    fn detach_protocol_stack(&self) {}

    fn has_protocol_stack(&self) -> bool {
        false
    }
}
