//! Process-variable metadata tables, one per equipment kind.

use serde::Serialize;

use super::EquipmentKind;

/// Value type of a process variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    Bool,
    Text,
}

/// Description of one process variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VariableMeta {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    /// Unit text (e.g., "°F", "CFM")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    /// Allowed values for enumerated text variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<&'static [&'static str]>,
}

impl VariableMeta {
    const fn number(name: &'static str, label: &'static str, unit: Option<&'static str>) -> Self {
        Self {
            name,
            value_type: ValueType::Number,
            label,
            description: None,
            unit,
            options: None,
        }
    }

    const fn boolean(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            value_type: ValueType::Bool,
            label,
            description: None,
            unit: None,
            options: None,
        }
    }

    const fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            value_type: ValueType::Text,
            label,
            description: None,
            unit: None,
            options: None,
        }
    }

    const fn choice(
        name: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            value_type: ValueType::Text,
            label,
            description: None,
            unit: None,
            options: Some(options),
        }
    }

    const fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

pub const VAV_MODES: &[&str] = &["cooling", "heating", "deadband"];
pub const AHU_MODES: &[&str] = &["cooling", "heating", "economizer", "off"];

const NAME: VariableMeta = VariableMeta::text("name", "Name");

static VAV_BOX: &[VariableMeta] = &[
    NAME,
    VariableMeta::number("zone_temp", "Zone Temperature", Some("°F"))
        .describe("Current zone air temperature"),
    VariableMeta::number("zone_temp_setpoint", "Zone Temperature Setpoint", Some("°F")),
    VariableMeta::number("damper_position", "Damper Position", Some("fraction")),
    VariableMeta::number("current_airflow", "Current Airflow", Some("CFM")),
    VariableMeta::boolean("has_reheat", "Has Reheat"),
    VariableMeta::choice("mode", "Operating Mode", VAV_MODES),
];

static AIR_HANDLER: &[VariableMeta] = &[
    NAME,
    VariableMeta::number("supply_air_temp", "Supply Air Temperature", Some("°F")),
    VariableMeta::number("supply_air_temp_setpoint", "Supply Air Temperature Setpoint", Some("°F")),
    VariableMeta::number("current_total_airflow", "Total Airflow", Some("CFM")),
    VariableMeta::number("supply_fan_speed", "Supply Fan Speed", Some("fraction")),
    VariableMeta::boolean("fan_running", "Supply Fan Running"),
    VariableMeta::text("cooling_type", "Cooling Type"),
    VariableMeta::choice("mode", "Operating Mode", AHU_MODES),
];

static PLANT: &[VariableMeta] = &[
    NAME,
    VariableMeta::number("capacity", "Capacity", None),
    VariableMeta::number("current_load", "Current Load", None),
    VariableMeta::number("load_ratio", "Load Ratio", Some("fraction"))
        .describe("Current load as a fraction of capacity"),
    VariableMeta::number("leaving_water_temp", "Leaving Water Temperature", Some("°F")),
    VariableMeta::number("leaving_water_temp_setpoint", "Leaving Water Temperature Setpoint", Some("°F")),
    VariableMeta::boolean("running", "Running"),
];

static PUMP: &[VariableMeta] = &[
    NAME,
    VariableMeta::number("speed", "Pump Speed", Some("fraction")),
    VariableMeta::boolean("running", "Running"),
];

static BUILDING: &[VariableMeta] = &[
    NAME,
    VariableMeta::number("outdoor_temp", "Outdoor Air Temperature", Some("°F")),
    VariableMeta::boolean("occupied", "Occupied"),
    VariableMeta::text("timezone", "Timezone"),
];

static OTHER: &[VariableMeta] = &[NAME];

pub(super) fn for_kind(kind: EquipmentKind) -> &'static [VariableMeta] {
    match kind {
        EquipmentKind::VavBox => VAV_BOX,
        EquipmentKind::AirHandlingUnit => AIR_HANDLER,
        EquipmentKind::Chiller | EquipmentKind::Boiler | EquipmentKind::CoolingTower => PLANT,
        EquipmentKind::Pump => PUMP,
        EquipmentKind::Building => BUILDING,
        EquipmentKind::Other => OTHER,
    }
}
