//! Concrete equipment backed by a closed set of state variants.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    DeviceRequest, Equipment, EquipmentKind, PointValue, ProcessVariables, ValueType,
};
use crate::device::DeviceHandle;
use crate::objects::{
    analog_value, binary_value, character_string_value, convert_unit_text, multi_state_value,
    padded_octets, DeviceConfig, DeviceObject, NetworkPortObject, PointObject,
};
use crate::stack::ProtocolStack;

/// Point instances 1 and 2 belong to the device and network-port objects.
const FIRST_POINT_INSTANCE: u32 = 3;

/// Variables that describe the equipment rather than a live point.
const NON_POINT_VARIABLES: &[&str] = &["name", "location", "timezone"];

/// Terminal unit (VAV box) state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalUnitState {
    pub zone_temp: f64,
    pub zone_temp_setpoint: f64,
    pub damper_position: f64,
    pub current_airflow: f64,
    pub has_reheat: bool,
    pub mode: String,
}

impl Default for TerminalUnitState {
    fn default() -> Self {
        Self {
            zone_temp: 72.0,
            zone_temp_setpoint: 72.0,
            damper_position: 0.0,
            current_airflow: 0.0,
            has_reheat: true,
            mode: "deadband".to_string(),
        }
    }
}

/// Air handler state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirHandlerState {
    pub supply_air_temp: f64,
    pub supply_air_temp_setpoint: f64,
    pub current_total_airflow: f64,
    pub supply_fan_speed: f64,
    pub fan_running: bool,
    pub cooling_type: String,
    pub mode: String,
}

impl Default for AirHandlerState {
    fn default() -> Self {
        Self {
            supply_air_temp: 55.0,
            supply_air_temp_setpoint: 55.0,
            current_total_airflow: 0.0,
            supply_fan_speed: 0.0,
            fan_running: false,
            cooling_type: "chilled_water".to_string(),
            mode: "off".to_string(),
        }
    }
}

/// Central plant equipment state (chillers, boilers, cooling towers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantState {
    pub capacity: f64,
    pub current_load: f64,
    pub leaving_water_temp: f64,
    pub leaving_water_temp_setpoint: f64,
    pub running: bool,
}

impl PlantState {
    pub fn with_capacity(capacity: f64, leaving_water_temp_setpoint: f64) -> Self {
        Self {
            capacity,
            current_load: 0.0,
            leaving_water_temp: leaving_water_temp_setpoint,
            leaving_water_temp_setpoint,
            running: false,
        }
    }

    /// Current load as a fraction of capacity.
    pub fn load_ratio(&self) -> f64 {
        if self.capacity <= 0.0 {
            return 0.0;
        }
        self.current_load / self.capacity
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PumpState {
    pub speed: f64,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingState {
    pub outdoor_temp: f64,
    pub occupied: bool,
    pub timezone: String,
}

impl Default for BuildingState {
    fn default() -> Self {
        Self {
            outdoor_temp: 65.0,
            occupied: false,
            timezone: "America/New_York".to_string(),
        }
    }
}

/// Closed set of equipment variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EquipmentState {
    VavBox(TerminalUnitState),
    AirHandler(AirHandlerState),
    Chiller(PlantState),
    Boiler(PlantState),
    CoolingTower(PlantState),
    Pump(PumpState),
    Building(BuildingState),
    Other,
}

impl EquipmentState {
    pub fn kind(&self) -> EquipmentKind {
        match self {
            EquipmentState::VavBox(_) => EquipmentKind::VavBox,
            EquipmentState::AirHandler(_) => EquipmentKind::AirHandlingUnit,
            EquipmentState::Chiller(_) => EquipmentKind::Chiller,
            EquipmentState::Boiler(_) => EquipmentKind::Boiler,
            EquipmentState::CoolingTower(_) => EquipmentKind::CoolingTower,
            EquipmentState::Pump(_) => EquipmentKind::Pump,
            EquipmentState::Building(_) => EquipmentKind::Building,
            EquipmentState::Other => EquipmentKind::Other,
        }
    }

    fn write_variables(&self, vars: &mut ProcessVariables) {
        let mut put = |name: &str, value: PointValue| {
            vars.insert(name.to_string(), value);
        };

        match self {
            EquipmentState::VavBox(s) => {
                put("zone_temp", s.zone_temp.into());
                put("zone_temp_setpoint", s.zone_temp_setpoint.into());
                put("damper_position", s.damper_position.into());
                put("current_airflow", s.current_airflow.into());
                put("has_reheat", s.has_reheat.into());
                put("mode", s.mode.as_str().into());
            }
            EquipmentState::AirHandler(s) => {
                put("supply_air_temp", s.supply_air_temp.into());
                put("supply_air_temp_setpoint", s.supply_air_temp_setpoint.into());
                put("current_total_airflow", s.current_total_airflow.into());
                put("supply_fan_speed", s.supply_fan_speed.into());
                put("fan_running", s.fan_running.into());
                put("cooling_type", s.cooling_type.as_str().into());
                put("mode", s.mode.as_str().into());
            }
            EquipmentState::Chiller(s) | EquipmentState::Boiler(s) | EquipmentState::CoolingTower(s) => {
                put("capacity", s.capacity.into());
                put("current_load", s.current_load.into());
                put("load_ratio", s.load_ratio().into());
                put("leaving_water_temp", s.leaving_water_temp.into());
                put("leaving_water_temp_setpoint", s.leaving_water_temp_setpoint.into());
                put("running", s.running.into());
            }
            EquipmentState::Pump(s) => {
                put("speed", s.speed.into());
                put("running", s.running.into());
            }
            EquipmentState::Building(s) => {
                put("outdoor_temp", s.outdoor_temp.into());
                put("occupied", s.occupied.into());
                put("timezone", s.timezone.as_str().into());
            }
            EquipmentState::Other => {}
        }
    }
}

/// A named piece of equipment that can be registered on a network.
pub struct EquipmentUnit {
    name: String,
    state: RwLock<EquipmentState>,
    stack: Arc<dyn ProtocolStack>,
    /// Device handle attached after registration
    device: RwLock<Option<DeviceHandle>>,
}

impl std::fmt::Debug for EquipmentUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EquipmentUnit")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("has_device", &self.has_protocol_stack())
            .finish()
    }
}

impl EquipmentUnit {
    pub fn new(name: impl Into<String>, state: EquipmentState, stack: Arc<dyn ProtocolStack>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(state),
            stack,
            device: RwLock::new(None),
        }
    }

    pub fn vav_box(name: impl Into<String>, stack: Arc<dyn ProtocolStack>) -> Self {
        Self::new(name, EquipmentState::VavBox(TerminalUnitState::default()), stack)
    }

    pub fn air_handler(name: impl Into<String>, stack: Arc<dyn ProtocolStack>) -> Self {
        Self::new(name, EquipmentState::AirHandler(AirHandlerState::default()), stack)
    }

    /// Chiller rated in tons.
    pub fn chiller(name: impl Into<String>, stack: Arc<dyn ProtocolStack>) -> Self {
        Self::new(name, EquipmentState::Chiller(PlantState::with_capacity(500.0, 44.0)), stack)
    }

    /// Boiler rated in BTU/hr.
    pub fn boiler(name: impl Into<String>, stack: Arc<dyn ProtocolStack>) -> Self {
        Self::new(name, EquipmentState::Boiler(PlantState::with_capacity(1_000_000.0, 180.0)), stack)
    }

    pub fn cooling_tower(name: impl Into<String>, stack: Arc<dyn ProtocolStack>) -> Self {
        Self::new(name, EquipmentState::CoolingTower(PlantState::with_capacity(600.0, 85.0)), stack)
    }

    pub fn pump(name: impl Into<String>, stack: Arc<dyn ProtocolStack>) -> Self {
        Self::new(name, EquipmentState::Pump(PumpState::default()), stack)
    }

    pub fn building(name: impl Into<String>, stack: Arc<dyn ProtocolStack>) -> Self {
        Self::new(name, EquipmentState::Building(BuildingState::default()), stack)
    }

    pub fn state(&self) -> EquipmentState {
        self.state.read().clone()
    }

    /// Mutate the state in place. The variant (and therefore the kind) is
    /// expected to stay the same.
    pub fn update_state<F>(&self, update: F)
    where
        F: FnOnce(&mut EquipmentState),
    {
        let mut state = self.state.write();
        update(&mut *state);
    }

    /// The attached device handle, if registered.
    pub fn device(&self) -> Option<DeviceHandle> {
        self.device.read().clone()
    }

    /// Push current process variables to the attached device.
    /// Returns the number of points updated (0 when detached).
    pub fn sync_device(&self) -> usize {
        let Some(device) = self.device() else {
            return 0;
        };
        let updated = device.sync_present_values(&self.process_variables());
        if updated > 0 {
            debug!("Updated {} BACnet points for {}", updated, self.name);
        }
        updated
    }

    /// Build the object configuration for a device request.
    pub fn device_config(&self, request: &DeviceRequest) -> DeviceConfig {
        let kind = self.kind();
        let device = DeviceObject::new(request.device_id, &request.device_name)
            .with_model(kind.type_name())
            .with_description(format!("Simulated {} - {}", kind.label(), self.name));
        let port = NetworkPortObject::virtual_port(
            &request.network_interface_name,
            padded_octets(&request.mac_address),
        );

        let mut config = DeviceConfig::new(device, port);
        let vars = self.process_variables();
        let mut instance = FIRST_POINT_INSTANCE;

        for meta in self.process_variables_metadata() {
            if NON_POINT_VARIABLES.contains(&meta.name) {
                continue;
            }
            let Some(value) = vars.get(meta.name) else {
                continue;
            };

            let point = match (meta.value_type, value) {
                (ValueType::Number, PointValue::Number(v)) => {
                    let units = meta.unit.map(convert_unit_text).unwrap_or("no-units");
                    PointObject::Analog(analog_value(instance, meta.name, meta.label, *v, units))
                }
                (ValueType::Bool, PointValue::Bool(v)) => {
                    PointObject::Binary(binary_value(instance, meta.name, meta.label, *v))
                }
                (ValueType::Text, PointValue::Text(v)) => match meta.options {
                    Some(options) => {
                        let states: Vec<String> = options.iter().map(|s| s.to_string()).collect();
                        let present = states.iter().position(|s| s == v).map(|i| i as u32 + 1).unwrap_or(1);
                        PointObject::MultiState(multi_state_value(instance, meta.name, meta.label, states, present))
                    }
                    None => PointObject::CharacterString(character_string_value(
                        instance, meta.name, meta.label, v.as_str(),
                    )),
                },
                _ => {
                    warn!("{}: variable {} does not match its metadata type", self.name, meta.name);
                    continue;
                }
            };

            config.points.push(point);
            instance += 1;
        }

        config
    }
}

#[async_trait]
impl Equipment for EquipmentUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EquipmentKind {
        self.state.read().kind()
    }

    fn process_variables(&self) -> ProcessVariables {
        let mut vars = ProcessVariables::new();
        vars.insert("name".to_string(), PointValue::Text(self.name.clone()));
        self.state.read().write_variables(&mut vars);
        vars
    }

    async fn create_protocol_device(&self, request: DeviceRequest) -> Option<DeviceHandle> {
        let config = self.device_config(&request);
        debug!(
            "Creating {} with ID {} on VLAN {}",
            request.device_name, request.device_id, request.network_interface_name
        );

        match self.stack.instantiate(config).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Error creating BACnet device {}: {}", request.device_name, e);
                None
            }
        }
    }

    fn attach_protocol_stack(&self, handle: DeviceHandle) {
        *self.device.write() = Some(handle);
    }

    fn detach_protocol_stack(&self) {
        *self.device.write() = None;
    }

    fn has_protocol_stack(&self) -> bool {
        self.device.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{ObjectIdentifier, ObjectType};
    use crate::stack::VirtualStack;

    fn request(device_id: u32, name: &str) -> DeviceRequest {
        DeviceRequest {
            device_id,
            device_name: name.to_string(),
            network_interface_name: "ahu-ahu1".to_string(),
            mac_address: "0x0001".to_string(),
        }
    }

    #[test]
    fn test_process_variables_include_name() {
        let vav = EquipmentUnit::vav_box("101", Arc::new(VirtualStack::new()));
        let vars = vav.process_variables();
        assert_eq!(vars.get("name"), Some(&PointValue::Text("101".into())));
        assert_eq!(vars.get("zone_temp"), Some(&PointValue::Number(72.0)));
        assert_eq!(vars.get("mode"), Some(&PointValue::Text("deadband".into())));

        // Every variable is described by the kind's metadata
        for name in vars.keys() {
            assert!(
                vav.process_variables_metadata().iter().any(|m| m.name == name),
                "{name} has no metadata"
            );
        }
    }

    #[test]
    fn test_device_config_points() {
        let ahu = EquipmentUnit::air_handler("AHU1", Arc::new(VirtualStack::new()));
        let config = ahu.device_config(&request(1000, "AHU-AHU1"));

        assert_eq!(config.device.model_name, "AirHandlingUnit");
        assert_eq!(config.device.description, "Simulated Air Handling Unit - AHU1");
        assert_eq!(config.network_port.mac_address, "0x0001");

        // name is not a point; instances start at 3 and follow metadata order
        let names: Vec<&str> = config.points.iter().map(|p| p.object_name()).collect();
        assert_eq!(
            names,
            vec![
                "supply_air_temp",
                "supply_air_temp_setpoint",
                "current_total_airflow",
                "supply_fan_speed",
                "fan_running",
                "cooling_type",
                "mode"
            ]
        );
        assert_eq!(
            config.points[0].object_identifier(),
            ObjectIdentifier(ObjectType::AnalogValue, 3)
        );

        match &config.points[0] {
            PointObject::Analog(obj) => assert_eq!(obj.units, "degrees-fahrenheit"),
            other => panic!("expected analog point, got {other:?}"),
        }
        match &config.points[3] {
            PointObject::Analog(obj) => assert_eq!(obj.units, "percent"),
            other => panic!("expected analog point, got {other:?}"),
        }
        assert!(matches!(config.points[4], PointObject::Binary(_)));
        assert!(matches!(config.points[5], PointObject::CharacterString(_)));
        match &config.points[6] {
            PointObject::MultiState(obj) => {
                assert_eq!(obj.number_of_states, 4);
                assert_eq!(obj.present_value, 4); // "off"
            }
            other => panic!("expected multi-state point, got {other:?}"),
        }
    }

    #[test]
    fn test_plant_load_ratio() {
        let chiller = EquipmentUnit::chiller("CH1", Arc::new(VirtualStack::new()));
        chiller.update_state(|state| {
            if let EquipmentState::Chiller(plant) = state {
                plant.current_load = 250.0;
            }
        });
        assert_eq!(chiller.kind(), EquipmentKind::Chiller);
        assert_eq!(
            chiller.process_variables().get("load_ratio"),
            Some(&PointValue::Number(0.5))
        );
    }

    #[tokio::test]
    async fn test_create_attach_and_sync() {
        let vav = EquipmentUnit::vav_box("101", Arc::new(VirtualStack::new()));
        let handle = vav.create_protocol_device(request(1000, "VAV-101")).await.unwrap();
        assert_eq!(handle.device_id(), 1000);
        assert!(!vav.has_protocol_stack());

        vav.attach_protocol_stack(handle.clone());
        assert!(vav.has_protocol_stack());
        assert_eq!(vav.sync_device(), 0);

        vav.update_state(|state| {
            if let EquipmentState::VavBox(s) = state {
                s.zone_temp = 75.0;
                s.mode = "cooling".to_string();
            }
        });
        assert_eq!(vav.sync_device(), 2);
        assert_eq!(handle.present_value("zone_temp"), Some(PointValue::Number(75.0)));

        vav.detach_protocol_stack();
        assert!(!vav.has_protocol_stack());
        assert_eq!(vav.sync_device(), 0);
    }

    #[test]
    fn test_state_serialization_is_tagged() {
        let state = EquipmentState::Pump(PumpState { speed: 0.8, running: true });
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["kind"], "pump");
        assert_eq!(value["speed"], 0.8);
    }
}
