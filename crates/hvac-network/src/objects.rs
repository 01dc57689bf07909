//! BACnet Object Configuration Records
//!
//! JSON-shaped object records handed to the protocol stack when a device is
//! instantiated. Field names and the fixed literal values are part of the
//! contract with the stack and must not change.

use serde::{Deserialize, Serialize};

/// Vendor identifier stamped on every device record.
pub const VENDOR_IDENTIFIER: u16 = 999;
/// Vendor name stamped on every device record.
pub const VENDOR_NAME: &str = "HVACNetwork";
pub const PROTOCOL_VERSION: u8 = 1;
pub const PROTOCOL_REVISION: u8 = 19;
pub const APPLICATION_SOFTWARE_VERSION: &str = "1.0";

/// BACnet object types used by simulated devices and the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectType {
    Device,
    NetworkPort,
    AnalogValue,
    BinaryValue,
    MultiStateValue,
    CharacterstringValue,
}

/// Object identifier, serialized as `["<object-type>", <instance>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectIdentifier(pub ObjectType, pub u32);

impl ObjectIdentifier {
    pub fn object_type(&self) -> ObjectType {
        self.0
    }

    pub fn instance(&self) -> u32 {
        self.1
    }
}

/// Device object record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceObject {
    pub object_identifier: ObjectIdentifier,
    pub object_name: String,
    pub object_type: ObjectType,
    pub vendor_identifier: u16,
    pub vendor_name: String,
    pub model_name: String,
    pub protocol_version: u8,
    pub protocol_revision: u8,
    pub application_software_version: String,
    pub description: String,
    /// Present only on records that advertise APDU and status properties
    #[serde(flatten)]
    pub management: Option<DeviceManagement>,
}

/// APDU, segmentation and status properties of a device that routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceManagement {
    pub apdu_segment_timeout: u32,
    pub apdu_timeout: u32,
    pub number_of_apdu_retries: u8,
    pub max_apdu_length_accepted: u32,
    pub segmentation_supported: String,
    pub system_status: String,
    pub database_revision: u32,
    pub firmware_revision: String,
}

impl DeviceObject {
    /// Basic device record with the fixed vendor and protocol fields.
    pub fn new(device_id: u32, device_name: impl Into<String>) -> Self {
        let device_name = device_name.into();
        Self {
            object_identifier: ObjectIdentifier(ObjectType::Device, device_id),
            description: format!("Virtual VAV Box - {}", device_name),
            object_name: device_name,
            object_type: ObjectType::Device,
            vendor_identifier: VENDOR_IDENTIFIER,
            vendor_name: VENDOR_NAME.to_string(),
            model_name: "VAVBox".to_string(),
            protocol_version: PROTOCOL_VERSION,
            protocol_revision: PROTOCOL_REVISION,
            application_software_version: APPLICATION_SOFTWARE_VERSION.to_string(),
            management: None,
        }
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_vendor_name(mut self, vendor_name: impl Into<String>) -> Self {
        self.vendor_name = vendor_name.into();
        self
    }

    pub fn with_protocol_revision(mut self, protocol_revision: u8) -> Self {
        self.protocol_revision = protocol_revision;
        self
    }

    pub fn with_software_version(mut self, version: impl Into<String>) -> Self {
        self.application_software_version = version.into();
        self
    }

    pub fn with_management(mut self, management: DeviceManagement) -> Self {
        self.management = Some(management);
        self
    }

    pub fn device_id(&self) -> u32 {
        self.object_identifier.instance()
    }
}

/// Network port object record.
///
/// Virtual ports only carry the interface name and MAC; BACnet/IP ports
/// (router uplink) fill in the IP fields. Unset fields are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkPortObject {
    pub object_identifier: ObjectIdentifier,
    pub object_name: String,
    pub object_type: ObjectType,
    pub network_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_interface_name: Option<String>,
    pub mac_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_number: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_number_quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_subnet_mask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bacnet_ip_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bacnet_ip_udp_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes_pending: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_of_service: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<String>,
}

impl NetworkPortObject {
    /// Virtual network port attached to a named virtual network.
    pub fn virtual_port(network_name: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self {
            object_identifier: ObjectIdentifier(ObjectType::NetworkPort, 1),
            object_name: "VirtualPort".to_string(),
            object_type: ObjectType::NetworkPort,
            network_type: "virtual".to_string(),
            network_interface_name: Some(network_name.into()),
            mac_address: mac_address.into(),
            network_number: None,
            network_number_quality: None,
            ip_address: None,
            ip_subnet_mask: None,
            bacnet_ip_mode: None,
            bacnet_ip_udp_port: None,
            link_speed: None,
            changes_pending: None,
            out_of_service: None,
            protocol_level: None,
            reliability: None,
        }
    }

    /// Mark the port as configured and healthy, as the router ports are.
    pub fn operational(mut self) -> Self {
        self.changes_pending = Some(false);
        self.out_of_service = Some(false);
        self.protocol_level = Some("bacnet-application".to_string());
        self.reliability = Some("no-fault-detected".to_string());
        self
    }

    pub fn with_network_number(mut self, network_number: u16) -> Self {
        self.network_number = Some(network_number);
        self.network_number_quality = Some("configured".to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnalogValueObject {
    pub object_identifier: ObjectIdentifier,
    pub object_name: String,
    pub object_type: ObjectType,
    pub present_value: f64,
    pub description: String,
    pub units: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BinaryValueObject {
    pub object_identifier: ObjectIdentifier,
    pub object_name: String,
    pub object_type: ObjectType,
    pub present_value: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MultiStateValueObject {
    pub object_identifier: ObjectIdentifier,
    pub object_name: String,
    pub object_type: ObjectType,
    pub number_of_states: u32,
    pub state_text: Vec<String>,
    /// 1-based index into `state_text`
    pub present_value: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CharacterStringValueObject {
    pub object_identifier: ObjectIdentifier,
    pub object_name: String,
    pub object_type: ObjectType,
    pub present_value: String,
    pub description: String,
}

pub fn analog_value(
    object_id: u32,
    name: impl Into<String>,
    description: impl Into<String>,
    initial_value: f64,
    units: impl Into<String>,
) -> AnalogValueObject {
    AnalogValueObject {
        object_identifier: ObjectIdentifier(ObjectType::AnalogValue, object_id),
        object_name: name.into(),
        object_type: ObjectType::AnalogValue,
        present_value: initial_value,
        description: description.into(),
        units: units.into(),
    }
}

pub fn binary_value(
    object_id: u32,
    name: impl Into<String>,
    description: impl Into<String>,
    initial_value: bool,
) -> BinaryValueObject {
    BinaryValueObject {
        object_identifier: ObjectIdentifier(ObjectType::BinaryValue, object_id),
        object_name: name.into(),
        object_type: ObjectType::BinaryValue,
        present_value: initial_value,
        description: description.into(),
    }
}

pub fn multi_state_value(
    object_id: u32,
    name: impl Into<String>,
    description: impl Into<String>,
    states: Vec<String>,
    initial_state: u32,
) -> MultiStateValueObject {
    MultiStateValueObject {
        object_identifier: ObjectIdentifier(ObjectType::MultiStateValue, object_id),
        object_name: name.into(),
        object_type: ObjectType::MultiStateValue,
        number_of_states: states.len() as u32,
        state_text: states,
        present_value: initial_state,
        description: description.into(),
    }
}

pub fn character_string_value(
    object_id: u32,
    name: impl Into<String>,
    description: impl Into<String>,
    initial_value: impl Into<String>,
) -> CharacterStringValueObject {
    CharacterStringValueObject {
        object_identifier: ObjectIdentifier(ObjectType::CharacterstringValue, object_id),
        object_name: name.into(),
        object_type: ObjectType::CharacterstringValue,
        present_value: initial_value.into(),
        description: description.into(),
    }
}

/// A point object exposed by a simulated device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PointObject {
    Analog(AnalogValueObject),
    Binary(BinaryValueObject),
    MultiState(MultiStateValueObject),
    CharacterString(CharacterStringValueObject),
}

impl PointObject {
    pub fn object_identifier(&self) -> ObjectIdentifier {
        match self {
            PointObject::Analog(obj) => obj.object_identifier,
            PointObject::Binary(obj) => obj.object_identifier,
            PointObject::MultiState(obj) => obj.object_identifier,
            PointObject::CharacterString(obj) => obj.object_identifier,
        }
    }

    pub fn object_name(&self) -> &str {
        match self {
            PointObject::Analog(obj) => &obj.object_name,
            PointObject::Binary(obj) => &obj.object_name,
            PointObject::MultiState(obj) => &obj.object_name,
            PointObject::CharacterString(obj) => &obj.object_name,
        }
    }
}

/// Any object record that can appear in an application configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ObjectConfig {
    Device(DeviceObject),
    NetworkPort(NetworkPortObject),
    Point(PointObject),
}

/// Full object configuration for one simulated device application.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub device: DeviceObject,
    pub network_port: NetworkPortObject,
    pub points: Vec<PointObject>,
}

impl DeviceConfig {
    pub fn new(device: DeviceObject, network_port: NetworkPortObject) -> Self {
        Self {
            device,
            network_port,
            points: Vec::new(),
        }
    }

    /// Flatten into the ordered object list the protocol stack consumes.
    pub fn objects(&self) -> Vec<ObjectConfig> {
        let mut objects = Vec::with_capacity(self.points.len() + 2);
        objects.push(ObjectConfig::Device(self.device.clone()));
        objects.push(ObjectConfig::NetworkPort(self.network_port.clone()));
        objects.extend(self.points.iter().cloned().map(ObjectConfig::Point));
        objects
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.objects()).unwrap_or(serde_json::Value::Null)
    }
}

/// Translate human-readable unit text to a BACnet engineering-units name.
pub fn convert_unit_text(unit_text: &str) -> &'static str {
    match unit_text {
        "°F" | "degF" => "degrees-fahrenheit",
        "CFM" | "ft³/min" => "cubic-feet-per-minute",
        "fraction" => "percent",
        "sq ft" => "square-feet",
        "cu ft" => "cubic-feet",
        _ => "no-units",
    }
}

/// Normalize a hex MAC string to whole octets (`0x1` -> `0x01`).
pub fn padded_octets(mac: &str) -> String {
    let digits = mac.replace("0x", "");
    if digits.len() % 2 != 0 {
        format!("0x0{}", digits)
    } else {
        format!("0x{}", digits)
    }
}
