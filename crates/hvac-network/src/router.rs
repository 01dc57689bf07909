//! IP-to-VLAN Router
//!
//! Object configuration for the router bridging external BACnet/IP traffic
//! onto the internal virtual networks: one BACnet/IP port plus one virtual
//! port per segment.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{Result, TopologyError};
use crate::objects::{DeviceManagement, DeviceObject, NetworkPortObject, ObjectConfig, ObjectIdentifier, ObjectType};
use crate::registry::TopologyRegistry;
use crate::segment::BACNET_IP_NETWORK;

pub const DEFAULT_BACNET_PORT: u16 = 47808;
pub const DEFAULT_ROUTER_DEVICE_ID: u32 = 999;
pub const DEFAULT_ROUTER_NAME: &str = "BACnet-Router";

/// Prefix length assumed when the address carries none.
const DEFAULT_PREFIX_LEN: u8 = 16;

/// The router owns this MAC on every virtual network.
const ROUTER_VLAN_MAC: &str = "0x01";

const ROUTER_MODEL: &str = "ACE-RTR-9000";
const ROUTER_DESCRIPTION: &str = "IP-to-VLAN Router for HVAC Simulation";
const ROUTER_VENDOR_NAME: &str = "ACEHVACNetwork";
const ROUTER_PROTOCOL_REVISION: u8 = 22;

/// Firmware revision for a named device: `<crate version>-<8 hex digits>`.
///
/// The suffix is the start of the SHA-256 of the name, so it is stable
/// across runs and differs between devices.
pub fn firmware_revision(device_name: &str) -> String {
    let digest = Sha256::digest(device_name.as_bytes());
    let suffix: String = digest[..4].iter().map(|byte| format!("{:02x}", byte)).collect();
    format!("{}-{}", env!("CARGO_PKG_VERSION"), suffix)
}

fn router_management(device_name: &str) -> DeviceManagement {
    DeviceManagement {
        apdu_segment_timeout: 1000,
        apdu_timeout: 3000,
        number_of_apdu_retries: 3,
        max_apdu_length_accepted: 1024,
        segmentation_supported: "segmented-both".to_string(),
        system_status: "operational".to_string(),
        database_revision: 1,
        firmware_revision: firmware_revision(device_name),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterOptions {
    /// Address in CIDR notation, e.g. `10.88.0.32/16`
    pub ip_address: String,
    pub bacnet_port: u16,
    pub device_id: u32,
    pub device_name: String,
}

impl RouterOptions {
    pub fn new(ip_address: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            bacnet_port: DEFAULT_BACNET_PORT,
            device_id: DEFAULT_ROUTER_DEVICE_ID,
            device_name: DEFAULT_ROUTER_NAME.to_string(),
        }
    }
}

/// Parse `a.b.c.d[/prefix]` into the address and its subnet mask.
pub fn parse_cidr(cidr: &str) -> Result<(Ipv4Addr, Ipv4Addr)> {
    let (addr, prefix) = match cidr.split_once('/') {
        Some((addr, prefix)) => {
            let prefix: u8 = prefix
                .parse()
                .map_err(|_| TopologyError::InvalidAddress(cidr.to_string()))?;
            (addr, prefix)
        }
        None => (cidr, DEFAULT_PREFIX_LEN),
    };

    if prefix > 32 {
        return Err(TopologyError::InvalidAddress(cidr.to_string()));
    }
    let ip: Ipv4Addr = addr
        .parse()
        .map_err(|_| TopologyError::InvalidAddress(cidr.to_string()))?;
    let mask = u32::MAX.checked_shl(32 - prefix as u32).unwrap_or(0);

    Ok((ip, Ipv4Addr::from(mask)))
}

/// Router device record and its ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    pub device: DeviceObject,
    /// BACnet/IP port first, then one virtual port per network in ascending order
    pub ports: Vec<NetworkPortObject>,
}

impl RouterConfig {
    /// Build the router for every segment currently in `registry`.
    pub fn build(registry: &TopologyRegistry, options: &RouterOptions) -> Result<Self> {
        let segments = registry.all_segments();
        if segments.is_empty() {
            return Err(TopologyError::NoSegments);
        }

        let (ip, mask) = parse_cidr(&options.ip_address)?;
        info!("Creating IP-to-VLAN router: {}", options.device_name);
        info!("  IP Address: {}", ip);
        info!("  Subnet Mask: {}", mask);
        info!("  BACnet Port: {}", options.bacnet_port);
        info!("  Connected VLANs: {}", segments.len());

        let device = DeviceObject::new(options.device_id, &options.device_name)
            .with_model(ROUTER_MODEL)
            .with_description(ROUTER_DESCRIPTION)
            .with_vendor_name(ROUTER_VENDOR_NAME)
            .with_protocol_revision(ROUTER_PROTOCOL_REVISION)
            .with_software_version(env!("CARGO_PKG_VERSION"))
            .with_management(router_management(&options.device_name));

        let mut ip_port = NetworkPortObject::virtual_port(String::new(), format!("{}:{}", ip, options.bacnet_port))
            .with_network_number(BACNET_IP_NETWORK)
            .operational();
        ip_port.object_name = "BACnet-IP-Port".to_string();
        ip_port.network_type = "ipv4".to_string();
        ip_port.network_interface_name = None;
        ip_port.ip_address = Some(ip.to_string());
        ip_port.ip_subnet_mask = Some(mask.to_string());
        ip_port.bacnet_ip_mode = Some("normal".to_string());
        ip_port.bacnet_ip_udp_port = Some(options.bacnet_port);
        ip_port.link_speed = Some(0.0);
        info!("    Port 1: BACnet/IP (Network {})", BACNET_IP_NETWORK);

        let mut ports = vec![ip_port];
        for (port_id, segment) in (2..).zip(&segments) {
            let mut port = NetworkPortObject::virtual_port(segment.name(), ROUTER_VLAN_MAC)
                .with_network_number(segment.number())
                .operational();
            port.object_identifier = ObjectIdentifier(ObjectType::NetworkPort, port_id);
            port.object_name = format!("VLAN-{}", segment.name());
            info!("    Port {}: {} (Network {})", port_id, segment.name(), segment.number());
            ports.push(port);
        }

        info!("Router configured with {} network ports", ports.len());
        Ok(Self { device, ports })
    }

    /// Flat object list: device first, then ports.
    pub fn objects(&self) -> Vec<ObjectConfig> {
        std::iter::once(ObjectConfig::Device(self.device.clone()))
            .chain(self.ports.iter().cloned().map(ObjectConfig::NetworkPort))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.objects()).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_cidr() {
        let (ip, mask) = parse_cidr("10.88.0.32/16").unwrap();
        assert_eq!(ip, Ipv4Addr::new(10, 88, 0, 32));
        assert_eq!(mask, Ipv4Addr::new(255, 255, 0, 0));

        assert_eq!(parse_cidr("192.168.1.5/24").unwrap().1, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(parse_cidr("192.168.1.5/20").unwrap().1, Ipv4Addr::new(255, 255, 240, 0));
        assert_eq!(parse_cidr("192.168.1.5/0").unwrap().1, Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(parse_cidr("192.168.1.5/32").unwrap().1, Ipv4Addr::new(255, 255, 255, 255));

        // No prefix means /16
        assert_eq!(parse_cidr("172.16.4.1").unwrap().1, Ipv4Addr::new(255, 255, 0, 0));
    }

    #[test]
    fn test_parse_cidr_rejects_garbage() {
        for bad in ["10.88.0.32/33", "10.88.0/16", "router/16", "10.0.0.1/x"] {
            assert_eq!(
                parse_cidr(bad),
                Err(TopologyError::InvalidAddress(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_build_requires_segments() {
        let registry = TopologyRegistry::new();
        let err = RouterConfig::build(&registry, &RouterOptions::new("10.0.0.1/24")).unwrap_err();
        assert_eq!(err, TopologyError::NoSegments);
    }

    #[test]
    fn test_router_ports() {
        let registry = TopologyRegistry::new();
        registry.create_ahu_segment("AHU1", 0).unwrap();
        registry.create_central_plant_segment().unwrap();

        let router = RouterConfig::build(&registry, &RouterOptions::new("10.88.0.32/16")).unwrap();
        assert_eq!(router.device.device_id(), 999);
        assert_eq!(router.device.object_name, "BACnet-Router");
        assert_eq!(router.device.model_name, "ACE-RTR-9000");
        assert_eq!(router.ports.len(), 3);

        let uplink = serde_json::to_value(&router.ports[0]).unwrap();
        assert_eq!(
            uplink,
            json!({
                "object-identifier": ["network-port", 1],
                "object-name": "BACnet-IP-Port",
                "object-type": "network-port",
                "network-type": "ipv4",
                "mac-address": "10.88.0.32:47808",
                "network-number": 65534,
                "network-number-quality": "configured",
                "ip-address": "10.88.0.32",
                "ip-subnet-mask": "255.255.0.0",
                "bacnet-ip-mode": "normal",
                "bacnet-ip-udp-port": 47808,
                "link-speed": 0.0,
                "changes-pending": false,
                "out-of-service": false,
                "protocol-level": "bacnet-application",
                "reliability": "no-fault-detected"
            })
        );

        // Virtual ports follow network number order
        let plant = &router.ports[1];
        assert_eq!(plant.object_identifier, ObjectIdentifier(ObjectType::NetworkPort, 2));
        assert_eq!(plant.object_name, "VLAN-central-plant");
        assert_eq!(plant.network_number, Some(1));
        assert_eq!(plant.mac_address, "0x01");

        let ahu = &router.ports[2];
        assert_eq!(ahu.object_identifier.instance(), 3);
        assert_eq!(ahu.network_interface_name.as_deref(), Some("ahu-ahu1"));
        assert_eq!(ahu.network_number, Some(100));
    }

    #[test]
    fn test_router_device_record() {
        let registry = TopologyRegistry::new();
        registry.create_central_plant_segment().unwrap();

        let router = RouterConfig::build(&registry, &RouterOptions::new("10.88.0.32/16")).unwrap();
        let firmware = firmware_revision("BACnet-Router");
        assert_eq!(
            serde_json::to_value(&router.device).unwrap(),
            json!({
                "object-identifier": ["device", 999],
                "object-name": "BACnet-Router",
                "object-type": "device",
                "vendor-identifier": 999,
                "vendor-name": "ACEHVACNetwork",
                "model-name": "ACE-RTR-9000",
                "protocol-version": 1,
                "protocol-revision": 22,
                "application-software-version": env!("CARGO_PKG_VERSION"),
                "description": "IP-to-VLAN Router for HVAC Simulation",
                "apdu-segment-timeout": 1000,
                "apdu-timeout": 3000,
                "number-of-apdu-retries": 3,
                "max-apdu-length-accepted": 1024,
                "segmentation-supported": "segmented-both",
                "system-status": "operational",
                "database-revision": 1,
                "firmware-revision": firmware
            })
        );

        let parsed: DeviceObject = serde_json::from_value(router.to_json()[0].clone()).unwrap();
        assert_eq!(parsed, router.device);
        assert_eq!(parsed.management.unwrap().apdu_timeout, 3000);
    }

    #[test]
    fn test_firmware_revision_is_stable_per_name() {
        let first = firmware_revision("BACnet-Router");
        assert_eq!(first, firmware_revision("BACnet-Router"));
        assert_ne!(first, firmware_revision("Edge-Router"));

        let (version, suffix) = first.rsplit_once('-').unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_objects_and_json() {
        let registry = TopologyRegistry::new();
        registry.create_central_plant_segment().unwrap();
        let options = RouterOptions {
            bacnet_port: 47809,
            device_id: 4000,
            ..RouterOptions::new("192.168.0.10/24")
        };

        let router = RouterConfig::build(&registry, &options).unwrap();
        assert_eq!(router.objects().len(), 3);

        let json = router.to_json();
        assert_eq!(json[0]["object-identifier"], json!(["device", 4000]));
        assert_eq!(json[1]["mac-address"], "192.168.0.10:47809");
        assert_eq!(json[2]["object-name"], "VLAN-central-plant");
    }
}
