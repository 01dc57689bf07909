//! Protocol Stack
//!
//! The seam between the topology core and the BACnet protocol layer. A stack
//! turns a device configuration into a live device handle.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::device::DeviceHandle;
use crate::objects::DeviceConfig;

/// Errors raised when a stack refuses to instantiate a device.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    #[error("MAC {mac} is already bound on {interface}")]
    AddressInUse { interface: String, mac: String },

    #[error("Device instance {0} is already bound")]
    DuplicateInstance(u32),

    #[error("Invalid device configuration: {0}")]
    InvalidConfig(String),
}

/// Instantiates devices from object configurations.
#[async_trait]
pub trait ProtocolStack: Send + Sync {
    async fn instantiate(&self, config: DeviceConfig) -> Result<DeviceHandle, StackError>;
}

/// In-process stack binding devices to virtual networks.
///
/// Enforces what a real virtual network would: one device per MAC on an
/// interface, and one device per instance number.
#[derive(Debug, Default)]
pub struct VirtualStack {
    /// Device instance by (interface, MAC)
    bindings: DashMap<(String, String), u32>,
    /// Interface by device instance
    instances: DashMap<u32, String>,
}

impl VirtualStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of devices bound so far.
    pub fn bound_devices(&self) -> usize {
        self.instances.len()
    }

    pub fn is_bound(&self, interface: &str, mac: &str) -> bool {
        self.bindings
            .contains_key(&(interface.to_string(), mac.to_string()))
    }
}

#[async_trait]
impl ProtocolStack for VirtualStack {
    async fn instantiate(&self, config: DeviceConfig) -> Result<DeviceHandle, StackError> {
        let device_id = config.device.device_id();
        let interface = config
            .network_port
            .network_interface_name
            .clone()
            .ok_or_else(|| StackError::InvalidConfig("network port has no interface name".into()))?;
        let mac = config.network_port.mac_address.clone();

        let instance_entry = match self.instances.entry(device_id) {
            Entry::Occupied(_) => return Err(StackError::DuplicateInstance(device_id)),
            Entry::Vacant(entry) => entry,
        };

        match self.bindings.entry((interface.clone(), mac.clone())) {
            Entry::Occupied(_) => return Err(StackError::AddressInUse { interface, mac }),
            Entry::Vacant(entry) => {
                entry.insert(device_id);
            }
        }
        instance_entry.insert(interface.clone());

        debug!("Bound device {} to {} at {}", device_id, interface, mac);
        Ok(DeviceHandle::new(config))
    }
}
