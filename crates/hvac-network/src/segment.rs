//! Network Segments
//!
//! A segment is one virtual BACnet network: the central plant, or one AHU
//! together with the terminal units it feeds.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::device::DeviceHandle;
use crate::transport::NetworkHandle;

/// Network number of the central plant segment.
pub const CENTRAL_PLANT_NETWORK: u16 = 1;
pub const CENTRAL_PLANT_NAME: &str = "central-plant";

/// AHU networks are numbered 100, 200, 300, ...
pub const AHU_NETWORK_BASE: u16 = 100;
pub const AHU_NETWORK_STRIDE: u16 = 100;

/// Network number of the external BACnet/IP side of the router.
pub const BACNET_IP_NETWORK: u16 = 65534;

/// Network number for the AHU at `ahu_index` in enumeration order.
///
/// Returns `None` once the number would run into the BACnet/IP network.
pub fn ahu_network_number(ahu_index: usize) -> Option<u16> {
    let offset = u16::try_from(ahu_index)
        .ok()?
        .checked_mul(AHU_NETWORK_STRIDE)?;
    AHU_NETWORK_BASE
        .checked_add(offset)
        .filter(|number| *number < BACNET_IP_NETWORK)
}

/// Segment name for an AHU (`"AHU-1"` -> `"ahu-ahu-1"`).
pub fn ahu_network_name(ahu_name: &str) -> String {
    format!("ahu-{}", ahu_name.to_lowercase())
}

/// A numbered virtual network and the devices registered on it.
#[derive(Debug)]
pub struct NetworkSegment {
    number: u16,
    name: String,
    linked_ahu: Option<String>,
    handle: NetworkHandle,
    /// Registered devices, in registration order
    devices: RwLock<Vec<DeviceHandle>>,
    /// Serializes registrations on this segment
    registration: Mutex<()>,
}

impl NetworkSegment {
    pub(crate) fn new(
        number: u16,
        name: String,
        linked_ahu: Option<String>,
        handle: NetworkHandle,
    ) -> Self {
        Self {
            number,
            name,
            linked_ahu,
            handle,
            devices: RwLock::new(Vec::new()),
            registration: Mutex::new(()),
        }
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the AHU this segment serves (`None` for the central plant).
    pub fn linked_ahu(&self) -> Option<&str> {
        self.linked_ahu.as_deref()
    }

    pub fn handle(&self) -> &NetworkHandle {
        &self.handle
    }

    /// Interface name devices attach with.
    pub fn network_interface_name(&self) -> &str {
        &self.handle.interface_name
    }

    pub fn is_central_plant(&self) -> bool {
        self.number == CENTRAL_PLANT_NETWORK
    }

    /// Snapshot of registered devices in registration order.
    pub fn devices(&self) -> Vec<DeviceHandle> {
        self.devices.read().clone()
    }

    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    pub fn summary(&self) -> SegmentSummary {
        SegmentSummary {
            name: self.name.clone(),
            ahu: self.linked_ahu.clone(),
            device_count: self.device_count(),
        }
    }

    pub(crate) fn push_device(&self, device: DeviceHandle) {
        self.devices.write().push(device);
    }

    pub(crate) async fn lock_registration(&self) -> MutexGuard<'_, ()> {
        self.registration.lock().await
    }
}

/// Per-segment entry of a topology summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub name: String,
    pub ahu: Option<String>,
    pub device_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ahu_network_numbers() {
        assert_eq!(ahu_network_number(0), Some(100));
        assert_eq!(ahu_network_number(1), Some(200));
        assert_eq!(ahu_network_number(9), Some(1000));
        assert_eq!(ahu_network_number(654), Some(65500));
        assert_eq!(ahu_network_number(655), None);
        assert_eq!(ahu_network_number(usize::MAX), None);
    }

    #[test]
    fn test_ahu_network_name() {
        assert_eq!(ahu_network_name("AHU-A"), "ahu-ahu-a");
        assert_eq!(ahu_network_name("Ahu1"), "ahu-ahu1");
    }
}
