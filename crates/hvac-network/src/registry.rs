//! Topology Registry
//!
//! Owns every network segment and the flat list of registered devices.
//! Segment numbers are assigned once and never reused: the central plant is
//! always network 1 and AHU networks are numbered by enumeration position.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::device::DeviceHandle;
use crate::error::{Result, TopologyError};
use crate::report::TopologyReport;
use crate::segment::{
    ahu_network_name, ahu_network_number, NetworkSegment, SegmentSummary, CENTRAL_PLANT_NAME,
    CENTRAL_PLANT_NETWORK,
};
use crate::transport::{NetworkTransport, VirtualTransport};

/// Aggregate counts over the whole topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySummary {
    pub total_networks: usize,
    pub total_devices: usize,
    /// Per-network breakdown keyed by network number
    pub networks: BTreeMap<u16, SegmentSummary>,
}

/// Registry of network segments.
pub struct TopologyRegistry {
    transport: Arc<dyn NetworkTransport>,
    /// Segments keyed (and therefore ordered) by network number
    segments: RwLock<BTreeMap<u16, Arc<NetworkSegment>>>,
    /// Every registered device, in registration order. Held for writing
    /// while a device is published so segment counts and this list agree;
    /// always taken before any segment's device lock.
    devices: RwLock<Vec<DeviceHandle>>,
}

impl Default for TopologyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TopologyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopologyRegistry")
            .field("segments", &self.segments.read().keys().collect::<Vec<_>>())
            .field("devices", &self.devices.read().len())
            .finish()
    }
}

impl TopologyRegistry {
    /// Registry backed by in-process virtual networks.
    pub fn new() -> Self {
        Self::with_transport(Arc::new(VirtualTransport))
    }

    pub fn with_transport(transport: Arc<dyn NetworkTransport>) -> Self {
        Self {
            transport,
            segments: RwLock::new(BTreeMap::new()),
            devices: RwLock::new(Vec::new()),
        }
    }

    /// Create the central plant network (network 1).
    pub fn create_central_plant_segment(&self) -> Result<Arc<NetworkSegment>> {
        info!("Creating Central Plant network (Network {})", CENTRAL_PLANT_NETWORK);
        self.insert_segment(CENTRAL_PLANT_NETWORK, CENTRAL_PLANT_NAME.to_string(), None)
    }

    /// Create the network for an AHU at `ahu_index` in enumeration order.
    pub fn create_ahu_segment(&self, ahu_name: &str, ahu_index: usize) -> Result<Arc<NetworkSegment>> {
        let number = ahu_network_number(ahu_index)
            .ok_or(TopologyError::SegmentNumberOverflow { ahu_index })?;
        info!("Creating AHU network for {} (Network {})", ahu_name, number);
        self.insert_segment(number, ahu_network_name(ahu_name), Some(ahu_name.to_string()))
    }

    /// Check-then-insert under a single write guard.
    fn insert_segment(
        &self,
        number: u16,
        name: String,
        linked_ahu: Option<String>,
    ) -> Result<Arc<NetworkSegment>> {
        let mut segments = self.segments.write();

        if let Some(existing) = segments.get(&number) {
            return Err(TopologyError::DuplicateSegment {
                number,
                name: existing.name().to_string(),
            });
        }
        if let Some(existing) = segments.values().find(|s| s.name() == name) {
            return Err(TopologyError::DuplicateSegment {
                number: existing.number(),
                name,
            });
        }

        let handle = self.transport.open_network(&name);
        let segment = Arc::new(NetworkSegment::new(number, name, linked_ahu, handle));
        segments.insert(number, Arc::clone(&segment));
        Ok(segment)
    }

    pub fn segment(&self, number: u16) -> Option<Arc<NetworkSegment>> {
        self.segments.read().get(&number).cloned()
    }

    /// The network serving an AHU, if one was created.
    pub fn segment_for_ahu(&self, ahu_name: &str) -> Option<Arc<NetworkSegment>> {
        self.segments
            .read()
            .values()
            .find(|segment| segment.linked_ahu() == Some(ahu_name))
            .cloned()
    }

    pub fn central_plant_segment(&self) -> Option<Arc<NetworkSegment>> {
        self.segment(CENTRAL_PLANT_NETWORK)
    }

    /// All segments ordered by network number.
    pub fn all_segments(&self) -> Vec<Arc<NetworkSegment>> {
        self.segments.read().values().cloned().collect()
    }

    /// Whether `segment` is the instance this registry holds under its number.
    pub fn contains(&self, segment: &Arc<NetworkSegment>) -> bool {
        self.segments
            .read()
            .get(&segment.number())
            .is_some_and(|held| Arc::ptr_eq(held, segment))
    }

    /// Every registered device, in registration order.
    pub fn all_devices(&self) -> Vec<DeviceHandle> {
        self.devices.read().clone()
    }

    pub fn find_device(&self, device_id: u32) -> Option<DeviceHandle> {
        self.devices
            .read()
            .iter()
            .find(|device| device.device_id() == device_id)
            .cloned()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// Total devices across all segments.
    pub fn device_count(&self) -> usize {
        let _devices = self.devices.read();
        self.segments
            .read()
            .values()
            .map(|segment| segment.device_count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.read().is_empty()
    }

    /// Append a device to its segment and to the global list as one step.
    pub(crate) fn publish_device(&self, segment: &NetworkSegment, device: DeviceHandle) {
        let mut devices = self.devices.write();
        segment.push_device(device.clone());
        devices.push(device);
    }

    /// Snapshot of every segment and the device total.
    ///
    /// Taken while publishing is held off, so `total_devices` always
    /// matches the length of [`all_devices`](Self::all_devices) at that instant.
    pub fn summary(&self) -> TopologySummary {
        let _devices = self.devices.read();
        let segments = self.segments.read();
        let networks: BTreeMap<u16, SegmentSummary> = segments
            .iter()
            .map(|(number, segment)| (*number, segment.summary()))
            .collect();

        TopologySummary {
            total_networks: segments.len(),
            total_devices: networks.values().map(|n| n.device_count).sum(),
            networks,
        }
    }

    /// Human-readable topology report.
    pub fn report(&self) -> TopologyReport<'_> {
        TopologyReport::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ahu_segments_follow_enumeration_order() {
        let registry = TopologyRegistry::new();
        let numbers: Vec<u16> = ["AHU-C", "AHU-A", "AHU-B"]
            .iter()
            .enumerate()
            .map(|(index, name)| registry.create_ahu_segment(name, index).unwrap().number())
            .collect();
        assert_eq!(numbers, vec![100, 200, 300]);

        let segment = registry.segment_for_ahu("AHU-A").unwrap();
        assert_eq!(segment.number(), 200);
        assert_eq!(segment.name(), "ahu-ahu-a");
        assert_eq!(segment.network_interface_name(), "ahu-ahu-a");
    }

    #[test]
    fn test_central_plant_is_network_one() {
        let registry = TopologyRegistry::new();
        registry.create_ahu_segment("AHU1", 0).unwrap();
        let plant = registry.create_central_plant_segment().unwrap();
        assert_eq!(plant.number(), 1);
        assert_eq!(plant.name(), "central-plant");
        assert!(plant.linked_ahu().is_none());
        assert!(plant.is_central_plant());

        let ordered: Vec<u16> = registry.all_segments().iter().map(|s| s.number()).collect();
        assert_eq!(ordered, vec![1, 100]);
    }

    #[test]
    fn test_duplicate_central_plant_rejected() {
        let registry = TopologyRegistry::new();
        let first = registry.create_central_plant_segment().unwrap();
        let err = registry.create_central_plant_segment().unwrap_err();
        assert_eq!(
            err,
            TopologyError::DuplicateSegment {
                number: 1,
                name: "central-plant".into()
            }
        );
        assert_eq!(registry.segment_count(), 1);
        assert!(registry.contains(&first));
    }

    #[test]
    fn test_duplicate_ahu_index_rejected() {
        let registry = TopologyRegistry::new();
        registry.create_ahu_segment("AHU1", 0).unwrap();
        let err = registry.create_ahu_segment("AHU2", 0).unwrap_err();
        assert!(matches!(err, TopologyError::DuplicateSegment { number: 100, .. }));
        assert!(registry.segment_for_ahu("AHU2").is_none());
    }

    #[test]
    fn test_duplicate_segment_name_rejected() {
        let registry = TopologyRegistry::new();
        registry.create_ahu_segment("AHU1", 0).unwrap();
        let err = registry.create_ahu_segment("ahu1", 1).unwrap_err();
        assert_eq!(
            err,
            TopologyError::DuplicateSegment {
                number: 100,
                name: "ahu-ahu1".into()
            }
        );
        assert_eq!(registry.segment_count(), 1);
    }

    #[test]
    fn test_overflowing_index_rejected() {
        let registry = TopologyRegistry::new();
        let err = registry.create_ahu_segment("AHU-X", 1000).unwrap_err();
        assert_eq!(err, TopologyError::SegmentNumberOverflow { ahu_index: 1000 });
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lookups_on_missing_segments() {
        let registry = TopologyRegistry::new();
        assert!(registry.central_plant_segment().is_none());
        assert!(registry.segment_for_ahu("AHU1").is_none());
        assert!(registry.segment(100).is_none());
    }

    #[test]
    fn test_contains_rejects_foreign_segment() {
        let registry = TopologyRegistry::new();
        let other = TopologyRegistry::new();
        registry.create_central_plant_segment().unwrap();
        let foreign = other.create_central_plant_segment().unwrap();
        assert!(!registry.contains(&foreign));
    }

    #[test]
    fn test_empty_summary() {
        let summary = TopologyRegistry::new().summary();
        assert_eq!(summary.total_networks, 0);
        assert_eq!(summary.total_devices, 0);
        assert!(summary.networks.is_empty());
    }

    #[test]
    fn test_summary_breakdown() {
        let registry = TopologyRegistry::new();
        registry.create_central_plant_segment().unwrap();
        registry.create_ahu_segment("AHU1", 0).unwrap();

        let summary = registry.summary();
        assert_eq!(summary.total_networks, 2);
        assert_eq!(
            summary.networks.get(&100),
            Some(&SegmentSummary {
                name: "ahu-ahu1".into(),
                ahu: Some("AHU1".into()),
                device_count: 0,
            })
        );
        assert_eq!(summary.networks.get(&1).unwrap().ahu, None);
    }

    fn handle(device_id: u32) -> DeviceHandle {
        use crate::objects::{DeviceConfig, DeviceObject, NetworkPortObject};
        DeviceHandle::new(DeviceConfig::new(
            DeviceObject::new(device_id, format!("Device-{device_id}")),
            NetworkPortObject::virtual_port("ahu-ahu1", "0x0001"),
        ))
    }

    #[test]
    fn test_publish_device_updates_segment_and_global_list() {
        let registry = TopologyRegistry::new();
        let segment = registry.create_ahu_segment("AHU1", 0).unwrap();

        registry.publish_device(&segment, handle(1000));
        registry.publish_device(&segment, handle(1001));

        assert_eq!(segment.device_count(), 2);
        assert_eq!(registry.all_devices().len(), 2);
        assert_eq!(registry.summary().total_devices, 2);
        assert_eq!(registry.device_count(), 2);
        assert_eq!(registry.find_device(1001), Some(segment.devices()[1].clone()));
    }

    #[test]
    fn test_summary_never_runs_ahead_of_device_list() {
        let registry = TopologyRegistry::new();
        let segments = [
            registry.create_ahu_segment("AHU1", 0).unwrap(),
            registry.create_ahu_segment("AHU2", 1).unwrap(),
        ];
        let done = std::sync::atomic::AtomicBool::new(false);

        std::thread::scope(|scope| {
            let reader = scope.spawn(|| {
                while !done.load(std::sync::atomic::Ordering::Acquire) {
                    let total = registry.summary().total_devices;
                    // The list only grows, so a later read can never be shorter
                    assert!(total <= registry.all_devices().len());
                    assert!(registry.device_count() <= registry.all_devices().len());
                }
            });

            let writers: Vec<_> = segments
                .iter()
                .enumerate()
                .map(|(offset, segment)| {
                    let registry = &registry;
                    scope.spawn(move || {
                        for n in 0..500 {
                            registry.publish_device(segment, handle(1000 + n * 2 + offset as u32));
                        }
                    })
                })
                .collect();
            for writer in writers {
                writer.join().unwrap();
            }
            done.store(true, std::sync::atomic::Ordering::Release);
            reader.join().unwrap();
        });

        assert_eq!(registry.summary().total_devices, 1000);
        assert_eq!(registry.all_devices().len(), 1000);
    }
}
