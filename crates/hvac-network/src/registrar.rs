//! Device Registrar
//!
//! Binds equipment to a network segment: allocates the device identity, asks
//! the equipment to instantiate its protocol device, then records the handle
//! on the segment and in the global device list.
//!
//! Registration is strictly additive. A declined device leaves the segment
//! and the global list exactly as they were.

use std::sync::Arc;

use tracing::{info, warn};

use crate::device::DeviceHandle;
use crate::equipment::{DeviceRequest, Equipment};
use crate::error::{Result, TopologyError};
use crate::identity::IdentityAllocator;
use crate::registry::TopologyRegistry;
use crate::segment::NetworkSegment;

/// Optional overrides for a registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    pub device_id: Option<u32>,
    pub device_name: Option<String>,
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_id(mut self, device_id: u32) -> Self {
        self.device_id = Some(device_id);
        self
    }

    pub fn with_device_name(mut self, device_name: impl Into<String>) -> Self {
        self.device_name = Some(device_name.into());
        self
    }
}

/// Default device name: `"<KindTypeName>-<equipment name>"`.
pub fn default_device_name(equipment: &dyn Equipment) -> String {
    format!("{}-{}", equipment.kind().type_name(), equipment.name())
}

/// Registers equipment devices into a topology.
#[derive(Debug, Clone)]
pub struct DeviceRegistrar {
    registry: Arc<TopologyRegistry>,
    identity: Arc<IdentityAllocator>,
}

impl DeviceRegistrar {
    pub fn new(registry: Arc<TopologyRegistry>, identity: Arc<IdentityAllocator>) -> Self {
        Self { registry, identity }
    }

    pub fn registry(&self) -> &Arc<TopologyRegistry> {
        &self.registry
    }

    pub fn identity(&self) -> &Arc<IdentityAllocator> {
        &self.identity
    }

    /// Register `equipment` as a device on `segment`.
    ///
    /// Registrations on the same segment are serialized from MAC allocation
    /// through the final append; different segments proceed independently.
    pub async fn register(
        &self,
        equipment: &dyn Equipment,
        segment: &Arc<NetworkSegment>,
        options: RegisterOptions,
    ) -> Result<DeviceHandle> {
        if !self.registry.contains(segment) {
            return Err(TopologyError::UnknownSegment(segment.number()));
        }

        let device_id = options
            .device_id
            .unwrap_or_else(|| self.identity.next_device_id());
        let device_name = options
            .device_name
            .unwrap_or_else(|| default_device_name(equipment));

        let _registration = segment.lock_registration().await;

        let mac_address = self.identity.next_mac(segment.number());
        info!(
            "Adding {} (ID: {}, MAC: {}) to {}",
            device_name,
            device_id,
            mac_address,
            segment.name()
        );

        let request = DeviceRequest {
            device_id,
            device_name: device_name.clone(),
            network_interface_name: segment.network_interface_name().to_string(),
            mac_address,
        };

        let Some(device) = equipment.create_protocol_device(request).await else {
            warn!("Device creation declined for {} on {}", device_name, segment.name());
            return Err(TopologyError::DeviceCreationFailed {
                device_name,
                segment: segment.name().to_string(),
            });
        };

        if !device.place(segment.number(), segment.name()) {
            warn!(
                "{} returned a device already placed on network {:?}",
                equipment.name(),
                device.segment_number()
            );
            return Err(TopologyError::DeviceCreationFailed {
                device_name,
                segment: segment.name().to_string(),
            });
        }

        self.registry.publish_device(segment, device.clone());
        equipment.attach_protocol_stack(device.clone());

        Ok(device)
    }
}
