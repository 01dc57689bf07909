//! Device Handles
//!
//! A `DeviceHandle` is the protocol stack's representation of one
//! addressable device. Handles are cheap to clone and shared between the
//! owning segment, the global device list and the equipment they belong to.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::equipment::{PointValue, ProcessVariables};
use crate::objects::{DeviceConfig, ObjectConfig, PointObject};

/// Minimum change before an analog present-value is rewritten.
const ANALOG_EPSILON: f64 = 0.001;

/// Where a device sits in the topology, stamped once at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub segment_number: u16,
    pub segment_name: String,
    pub registered_at: DateTime<Utc>,
}

/// Shared handle to an instantiated device.
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    inner: Arc<DeviceInner>,
}

#[derive(Debug)]
struct DeviceInner {
    config: RwLock<DeviceConfig>,
    placement: OnceLock<Placement>,
}

impl DeviceHandle {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                config: RwLock::new(config),
                placement: OnceLock::new(),
            }),
        }
    }

    /// BACnet device instance number
    pub fn device_id(&self) -> u32 {
        self.inner.config.read().device.device_id()
    }

    /// Display name (the device object's name)
    pub fn name(&self) -> String {
        self.inner.config.read().device.object_name.clone()
    }

    pub fn mac_address(&self) -> String {
        self.inner.config.read().network_port.mac_address.clone()
    }

    pub fn network_interface_name(&self) -> Option<String> {
        self.inner
            .config
            .read()
            .network_port
            .network_interface_name
            .clone()
    }

    /// Snapshot of the device's object records.
    pub fn objects(&self) -> Vec<ObjectConfig> {
        self.inner.config.read().objects()
    }

    pub fn point_count(&self) -> usize {
        self.inner.config.read().points.len()
    }

    /// Current present-value of a named point.
    pub fn present_value(&self, point_name: &str) -> Option<PointValue> {
        let config = self.inner.config.read();
        config
            .points
            .iter()
            .find(|point| point.object_name() == point_name)
            .map(|point| match point {
                PointObject::Analog(obj) => PointValue::Number(obj.present_value),
                PointObject::Binary(obj) => PointValue::Bool(obj.present_value),
                PointObject::MultiState(obj) => obj
                    .state_text
                    .get((obj.present_value as usize).saturating_sub(1))
                    .map(|state| PointValue::Text(state.clone()))
                    .unwrap_or(PointValue::Number(obj.present_value as f64)),
                PointObject::CharacterString(obj) => PointValue::Text(obj.present_value.clone()),
            })
    }

    /// Topology placement, if the device has been registered.
    pub fn placement(&self) -> Option<&Placement> {
        self.inner.placement.get()
    }

    pub fn segment_number(&self) -> Option<u16> {
        self.placement().map(|p| p.segment_number)
    }

    pub fn segment_name(&self) -> Option<&str> {
        self.placement().map(|p| p.segment_name.as_str())
    }

    /// Stamp the handle with its segment. Returns false if already placed.
    pub(crate) fn place(&self, segment_number: u16, segment_name: &str) -> bool {
        self.inner
            .placement
            .set(Placement {
                segment_number,
                segment_name: segment_name.to_string(),
                registered_at: Utc::now(),
            })
            .is_ok()
    }

    /// Push current process variables into the device's point objects.
    ///
    /// Only points whose value actually changed are rewritten. Returns the
    /// number of points updated.
    pub fn sync_present_values(&self, variables: &ProcessVariables) -> usize {
        let mut config = self.inner.config.write();
        let mut updated = 0;

        for point in config.points.iter_mut() {
            let Some(value) = variables.get(point.object_name()) else {
                continue;
            };

            let changed = match (point, value) {
                (PointObject::Analog(obj), PointValue::Number(v)) => {
                    if (obj.present_value - v).abs() > ANALOG_EPSILON {
                        obj.present_value = *v;
                        true
                    } else {
                        false
                    }
                }
                (PointObject::Binary(obj), PointValue::Bool(v)) => {
                    if obj.present_value != *v {
                        obj.present_value = *v;
                        true
                    } else {
                        false
                    }
                }
                (PointObject::MultiState(obj), PointValue::Text(v)) => {
                    match obj.state_text.iter().position(|state| state == v) {
                        Some(index) if obj.present_value != index as u32 + 1 => {
                            obj.present_value = index as u32 + 1;
                            true
                        }
                        _ => false,
                    }
                }
                (PointObject::CharacterString(obj), PointValue::Text(v)) => {
                    if obj.present_value != *v {
                        obj.present_value = v.clone();
                        true
                    } else {
                        false
                    }
                }
                _ => false,
            };

            if changed {
                updated += 1;
            }
        }

        updated
    }

    /// Whether two handles refer to the same device.
    pub fn ptr_eq(&self, other: &DeviceHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for DeviceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for DeviceHandle {}
