//! Network Transport
//!
//! Opaque handles to the virtual networks segments are built on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Handle to an opened virtual network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkHandle {
    pub id: Uuid,
    /// Interface name devices use to attach to this network
    pub interface_name: String,
    pub opened_at: DateTime<Utc>,
}

/// Opens virtual networks.
pub trait NetworkTransport: Send + Sync {
    fn open_network(&self, name: &str) -> NetworkHandle;
}

/// In-process virtual networks.
#[derive(Debug, Default, Clone, Copy)]
pub struct VirtualTransport;

impl NetworkTransport for VirtualTransport {
    fn open_network(&self, name: &str) -> NetworkHandle {
        let handle = NetworkHandle {
            id: Uuid::new_v4(),
            interface_name: name.to_string(),
            opened_at: Utc::now(),
        };
        debug!("Opened virtual network {} ({})", name, handle.id);
        handle
    }
}
