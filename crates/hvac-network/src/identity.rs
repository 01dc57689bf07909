//! Device Identity Allocation
//!
//! Hands out globally unique BACnet device instance numbers and per-network
//! MAC addresses. One allocator lives for the whole process and is shared by
//! every registrar that needs identities.

use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use tracing::debug;

/// First device instance handed out by a fresh allocator.
pub const DEVICE_ID_BASE: u32 = 1000;

/// First MAC number on every network.
pub const MAC_BASE: u32 = 1;

/// Format a MAC number the way virtual network ports expect it (`0x0001`).
///
/// Four digits is a minimum width; numbers past `0xffff` keep growing.
pub fn format_mac(mac: u32) -> String {
    format!("0x{:04x}", mac)
}

/// Allocator for device ids and per-network MAC addresses.
#[derive(Debug)]
pub struct IdentityAllocator {
    next_device_id: AtomicU32,
    /// Next MAC number per network number
    mac_counters: DashMap<u16, u32>,
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self {
            next_device_id: AtomicU32::new(DEVICE_ID_BASE),
            mac_counters: DashMap::new(),
        }
    }

    /// Next device instance number. The first call returns 1000.
    pub fn next_device_id(&self) -> u32 {
        let device_id = self.next_device_id.fetch_add(1, Ordering::SeqCst);
        debug!("Allocated device id {}", device_id);
        device_id
    }

    /// Next MAC address on the given network, formatted as `0x%04x`.
    ///
    /// The counter for a network is created on first use; the entry guard
    /// keeps initialization and increment atomic per network.
    pub fn next_mac(&self, network_number: u16) -> String {
        let mac = {
            let mut counter = self.mac_counters.entry(network_number).or_insert(MAC_BASE);
            let mac = *counter;
            *counter += 1;
            mac
        };
        debug!("Allocated MAC {} on network {}", format_mac(mac), network_number);
        format_mac(mac)
    }

    /// Number of MACs handed out so far on a network.
    pub fn macs_allocated(&self, network_number: u16) -> u32 {
        self.mac_counters
            .get(&network_number)
            .map(|next| next.saturating_sub(MAC_BASE))
            .unwrap_or(0)
    }
}
