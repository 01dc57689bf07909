//! HVAC Network - BACnet topology and device identity management
//!
//! This crate models a building's BACnet networks:
//! - One central plant network and one network per air handling unit
//! - Globally unique device ids and per-network MAC addresses
//! - Registration of equipment devices onto their networks
//! - Topology queries, summaries and the IP-to-VLAN router configuration

// Building structure input
pub mod building;

// Segment creation and feed resolution
pub mod builder;

// Whole-building bring-up
pub mod commission;

pub mod config;
pub mod device;
pub mod equipment;
pub mod error;
pub mod identity;
pub mod objects;

// Device registration
pub mod registrar;

// Segment registry and queries
pub mod registry;
pub mod report;
pub mod router;
pub mod segment;

// Protocol stack and network transport seams
pub mod stack;
pub mod transport;

pub use building::BuildingStructure;
pub use builder::{build_from_structure, resolve_ahu_for_vav, TopologyBuilder};
pub use commission::{commission_building, CommissionReport};
pub use device::DeviceHandle;
pub use equipment::{Equipment, EquipmentKind, EquipmentUnit};
pub use error::{LoadError, Result, TopologyError};
pub use identity::IdentityAllocator;
pub use registrar::{DeviceRegistrar, RegisterOptions};
pub use registry::{TopologyRegistry, TopologySummary};
pub use router::{RouterConfig, RouterOptions};
pub use segment::NetworkSegment;
pub use stack::{ProtocolStack, VirtualStack};
