//! Passive 802.11 network and client tracking
//!
//! Consumes decoded frame records and keeps aggregated, in-memory state for
//! every network and client seen:
//! - network/client registries with stable handles
//! - cloaked SSID recovery and probe association
//! - encryption posture, FMS weak IV and duplicate IV detection
//! - GPS bounding boxes, signal peaks, rate ceilings and IP range guesses
//!
//! The crate never transmits, decrypts, or persists anything.

pub mod config;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod handler;
pub mod interface;
pub mod logging;
pub mod probe;
pub mod registry;
pub mod shared;
pub mod types;
pub mod vendor;


pub use config::{Config, LoggingConfig, TrackerSettings};
pub use error::{InterfaceError, Result, TrackerError, VendorLookupError};
pub use frame::{DsFlags, FrameCategory, FrameRecord, FrameSubtype};
pub use handler::{Disposition, FrameOutcome, Tracker, TrackerStats};
pub use interface::{InterfaceControl, InterfaceFlags, IpLinkControl};
pub use registry::{
    ClientHandle, ClientRecord, ClientType, NetworkHandle, NetworkRecord, NetworkRole,
};
pub use shared::SharedTracker;
pub use types::MacAddr;
pub use vendor::{NoVendorLookup, StaticVendorTable, VendorLookup, VendorRole};
