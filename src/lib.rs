//! NodeMCU bridge
//!
//! Exposes sensors on NodeMCU-class boards as smart-home accessories. Each
//! accessory polls an HTTP endpoint returning a JSON object and maps its
//! fields onto typed characteristics. Devices announcing themselves over
//! multicast DNS are tracked in a discovery table.
//!
//! # Features
//!
//! - Coalesced polling: concurrent reads share one HTTP request
//! - Characteristic get/set handlers backed by the device poller
//! - Periodic refresh pushing readings to the host
//! - mDNS discovery of sensor devices (`discovery` feature)

pub mod accessory;
pub mod adapter;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod platform;
pub mod poller;

// Re-export main types for convenience
pub use accessory::Accessory;
pub use config::{AccessoryConfig, BridgeConfig};
pub use error::{BridgeError, ErrorReporter, Result};
pub use poller::DevicePoller;
