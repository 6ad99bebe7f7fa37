//! Device discovery over multicast DNS
//!
//! The table and listener work on plain answer records so they can be
//! driven by tests or any mDNS source. The `mdns` module, behind the
//! `discovery` feature, connects them to the network.

pub mod listener;
pub mod records;
pub mod table;

#[cfg(feature = "discovery")]
pub mod mdns;

pub use listener::{DiscoveryListener, QuerySender};
pub use records::{MdnsRecord, RecordClass};
pub use table::{DiscoveredDevice, DiscoveryTable};

#[cfg(feature = "discovery")]
pub use mdns::MdnsDiscovery;
