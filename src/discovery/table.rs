//! Table of devices seen through multicast DNS
//!
//! Entries are keyed by the advertised host name and live as long as the
//! table. There is no expiry and no conflict handling: the latest record
//! for a name wins.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A device advertised on the local network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// Advertised host name, the table key
    pub name: String,

    /// Service port from the SRV record
    pub port: u16,

    /// Last IPv4 address seen in an `A` record
    pub address: Option<String>,
}

/// Shared discovery table
#[derive(Debug, Default)]
pub struct DiscoveryTable {
    devices: RwLock<HashMap<String, DiscoveredDevice>>,
}

impl DiscoveryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fresh entry for `name`, replacing any previous one
    pub async fn record_service(&self, name: &str, port: u16) {
        self.devices.write().await.insert(
            name.to_string(),
            DiscoveredDevice {
                name: name.to_string(),
                port,
                address: None,
            },
        );
    }

    /// Set the address of a known device. Returns false for unknown names.
    pub async fn record_address(&self, name: &str, address: &str) -> bool {
        match self.devices.write().await.get_mut(name) {
            Some(device) => {
                device.address = Some(address.to_string());
                true
            }
            None => false,
        }
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.devices.read().await.contains_key(name)
    }

    pub async fn get(&self, name: &str) -> Option<DiscoveredDevice> {
        self.devices.read().await.get(name).cloned()
    }

    /// All entries, sorted by name
    pub async fn snapshot(&self) -> Vec<DiscoveredDevice> {
        let mut devices: Vec<_> = self.devices.read().await.values().cloned().collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_service_then_address() {
        let table = DiscoveryTable::new();
        table.record_service("foo.local", 80).await;
        assert!(table.record_address("foo.local", "192.168.1.5").await);

        assert_eq!(
            table.get("foo.local").await,
            Some(DiscoveredDevice {
                name: "foo.local".to_string(),
                port: 80,
                address: Some("192.168.1.5".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_address_for_unknown_name_is_ignored() {
        let table = DiscoveryTable::new();
        assert!(!table.record_address("bar.local", "10.0.0.9").await);
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn test_repeated_service_replaces_entry() {
        let table = DiscoveryTable::new();
        table.record_service("foo.local", 80).await;
        table.record_address("foo.local", "192.168.1.5").await;
        table.record_service("foo.local", 8080).await;

        let device = table.get("foo.local").await.unwrap();
        assert_eq!(device.port, 8080);
        assert_eq!(device.address, None);
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_sorted() {
        let table = DiscoveryTable::new();
        table.record_service("zeta.local", 80).await;
        table.record_service("alpha.local", 81).await;

        let names: Vec<_> = table.snapshot().await.into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha.local", "zeta.local"]);
    }
}
