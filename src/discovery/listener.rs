//! Passive mDNS listener feeding the discovery table

use super::records::{MdnsRecord, RecordClass};
use super::table::DiscoveryTable;
use crate::error::{ErrorReporter, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Outgoing mDNS queries
#[async_trait]
pub trait QuerySender: Send + Sync {
    /// Ask the network for the `A` record of `name`
    async fn query_address(&self, name: &str) -> Result<()>;
}

/// Applies mDNS answers to a `DiscoveryTable`
pub struct DiscoveryListener {
    table: Arc<DiscoveryTable>,
    device_marker: String,
    querier: Arc<dyn QuerySender>,
}

impl DiscoveryListener {
    pub fn new(
        table: Arc<DiscoveryTable>,
        device_marker: impl Into<String>,
        querier: Arc<dyn QuerySender>,
    ) -> Self {
        Self {
            table,
            device_marker: device_marker.into(),
            querier,
        }
    }

    pub fn table(&self) -> &Arc<DiscoveryTable> {
        &self.table
    }

    /// Process the answers of one response, in order.
    ///
    /// An SRV answer whose name contains the device marker creates an
    /// entry for its target and triggers an `A` query for it, so an
    /// address change is picked up. An `A`/`IN` answer for a known target
    /// sets that entry's address.
    pub async fn handle_response(&self, answers: &[MdnsRecord]) {
        for answer in answers {
            match answer {
                MdnsRecord::Srv { name, target, port } if name.contains(&self.device_marker) => {
                    info!(device = %target, port, "Discovered device");
                    self.table.record_service(target, *port).await;

                    if let Err(error) = self.querier.query_address(target).await {
                        ErrorReporter::log_error(&error, "discovery", "query_address");
                    }
                }
                MdnsRecord::A {
                    name, class, data, ..
                } if *class == RecordClass::In => {
                    if self.table.record_address(name, data).await {
                        debug!(device = %name, address = %data, "Device address updated");
                    }
                }
                _ => {}
            }
        }
    }
}
