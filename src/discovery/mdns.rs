//! Live mDNS feed backed by `mdns-sd`
//!
//! Browses the configured service type and turns every resolved service
//! into SRV and `A` answers for the `DiscoveryListener`. Address queries
//! issued by the listener go out through `resolve_hostname`; their answers
//! come back through the same loop.

use super::listener::{DiscoveryListener, QuerySender};
use super::records::{normalize_name, MdnsRecord};
use super::table::DiscoveryTable;
use crate::config::DiscoveryConfig;
use crate::error::Result;
use async_trait::async_trait;
use mdns_sd::{HostnameResolutionEvent, ServiceDaemon, ServiceEvent, ServiceInfo};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long a single hostname query waits for answers
const ADDRESS_QUERY_TIMEOUT_MS: u64 = 3000;

/// Answers produced outside the browse loop
type AnswerSender = mpsc::UnboundedSender<Vec<MdnsRecord>>;

/// mDNS browser for sensor devices
pub struct MdnsDiscovery {
    daemon: ServiceDaemon,
    service_type: String,
    device_marker: String,
}

impl MdnsDiscovery {
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let daemon = ServiceDaemon::new()?;
        Ok(Self {
            daemon,
            service_type: config.service_type.clone(),
            device_marker: config.device_marker.clone(),
        })
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    /// Start browsing and feed every answer into `table`
    pub fn spawn(&self, table: Arc<DiscoveryTable>) -> Result<JoinHandle<()>> {
        let browse = self.daemon.browse(&self.service_type)?;
        let (answers_tx, mut answers_rx) = mpsc::unbounded_channel();

        let querier = Arc::new(MdnsQuerier {
            daemon: self.daemon.clone(),
            answers: answers_tx,
        });
        let listener = DiscoveryListener::new(table, self.device_marker.clone(), querier);

        info!(service_type = %self.service_type, marker = %self.device_marker, "Starting mDNS discovery");

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = browse.recv_async() => match event {
                        Ok(ServiceEvent::ServiceResolved(service)) => {
                            listener.handle_response(&resolved_answers(&service)).await;
                        }
                        Ok(ServiceEvent::SearchStopped(service_type)) => {
                            info!(service_type = %service_type, "mDNS browse stopped");
                            break;
                        }
                        Ok(other) => debug!(?other, "Ignoring mDNS event"),
                        Err(error) => {
                            warn!(error = %error, "mDNS browse channel closed");
                            break;
                        }
                    },
                    Some(answers) = answers_rx.recv() => {
                        listener.handle_response(&answers).await;
                    }
                }
            }
        }))
    }

    /// Stop the daemon thread
    pub fn shutdown(&self) -> Result<()> {
        self.daemon.shutdown()?;
        Ok(())
    }
}

/// SRV answer for a resolved service plus the `A` answers carried with it
fn resolved_answers(service: &ServiceInfo) -> Vec<MdnsRecord> {
    let target = normalize_name(service.get_hostname());
    let mut answers = vec![MdnsRecord::srv(
        normalize_name(service.get_fullname()),
        target,
        service.get_port(),
    )];
    answers.extend(ipv4_answers(target, service.get_addresses().iter()));
    answers
}

fn ipv4_answers<'a>(name: &str, addresses: impl Iterator<Item = &'a IpAddr>) -> Vec<MdnsRecord> {
    addresses
        .filter(|address| address.is_ipv4())
        .map(|address| MdnsRecord::a(name, address.to_string()))
        .collect()
}

/// Sends `A` queries through the daemon and forwards answers to the browse loop
struct MdnsQuerier {
    daemon: ServiceDaemon,
    answers: AnswerSender,
}

#[async_trait]
impl QuerySender for MdnsQuerier {
    async fn query_address(&self, name: &str) -> Result<()> {
        // mdns-sd expects a fully qualified name ending in ".local."
        let fqdn = format!("{}.", normalize_name(name));
        let events = self
            .daemon
            .resolve_hostname(&fqdn, Some(ADDRESS_QUERY_TIMEOUT_MS))?;

        let answers = self.answers.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            while let Ok(event) = events.recv_async().await {
                match event {
                    HostnameResolutionEvent::AddressesFound(_, addresses) => {
                        let records = ipv4_answers(&name, addresses.iter());
                        if !records.is_empty() && answers.send(records).is_err() {
                            break;
                        }
                    }
                    HostnameResolutionEvent::SearchTimeout(_)
                    | HostnameResolutionEvent::SearchStopped(_) => break,
                    _ => {}
                }
            }
        });
        Ok(())
    }
}
