//! Characteristic adapters
//!
//! Binds configured characteristic names to get/set handlers that run a
//! device poll and resolve with the field of interest.

use crate::client::WriteParameter;
use crate::config::strip_whitespace;
use crate::error::{BridgeError, ErrorReporter, Result};
use crate::platform::{CharacteristicHandler, CharacteristicKind, Service};
use crate::poller::DevicePoller;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Get/set handler for one characteristic of a polled device
pub struct CharacteristicAdapter {
    kind: CharacteristicKind,
    poller: Arc<DevicePoller>,
}

impl CharacteristicAdapter {
    pub fn new(kind: CharacteristicKind, poller: Arc<DevicePoller>) -> Self {
        Self { kind, poller }
    }

    pub fn kind(&self) -> CharacteristicKind {
        self.kind
    }

    /// Poll the device and return this characteristic's reading.
    ///
    /// `Ok(None)` means the device answered without this field.
    pub async fn get_state(&self) -> Result<Option<f64>> {
        let values = self.poller.update_state(None).await?;
        Ok(values.get(self.kind.as_str()).copied())
    }

    /// Send `<name>=<desired>` to the device and return the reading it reports back
    pub async fn set_state(&self, desired: &Value) -> Result<Option<f64>> {
        let write = WriteParameter::from_json(self.kind.as_str(), desired);
        let values = self.poller.update_state(Some(write)).await?;
        Ok(values.get(self.kind.as_str()).copied())
    }
}

#[async_trait]
impl CharacteristicHandler for CharacteristicAdapter {
    async fn get(&self) -> Result<Option<f64>> {
        self.get_state().await
    }

    async fn set(&self, desired: Value) -> Result<Option<f64>> {
        self.set_state(&desired).await
    }
}

/// Resolve configured names against the host registry.
///
/// Whitespace is stripped from each name; names the registry does not
/// know are logged and dropped. Duplicates keep their first position.
pub fn resolve_characteristics(configured: &[String]) -> Vec<CharacteristicKind> {
    let mut kinds = Vec::new();
    for name in configured {
        match strip_whitespace(name).parse::<CharacteristicKind>() {
            Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Ok(_) => {}
            Err(error) => ErrorReporter::log_error(&error, "adapter", "resolve_characteristics"),
        }
    }
    kinds
}

/// Register an adapter on `service` for every characteristic in `kinds`
pub fn bind_characteristics(
    service: &Service,
    kinds: &[CharacteristicKind],
    poller: &Arc<DevicePoller>,
) -> Result<()> {
    if kinds.is_empty() {
        return Err(BridgeError::config(format!(
            "No usable characteristics for {}",
            service.display_name()
        )));
    }

    for kind in kinds {
        let adapter = CharacteristicAdapter::new(*kind, Arc::clone(poller));
        service.on_request(*kind, Arc::new(adapter));
    }
    Ok(())
}
