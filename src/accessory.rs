//! Polled device accessory
//!
//! Turns one `AccessoryConfig` into the services exposed to the host: an
//! information service and, when the service kind is supported, a primary
//! service whose characteristics are backed by a `DevicePoller`.

use crate::adapter::{bind_characteristics, resolve_characteristics};
use crate::client::{DeviceTransport, HttpDeviceClient};
use crate::config::AccessoryConfig;
use crate::error::{ErrorReporter, Result};
use crate::platform::{CharacteristicSink, Service, ServiceKind};
use crate::poller::DevicePoller;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct Accessory {
    config: AccessoryConfig,
    information: Arc<Service>,
    primary: Option<Arc<Service>>,
    poller: Option<Arc<DevicePoller>>,
}

impl Accessory {
    /// Build an accessory polling its configured HTTP endpoint
    pub fn from_config(config: AccessoryConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpDeviceClient::from_config(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Build an accessory on top of any device transport.
    ///
    /// An unsupported service kind leaves the accessory with only its
    /// information service. Unknown characteristic names are dropped; if
    /// none remain the primary service is kept without handlers and the
    /// device is never polled.
    pub fn with_transport(config: AccessoryConfig, transport: Arc<dyn DeviceTransport>) -> Self {
        let information = Arc::new(Service::information(
            &config.manufacturer,
            &config.model,
            &config.serial_number,
        ));

        let kind = match config.service_name().parse::<ServiceKind>() {
            Ok(kind) => kind,
            Err(error) => {
                ErrorReporter::log_error(&error, "accessory", "setup");
                return Self {
                    config,
                    information,
                    primary: None,
                    poller: None,
                };
            }
        };

        let service = Arc::new(Service::new(kind, config.name.clone()));
        let kinds = resolve_characteristics(&config.characteristics);
        let sink: Arc<dyn CharacteristicSink> = service.clone();
        let poller = Arc::new(
            DevicePoller::new(
                transport,
                kinds.iter().map(|kind| kind.as_str().to_string()).collect(),
            )
            .with_sink(&sink),
        );

        let poller = match bind_characteristics(&service, &kinds, &poller) {
            Ok(()) => Some(poller),
            Err(error) => {
                ErrorReporter::log_error(&error, "accessory", "bind_characteristics");
                None
            }
        };

        info!(
            name = %config.name,
            service = %kind,
            characteristics = ?kinds,
            endpoint = %config.url,
            "Accessory configured"
        );

        Self {
            config,
            information,
            primary: Some(service),
            poller,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn units(&self) -> &str {
        &self.config.units
    }

    pub fn config(&self) -> &AccessoryConfig {
        &self.config
    }

    pub fn information_service(&self) -> &Arc<Service> {
        &self.information
    }

    pub fn primary_service(&self) -> Option<&Arc<Service>> {
        self.primary.as_ref()
    }

    pub fn poller(&self) -> Option<&Arc<DevicePoller>> {
        self.poller.as_ref()
    }

    /// Services exposed to the host, information service first
    pub fn services(&self) -> Vec<Arc<Service>> {
        std::iter::once(Arc::clone(&self.information))
            .chain(self.primary.iter().cloned())
            .collect()
    }

    /// Start the periodic refresh.
    ///
    /// Returns `None` when the accessory has nothing to poll or its
    /// update interval disables polling.
    pub fn start_polling(&self) -> Option<JoinHandle<()>> {
        let poller = self.poller.as_ref()?;
        match self.config.poll_interval() {
            Some(period) => Some(poller.spawn_update_timer(period)),
            None => {
                warn!(name = %self.config.name, "Periodic refresh disabled");
                None
            }
        }
    }
}

impl std::fmt::Debug for Accessory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessory")
            .field("name", &self.config.name)
            .field("primary", &self.primary)
            .field("polling", &self.poller.is_some())
            .finish()
    }
}
