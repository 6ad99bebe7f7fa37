//! HTTP client for NodeMCU device endpoints
//!
//! Each poll is a single request to the configured URL using the
//! configured method, timeout and optional basic authentication. Writes
//! travel as a query parameter for `GET` and as a form body otherwise.

use crate::client::{DeviceTransport, WriteParameter};
use crate::config::{AccessoryConfig, AuthConfig};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP transport for one device endpoint
#[derive(Debug, Clone)]
pub struct HttpDeviceClient {
    client: Client,
    endpoint: Url,
    endpoint_label: String,
    method: Method,
    auth: Option<AuthConfig>,
}

impl HttpDeviceClient {
    /// Create a new HTTP client
    pub fn new(
        endpoint: Url,
        method: Method,
        timeout: Duration,
        auth: Option<AuthConfig>,
    ) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(format!("nodemcu-bridge/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint_label: endpoint.to_string(),
            endpoint,
            method,
            auth,
        })
    }

    /// Create a client from an accessory configuration
    pub fn from_config(config: &AccessoryConfig) -> Result<Self> {
        Self::new(
            config.endpoint()?,
            config.method()?,
            config.request_timeout(),
            config.auth.clone(),
        )
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Build the request URL, appending a write as query parameter for GET
    fn build_url(&self, write: Option<&WriteParameter>) -> Url {
        let mut url = self.endpoint.clone();
        if let Some(write) = write {
            if self.method == Method::GET {
                url.query_pairs_mut().append_pair(&write.name, &write.value);
            }
        }
        url
    }
}

#[async_trait]
impl DeviceTransport for HttpDeviceClient {
    async fn fetch(&self, write: Option<&WriteParameter>) -> Result<String> {
        let url = self.build_url(write);
        debug!(method = %self.method, %url, "Sending device request");

        let mut request = self.client.request(self.method.clone(), url.clone());

        if let Some(write) = write {
            if self.method != Method::GET {
                request = request.form(&[(write.name.as_str(), write.value.as_str())]);
            }
        }

        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.user, Some(&auth.pass));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BridgeError::timeout(format!("{url}: {e}"))
            } else {
                BridgeError::transport(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::transport(format!("{url}: HTTP error {status}")));
        }

        let body = response.text().await?;
        debug!(%url, bytes = body.len(), "Device response received");
        Ok(body)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint_label
    }
}
