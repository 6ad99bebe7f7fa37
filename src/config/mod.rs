//! Configuration management for the NodeMCU bridge
//!
//! A bridge config file is a JSON document holding one entry per polled
//! device accessory plus the mDNS discovery settings. Field names and
//! defaults follow the accessory configuration used by the host platform.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default characteristic polled when none is configured
pub const DEFAULT_CHARACTERISTIC: &str = "LeakDetected";
/// Default measurement units
pub const DEFAULT_UNITS: &str = "ppm";
/// Default HTTP timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
/// Default refresh interval in milliseconds
pub const DEFAULT_UPDATE_INTERVAL_MS: i64 = 120_000;
/// Placeholder for unset accessory information
pub const NOT_AVAILABLE: &str = "Not available";

/// Top-level bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BridgeConfig {
    /// Polled device accessories
    #[serde(default)]
    pub accessories: Vec<AccessoryConfig>,

    /// mDNS discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Basic authentication credentials for the device endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    pub user: String,
    #[serde(default)]
    pub pass: String,
}

/// Configuration of a single device accessory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessoryConfig {
    /// Accessory display name
    pub name: String,

    /// Service kind, e.g. "LeakSensor" (whitespace is ignored)
    pub service: String,

    /// Characteristics read from the device; a single string is accepted
    #[serde(
        default = "default_characteristics",
        deserialize_with = "one_or_many"
    )]
    pub characteristics: Vec<String>,

    /// Device endpoint
    pub url: String,

    /// HTTP method used for every poll
    #[serde(default = "default_http_method")]
    pub http_method: String,

    /// Request timeout in milliseconds (0 selects the default)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Measurement units reported by the device
    #[serde(default = "default_units")]
    pub units: String,

    /// Optional basic authentication
    #[serde(default)]
    pub auth: Option<AuthConfig>,

    /// Refresh interval in milliseconds; zero or negative disables polling
    #[serde(default = "default_update_interval")]
    pub update_interval: i64,

    #[serde(default = "not_available")]
    pub manufacturer: String,

    #[serde(default = "not_available")]
    pub model: String,

    #[serde(default = "not_available")]
    pub serial_number: String,
}

/// mDNS discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Run the discovery listener
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Service type browsed on the local network
    #[serde(default = "default_service_type")]
    pub service_type: String,

    /// Substring identifying device records of interest
    #[serde(default = "default_device_marker")]
    pub device_marker: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_type: default_service_type(),
            device_marker: default_device_marker(),
        }
    }
}

fn default_characteristics() -> Vec<String> {
    vec![DEFAULT_CHARACTERISTIC.to_string()]
}

fn default_http_method() -> String {
    "GET".to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_units() -> String {
    DEFAULT_UNITS.to_string()
}

fn default_update_interval() -> i64 {
    DEFAULT_UPDATE_INTERVAL_MS
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_service_type() -> String {
    "_http._tcp.local.".to_string()
}

fn default_device_marker() -> String {
    "WaterLeakSensor".to_string()
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(name) => vec![name],
        OneOrMany::Many(names) => names,
    })
}

/// Remove every whitespace character from a configured name
pub fn strip_whitespace(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

impl AccessoryConfig {
    /// Create a config with defaults for everything but the required fields
    pub fn new(name: impl Into<String>, service: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service: service.into(),
            characteristics: default_characteristics(),
            url: url.into(),
            http_method: default_http_method(),
            timeout: default_timeout(),
            units: default_units(),
            auth: None,
            update_interval: default_update_interval(),
            manufacturer: not_available(),
            model: not_available(),
            serial_number: not_available(),
        }
    }

    /// Service kind with whitespace removed
    pub fn service_name(&self) -> String {
        strip_whitespace(&self.service)
    }

    /// Effective request timeout
    pub fn request_timeout(&self) -> Duration {
        match self.timeout {
            0 => Duration::from_millis(DEFAULT_TIMEOUT_MS),
            ms => Duration::from_millis(ms),
        }
    }

    /// Refresh interval, `None` when periodic polling is disabled
    pub fn poll_interval(&self) -> Option<Duration> {
        u64::try_from(self.update_interval)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Parsed device endpoint
    pub fn endpoint(&self) -> Result<Url> {
        Url::parse(&self.url).map_err(|e| {
            BridgeError::config(format!("Accessory {}: invalid url {}: {e}", self.name, self.url))
        })
    }

    /// Parsed HTTP method
    pub fn method(&self) -> Result<reqwest::Method> {
        reqwest::Method::from_bytes(self.http_method.trim().to_uppercase().as_bytes()).map_err(
            |_| {
                BridgeError::config(format!(
                    "Accessory {}: invalid http_method {}",
                    self.name, self.http_method
                ))
            },
        )
    }

    /// Validate the accessory configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BridgeError::config("Accessory name must not be empty"));
        }
        if self.service_name().is_empty() {
            return Err(BridgeError::config(format!(
                "Accessory {}: service must not be empty",
                self.name
            )));
        }
        self.endpoint()?;
        self.method()?;
        Ok(())
    }
}

impl BridgeConfig {
    /// Load bridge configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!("Failed to read config {}: {e}", path.display()))
        })?;

        content.parse()
    }

    /// Validate every accessory entry
    pub fn validate(&self) -> Result<()> {
        if self.accessories.is_empty() && !self.discovery.enabled {
            return Err(BridgeError::config(
                "Nothing to do: no accessories configured and discovery disabled",
            ));
        }
        for accessory in &self.accessories {
            accessory.validate()?;
        }
        Ok(())
    }
}

impl std::str::FromStr for BridgeConfig {
    type Err = BridgeError;

    fn from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| BridgeError::config(format!("Failed to parse config: {e}")))
    }
}
