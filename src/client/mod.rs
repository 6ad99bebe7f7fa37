//! Device client implementations
//!
//! A `DeviceTransport` performs one round trip to a device endpoint and
//! returns the raw response body. The HTTP implementation lives in
//! [`http_client`]; tests substitute counting or scripted transports.

pub mod http_client;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

pub use http_client::HttpDeviceClient;

/// A `<characteristic>=<value>` write forwarded to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteParameter {
    pub name: String,
    pub value: String,
}

impl WriteParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Render a host-provided value the way the device firmware expects it
    pub fn from_json(name: impl Into<String>, desired: &Value) -> Self {
        let value = match desired {
            Value::String(text) => text.clone(),
            Value::Number(number) => match number.as_f64() {
                Some(float) if float.fract() == 0.0 && float.abs() < 1e15 => {
                    format!("{}", float as i64)
                }
                _ => number.to_string(),
            },
            other => other.to_string(),
        };
        Self::new(name, value)
    }
}

impl fmt::Display for WriteParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// One request/response exchange with a device
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Fetch the device state, optionally carrying a write
    async fn fetch(&self, write: Option<&WriteParameter>) -> Result<String>;

    /// Endpoint description used in logs and errors
    fn endpoint(&self) -> &str;
}
