//! Test fixtures for consistent accessory setup

use nodemcu_bridge::config::{AccessoryConfig, AuthConfig};
use rstest::*;
use serde_json::{json, Value};

/// Leak sensor accessory pointing at `url`
#[fixture]
pub fn leak_sensor_config(
    #[default("http://localhost:8080/state")] url: &str,
) -> AccessoryConfig {
    let mut config = AccessoryConfig::new("Basement", "LeakSensor", url);
    config.timeout = 500;
    config
}

/// Dimmable light accessory pointing at `url`
pub fn lightbulb_config(url: &str) -> AccessoryConfig {
    let mut config = AccessoryConfig::new("Desk Lamp", "Lightbulb", url);
    config.characteristics = vec!["On".to_string(), "Brightness".to_string()];
    config.timeout = 500;
    config
}

pub fn test_auth() -> AuthConfig {
    AuthConfig {
        user: "admin".to_string(),
        pass: "secret".to_string(),
    }
}

/// `Basic` header value for `test_auth`
pub const TEST_AUTH_HEADER: &str = "Basic YWRtaW46c2VjcmV0";

/// A full bridge configuration document
#[fixture]
pub fn bridge_config_json() -> Value {
    json!({
        "accessories": [
            {
                "name": "Basement",
                "service": "LeakSensor",
                "url": "http://10.0.0.21/state",
                "update_interval": 60000
            },
            {
                "name": "Office climate",
                "service": "Temperature Sensor",
                "characteristics": ["CurrentTemperature", "CurrentRelativeHumidity"],
                "url": "http://10.0.0.22/state",
                "http_method": "post",
                "timeout": 2500,
                "auth": {"user": "admin", "pass": "secret"},
                "manufacturer": "DIY",
                "model": "NodeMCU v3",
                "serial_number": "0042"
            }
        ],
        "discovery": {
            "device_marker": "WaterLeakSensor"
        }
    })
}
