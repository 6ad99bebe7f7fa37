//! WireMock-based NodeMCU device mocking
//!
//! Simulates the JSON state endpoint of a sensor board so polls can be
//! tested without hardware.

use serde_json::Value;
use std::time::Duration;
use wiremock::{
    matchers::{body_string, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

/// Path of the device state endpoint
pub const STATE_PATH: &str = "/state";

/// Mock NodeMCU board
pub struct MockNodeMcu {
    pub server: MockServer,
    pub base_url: String,
}

impl MockNodeMcu {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    /// Full URL of the state endpoint
    pub fn state_url(&self) -> String {
        format!("{}{}", self.base_url, STATE_PATH)
    }

    /// Answer every GET of the state endpoint with `body`
    pub async fn mock_state(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path(STATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer the state endpoint after `delay`, expecting exactly `calls` requests
    pub async fn mock_slow_state(&self, body: Value, delay: Duration, calls: u64) {
        Mock::given(method("GET"))
            .and(path(STATE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(body)
                    .set_delay(delay),
            )
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Answer a GET write `name=value` with the echoed state
    pub async fn mock_query_write(&self, name: &str, value: &str, echoed: Value) {
        Mock::given(method("GET"))
            .and(path(STATE_PATH))
            .and(query_param(name, value))
            .respond_with(ResponseTemplate::new(200).set_body_json(echoed))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Answer a form-encoded write `name=value` sent with `http_method`
    pub async fn mock_form_write(&self, http_method: &str, name: &str, value: &str, echoed: Value) {
        Mock::given(method(http_method))
            .and(path(STATE_PATH))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string(format!("{name}={value}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(echoed))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Answer only requests carrying the given basic-auth header value
    pub async fn mock_authenticated_state(&self, authorization: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(STATE_PATH))
            .and(header("authorization", authorization))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path(STATE_PATH))
            .respond_with(ResponseTemplate::new(401))
            .with_priority(10)
            .mount(&self.server)
            .await;
    }

    /// Answer the state endpoint with a bare status code
    pub async fn mock_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(STATE_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Answer the state endpoint with a raw, non-JSON-object body
    pub async fn mock_raw_body(&self, body: &str) {
        Mock::given(method("GET"))
            .and(path(STATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }
}
