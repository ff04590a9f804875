//! WireMock-based Loxone API mocking infrastructure
//!
//! Simulates the Miniserver's HTTP API: the structure file and
//! `jdev/sps/io` device commands behind basic authentication.

use super::{TEST_PASS, TEST_USER};
use serde_json::{json, Value};
use wiremock::{
    matchers::{basic_auth, method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

/// Mock Loxone Miniserver for testing
pub struct MockLoxoneServer {
    pub server: MockServer,
}

impl MockLoxoneServer {
    /// Start a server answering device commands; the structure file is not
    /// mounted so tests can set expectations on it
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let mock_server = Self { server };
        mock_server.mock_device_controls().await;
        mock_server.mock_api_version().await;
        mock_server
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Structure file with two rooms, two categories and four controls
    pub fn structure() -> Value {
        json!({
            "lastModified": "2024-01-01 12:00:00",
            "msInfo": {
                "serialNr": "504F94A00210",
                "msName": "Test Miniserver"
            },
            "rooms": {
                "0cd8c06b-855703-ffff-ffff000000000000": {"name": "Living Room", "type": 0},
                "0cd8c06b-855703-ffff-ffff000000000001": {"name": "Kitchen", "type": 0}
            },
            "cats": {
                "0cd8c06b-855703-ffff-ffff000000000100": {"name": "Lighting", "type": "lights"},
                "0cd8c06b-855703-ffff-ffff000000000101": {"name": "Shading", "type": "shading"}
            },
            "controls": {
                "0cd8c06b-855703-ffff-ffff000000000010": {
                    "name": "Living Room Light",
                    "type": "LightController",
                    "uuidAction": "0cd8c06b-855703-ffff-ffff000000000010",
                    "room": "0cd8c06b-855703-ffff-ffff000000000000",
                    "cat": "0cd8c06b-855703-ffff-ffff000000000100"
                },
                "0cd8c06b-855703-ffff-ffff000000000011": {
                    "name": "Kitchen Light",
                    "type": "LightController",
                    "uuidAction": "0cd8c06b-855703-ffff-ffff000000000011",
                    "room": "0cd8c06b-855703-ffff-ffff000000000001",
                    "cat": "0cd8c06b-855703-ffff-ffff000000000100"
                },
                "0cd8c06b-855703-ffff-ffff000000000020": {
                    "name": "Living Room Blinds",
                    "type": "Jalousie",
                    "uuidAction": "0cd8c06b-855703-ffff-ffff000000000020",
                    "room": "0cd8c06b-855703-ffff-ffff000000000000",
                    "cat": "0cd8c06b-855703-ffff-ffff000000000101"
                },
                "0cd8c06b-855703-ffff-ffff000000000030": {
                    "name": "Presence Helper",
                    "type": "",
                    "room": "0cd8c06b-855703-ffff-ffff000000000001"
                }
            }
        })
    }

    /// Serve the structure file, expecting exactly `times` fetches
    pub async fn mock_structure_file(&self, times: u64) {
        Mock::given(method("GET"))
            .and(path("/data/LoxAPP3.json"))
            .and(basic_auth(TEST_USER, TEST_PASS))
            .respond_with(ResponseTemplate::new(200).set_body_json(Self::structure()))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Answer the structure file with an HTTP error
    pub async fn mock_structure_failure(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/data/LoxAPP3.json"))
            .respond_with(ResponseTemplate::new(status).set_body_string("Service Unavailable"))
            .mount(&self.server)
            .await;
    }

    /// Device commands answered with an LL code 500 envelope
    pub async fn mock_failing_device(&self, uuid: &str) {
        Mock::given(method("GET"))
            .and(path_regex(format!(r"^/jdev/sps/io/{}/.*$", regex::escape(uuid))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "LL": {
                    "control": format!("jdev/sps/io/{uuid}"),
                    "value": "Device not responding",
                    "Code": "500"
                }
            })))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    async fn mock_device_controls(&self) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/jdev/sps/io/[^/]+/.+$"))
            .and(basic_auth(TEST_USER, TEST_PASS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "LL": {
                    "control": "jdev/sps/io",
                    "value": "1",
                    "Code": "200"
                }
            })))
            .with_priority(5)
            .mount(&self.server)
            .await;
    }

    async fn mock_api_version(&self) {
        Mock::given(method("GET"))
            .and(path("/jdev/cfg/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "LL": {
                    "control": "dev/cfg/api",
                    "value": "{'snr': '50:4F:94:A0:02:10', 'version':'14.4.10.23'}",
                    "Code": "200"
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Commands the server received, as request paths without the leading slash
    pub async fn received_commands(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|request| request.url.path().trim_start_matches('/').to_string())
            .filter(|path| path.starts_with("jdev/sps/io/"))
            .collect()
    }
}
