//! Common test utilities

pub mod loxone_mock;

use lox_mcp::config::{credentials::LoxoneCredentials, LoxoneConfig};
use lox_mcp::LoxoneAdapter;
use std::time::Duration;

pub const TEST_USER: &str = "admin";
pub const TEST_PASS: &str = "secret";

/// Adapter talking real HTTP to `address`
pub fn http_adapter(address: &str) -> LoxoneAdapter {
    let mut config = LoxoneConfig::new(address);
    config.timeout = Duration::from_secs(5);
    LoxoneAdapter::new(config, LoxoneCredentials::new(TEST_USER, TEST_PASS))
}
