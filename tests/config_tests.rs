//! Environment configuration and definitions loading

use lox_mcp::client::address::AddressType;
use lox_mcp::config::definitions::{McpDefinitions, ToolHandlerKind};
use lox_mcp::{LoxoneError, LoxoneMcpServer, ServerConfig};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;

const ALL_VARS: [&str; 7] = [
    "LOXONE_HOST",
    "LOXONE_USER",
    "LOXONE_PASS",
    "LOXONE_TIMEOUT",
    "LOXONE_VERIFY_SSL",
    "LOXONE_MCP_CONFIG",
    "MCP_PORT",
];

fn with_env<F: FnOnce()>(vars: &[(&str, &str)], test: F) {
    let settings: Vec<(&str, Option<&str>)> = ALL_VARS
        .iter()
        .map(|&name| {
            let value = vars.iter().find(|(key, _)| *key == name).map(|(_, v)| *v);
            (name, value)
        })
        .collect();
    temp_env::with_vars(settings, test);
}

#[test]
#[serial]
fn test_missing_variables_are_reported_together() {
    with_env(&[("LOXONE_USER", "admin")], || {
        let error = ServerConfig::from_env().unwrap_err();
        assert!(matches!(error, LoxoneError::Config(_)));

        let message = error.to_string();
        assert!(message.contains("LOXONE_HOST"));
        assert!(message.contains("LOXONE_PASS"));
        assert!(!message.contains("LOXONE_USER"));
    });
}

#[test]
#[serial]
fn test_full_environment() {
    with_env(
        &[
            ("LOXONE_HOST", "504F94A00210"),
            ("LOXONE_USER", "admin"),
            ("LOXONE_PASS", "secret"),
            ("LOXONE_TIMEOUT", "10"),
            ("LOXONE_VERIFY_SSL", "false"),
            ("LOXONE_MCP_CONFIG", "/etc/lox-mcp/tools.yaml"),
        ],
        || {
            let config = ServerConfig::from_env().unwrap();
            assert_eq!(config.loxone.timeout, Duration::from_secs(10));
            assert!(!config.loxone.verify_ssl);
            assert_eq!(
                config.definitions_path.as_deref(),
                Some(std::path::Path::new("/etc/lox-mcp/tools.yaml"))
            );

            let endpoint = config.validate().unwrap();
            assert_eq!(endpoint.kind(), AddressType::Mac);
            assert_eq!(endpoint.to_string(), "https://dns.loxonecloud.com/504F94A00210");
        },
    );
}

#[test]
#[serial]
fn test_invalid_host_fails_validation() {
    with_env(
        &[
            ("LOXONE_HOST", "   "),
            ("LOXONE_USER", "admin"),
            ("LOXONE_PASS", "secret"),
        ],
        || {
            let config = ServerConfig::from_env().unwrap();
            assert!(matches!(config.validate(), Err(LoxoneError::EmptyAddress)));
        },
    );
}

#[test]
#[serial]
fn test_mcp_port_is_not_part_of_backend_config() {
    with_env(
        &[
            ("LOXONE_HOST", "192.168.1.77"),
            ("LOXONE_USER", "admin"),
            ("LOXONE_PASS", "secret"),
            ("MCP_PORT", "abc"),
        ],
        || {
            let config = ServerConfig::from_env().unwrap();
            assert_eq!(config.validate().unwrap().kind(), AddressType::Local);
        },
    );
}

#[test]
#[serial]
fn test_custom_definitions_file_drives_the_registry() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
tools:
  - name: all_blinds_up
    description: Raise every blind
    parameters:
      - name: device_type
        default: Jalousie
    handler:
      type: control_devices_by_type
      action: FullUp
resources:
  - uri: lox://rooms
    name: Rooms
    handler:
      type: rooms_list
"#
    )
    .unwrap();
    let path = file.path().to_string_lossy().to_string();

    with_env(
        &[
            ("LOXONE_HOST", "192.168.1.77"),
            ("LOXONE_USER", "admin"),
            ("LOXONE_PASS", "secret"),
            ("LOXONE_MCP_CONFIG", &path),
        ],
        || {
            let config = ServerConfig::from_env().unwrap();
            let server = LoxoneMcpServer::from_config(&config);

            let registry = server.registry();
            assert_eq!(registry.tools().len(), 1);
            assert_eq!(
                registry.tool("all_blinds_up").unwrap().handler.kind,
                ToolHandlerKind::ControlDevicesByType
            );
            assert_eq!(registry.list_resources().len(), 1);
        },
    );
}

#[test]
fn test_missing_definitions_file_yields_empty_registry() {
    let dir = tempfile::tempdir().unwrap();
    let definitions = McpDefinitions::load(&dir.path().join("absent.yaml"));
    assert!(definitions.is_empty());
}

#[test]
fn test_malformed_definitions_file_yields_empty_registry() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "tools: [this is: not: valid").unwrap();

    let definitions = McpDefinitions::load(file.path());
    assert!(definitions.is_empty());
}
