//! Stdio transport
//!
//! The `rmcp` service loop over stdin/stdout. Stdin EOF ends the session.

use crate::error::{LoxoneError, Result};
use crate::server::LoxoneMcpServer;
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use tracing::info;

/// Serve MCP on the process's stdin/stdout until the client goes away
pub async fn run(server: LoxoneMcpServer) -> Result<()> {
    info!("Starting stdio transport");

    let service = server
        .serve(stdio())
        .await
        .map_err(|e| LoxoneError::transport(format!("MCP initialization failed: {e}")))?;

    let reason = service
        .waiting()
        .await
        .map_err(|e| LoxoneError::transport(e.to_string()))?;

    info!("stdio session ended: {reason:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::adapter::LoxoneAdapter;
    use crate::config::credentials::LoxoneCredentials;
    use crate::config::definitions::McpDefinitions;
    use crate::config::LoxoneConfig;
    use crate::mock::{result_text, sample_structure, MockClientFactory, MockLoxoneClient};
    use crate::server::LoxoneMcpServer;
    use pretty_assertions::assert_eq;
    use rmcp::model::{CallToolRequestParam, ReadResourceRequestParam};
    use rmcp::ServiceExt;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn server() -> (LoxoneMcpServer, Arc<MockClientFactory>) {
        let factory = Arc::new(MockClientFactory::new(
            MockLoxoneClient::new().with_structure(sample_structure()),
        ));
        let adapter = LoxoneAdapter::with_factory(
            LoxoneConfig::new("192.168.1.77"),
            LoxoneCredentials::new("admin", "secret"),
            factory.clone(),
        );
        (
            LoxoneMcpServer::new(Arc::new(adapter), McpDefinitions::bundled()),
            factory,
        )
    }

    #[tokio::test]
    async fn test_session_over_duplex_pipe() {
        let (server, factory) = server();
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);

        let server_task = tokio::spawn(async move {
            let service = server.serve(server_io).await.unwrap();
            service.waiting().await.unwrap();
        });
        let client = ().serve(client_io).await.unwrap();

        let tools = client.list_all_tools().await.unwrap();
        assert_eq!(tools.len(), 5);
        assert_eq!(tools[0].name, "send_command");

        let templates = client.list_all_resource_templates().await.unwrap();
        assert_eq!(templates.len(), 3);

        let call: CallToolRequestParam = serde_json::from_value(json!({
            "name": "control_devices_by_type",
            "arguments": {"device_type": "Jalousie", "action": "FullUp"}
        }))
        .unwrap();
        let result = client.call_tool(call).await.unwrap();
        assert_eq!(result.is_error, Some(false));
        assert_eq!(
            result_text(&result),
            "Controlled 2 devices of type Jalousie:\nKitchen Blind: OK\nLiving Blind: OK"
        );
        assert_eq!(
            factory.client().commands(),
            vec![
                "jdev/sps/io/kitchen-blind/FullUp",
                "jdev/sps/io/living-blind/FullUp"
            ]
        );

        let read: ReadResourceRequestParam =
            serde_json::from_value(json!({"uri": "lox://rooms"})).unwrap();
        let rooms = serde_json::to_value(client.read_resource(read).await.unwrap()).unwrap();
        assert_eq!(rooms["contents"][0]["mimeType"], "application/json");
        let rooms: Value =
            serde_json::from_str(rooms["contents"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(rooms.as_array().unwrap().len(), 3);

        let unknown: ReadResourceRequestParam =
            serde_json::from_value(json!({"uri": "lox://weather"})).unwrap();
        assert!(client.read_resource(unknown).await.is_err());

        client.cancel().await.unwrap();
        server_task.await.unwrap();
    }
}
