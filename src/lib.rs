//! Loxone MCP Server
//!
//! A Model Context Protocol server exposing a Loxone Miniserver's devices as
//! MCP tools and resources. Which tools and resources exist is decided by a
//! YAML definitions document; each entry names a handler kind that the
//! server dispatches to.
//!
//! # Features
//!
//! - Local, Loxone Cloud DNS (MAC) and full URL Miniserver addresses
//! - Lazy, single-flight connection and structure caching
//! - Device control by UUID, room, type or category
//! - Read-only structure views as `lox://` resources
//! - Stdio and HTTP transports

// Core modules
pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod http_transport;
pub mod logging;
pub mod server;
pub mod stdio_transport;
pub mod structure;

// Test support modules - available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

// Re-export main types for convenience
pub use adapter::LoxoneAdapter;
pub use config::ServerConfig;
pub use error::{LoxoneError, Result};
pub use server::LoxoneMcpServer;
