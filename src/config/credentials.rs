//! Miniserver credentials
//!
//! Credentials are supplied out-of-band through the environment (or the
//! matching command-line flags) and are only ever used for basic
//! authentication against the Miniserver.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Loxone credentials
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoxoneCredentials {
    /// Username for Loxone authentication
    pub username: String,

    /// Password for Loxone authentication
    pub password: String,
}

impl LoxoneCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value of the `Authorization` header for basic auth
    pub fn basic_auth_header(&self) -> String {
        use base64::Engine;

        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(format!(
                "{username}:{password}",
                username = self.username,
                password = self.password
            ))
        )
    }
}

// Never print the password, not even in debug logs.
impl fmt::Debug for LoxoneCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxoneCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header() {
        let credentials = LoxoneCredentials::new("admin", "secret");
        // base64("admin:secret")
        assert_eq!(credentials.basic_auth_header(), "Basic YWRtaW46c2VjcmV0");
    }

    #[test]
    fn test_debug_redacts_password() {
        let credentials = LoxoneCredentials::new("admin", "hunter2");
        let printed = format!("{credentials:?}");
        assert!(printed.contains("admin"));
        assert!(!printed.contains("hunter2"));
    }
}
