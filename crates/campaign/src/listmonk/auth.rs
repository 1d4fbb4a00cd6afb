//! HTTP basic authentication for the Listmonk API

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::config::ServiceSettings;

/// Credentials sent with every API request
#[derive(Clone, Default)]
pub struct ListmonkAuth {
    username: Option<String>,
    password: Option<String>,
}

impl ListmonkAuth {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }

    pub fn from_settings(settings: &ServiceSettings) -> Self {
        Self::new(settings.username.clone(), settings.password.clone())
    }

    /// Value of the Authorization header, if any credentials are set
    pub fn header(&self) -> Option<String> {
        let username = self.username.as_deref().unwrap_or_default();
        let password = self.password.as_deref().unwrap_or_default();
        if username.is_empty() && password.is_empty() {
            return None;
        }
        let token = STANDARD.encode(format!("{}:{}", username, password));
        Some(format!("Basic {}", token))
    }
}

impl std::fmt::Debug for ListmonkAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListmonkAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}
