use crate::config::ServerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies one conversation with the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// One of the configured organizations
    pub organization: String,

    /// Opaque token, regenerated whenever the organization changes
    pub request_id: Uuid,
}

impl SessionKey {
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            request_id: Uuid::new_v4(),
        }
    }

    /// Same organization, fresh request id
    pub fn renewed(&self) -> Self {
        Self::new(self.organization.clone())
    }

    /// `ws://<host><path>/<organization>/<request_id>`
    pub fn endpoint_url(&self, server: &ServerConfig) -> String {
        format!(
            "ws://{}/{}/{}/{}",
            server.host,
            server.path.trim_matches('/'),
            self.organization,
            self.request_id
        )
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organization, self.request_id)
    }
}
