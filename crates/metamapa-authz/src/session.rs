use crate::Identity;
use async_trait::async_trait;
use serde::Serialize;

/// Session state as seen by the guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SessionStatus {
    /// The identity provider has not answered yet.
    Resolving,
    Anonymous,
    Authenticated(Identity),
    /// The provider failed or the token was rejected.
    Failed(String),
}

impl SessionStatus {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Source of the current session, injected into whatever runs the guard.
#[async_trait]
pub trait SessionAccessor: Send + Sync {
    async fn session(&self) -> SessionStatus;
}

/// Accessor returning a fixed status.
#[derive(Debug, Clone)]
pub struct StaticSession(pub SessionStatus);

#[async_trait]
impl SessionAccessor for StaticSession {
    async fn session(&self) -> SessionStatus {
        self.0.clone()
    }
}
