//! Per-request session resolution.
//!
//! The identity token travels either as `Authorization: Bearer <jwt>` or in
//! the `metamapa_session` cookie. A request without a token is anonymous; a
//! token that fails validation yields a failed session, which the guard turns
//! into an explicit login.
use crate::auth::oidc::OidcValidator;
use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use metamapa_authz::{Identity, RoleExtractor, SessionAccessor, SessionStatus};
use std::sync::Arc;

pub const SESSION_COOKIE: &str = "metamapa_session";

/// Identity token carried by the request, if any. The bearer header wins over
/// the cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
        && let Some(token) = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
    {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Session accessor bound to one request's token.
pub struct TokenSession {
    validator: OidcValidator,
    extractor: Arc<RoleExtractor>,
    token: Option<String>,
}

impl TokenSession {
    pub fn new(validator: OidcValidator, extractor: Arc<RoleExtractor>, token: Option<String>) -> Self {
        Self {
            validator,
            extractor,
            token,
        }
    }

    pub fn from_headers(
        validator: &OidcValidator,
        extractor: &Arc<RoleExtractor>,
        headers: &HeaderMap,
    ) -> Self {
        Self::new(validator.clone(), Arc::clone(extractor), session_token(headers))
    }
}

#[async_trait]
impl SessionAccessor for TokenSession {
    async fn session(&self) -> SessionStatus {
        let Some(token) = self.token.as_deref() else {
            return SessionStatus::Anonymous;
        };
        let claims = match self.validator.validate(token).await {
            Ok(claims) => claims,
            Err(err) => {
                tracing::warn!(error = %err, "identity token rejected");
                return SessionStatus::Failed(err.to_string());
            }
        };
        match Identity::from_claims(&claims, &self.extractor) {
            Ok(identity) => {
                tracing::debug!(
                    subject = %identity.subject,
                    roles = %identity.roles,
                    "session resolved"
                );
                SessionStatus::Authenticated(identity)
            }
            Err(err) => {
                tracing::warn!(error = %err, "identity claims rejected");
                SessionStatus::Failed(err.to_string())
            }
        }
    }
}
