//! Authenticated identity model.
//!
//! # Purpose
//! Captures who the visitor is after the identity provider has vouched for
//! them: a stable subject, the display profile, and the roles used for route
//! decisions.
use crate::{AuthzError, AuthzResult, RoleExtractor, RoleSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    pub profile: Profile,
    pub roles: RoleSet,
}

impl Identity {
    pub fn new(subject: impl Into<String>, roles: RoleSet) -> Self {
        Self {
            subject: subject.into(),
            profile: Profile::default(),
            roles,
        }
    }

    /// Build an identity from verified token claims.
    ///
    /// # Errors
    /// - [`AuthzError::MalformedClaims`] when `claims` is not an object.
    /// - [`AuthzError::MissingSubject`] when `sub` is absent or blank.
    pub fn from_claims(claims: &Value, extractor: &RoleExtractor) -> AuthzResult<Self> {
        if !claims.is_object() {
            return Err(AuthzError::MalformedClaims);
        }
        let subject = claims
            .get("sub")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|sub| !sub.is_empty())
            .ok_or(AuthzError::MissingSubject)?;

        // Some providers only send a nickname or the email.
        let name = text_claim(claims, "name")
            .or_else(|| text_claim(claims, "nickname"))
            .or_else(|| text_claim(claims, "email"));

        Ok(Self {
            subject: subject.to_string(),
            profile: Profile {
                name,
                email: text_claim(claims, "email"),
                picture: text_claim(claims, "picture"),
                email_verified: claims
                    .get("email_verified")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            roles: extractor.extract(claims),
        })
    }

    pub fn display_name(&self) -> &str {
        self.profile.name.as_deref().unwrap_or(&self.subject)
    }
}

fn text_claim(claims: &Value, name: &str) -> Option<String> {
    claims
        .get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}
