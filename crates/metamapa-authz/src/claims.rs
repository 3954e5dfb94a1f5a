//! Role extraction from identity-provider claims.
//!
//! Providers disagree on where roles live. The extractor walks an ordered
//! list of claim names, reads each as a string or an array of strings, and
//! unions the result into one [`RoleSet`].
use crate::{Role, RoleSet};
use serde_json::Value;

/// Namespaced custom claim added by the identity provider's login action.
pub const NAMESPACED_ROLES_CLAIM: &str = "https://metamapa.com/roles";
pub const GENERIC_ROLES_CLAIM: &str = "roles";
pub const PERMISSIONS_CLAIM: &str = "permissions";

/// One place in the claim set where roles may appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleClaimSource {
    Claim(String),
}

impl RoleClaimSource {
    pub fn claim(name: impl Into<String>) -> Self {
        Self::Claim(name.into())
    }

    fn read(&self, claims: &Value) -> Vec<String> {
        let Self::Claim(name) = self;
        string_or_array(claims.get(name.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleExtractor {
    sources: Vec<RoleClaimSource>,
}

impl Default for RoleExtractor {
    fn default() -> Self {
        Self::new(vec![
            RoleClaimSource::claim(NAMESPACED_ROLES_CLAIM),
            RoleClaimSource::claim(GENERIC_ROLES_CLAIM),
        ])
    }
}

impl RoleExtractor {
    pub fn new(sources: Vec<RoleClaimSource>) -> Self {
        Self { sources }
    }

    /// Default sources plus the `permissions` claim.
    pub fn with_permissions() -> Self {
        let mut extractor = Self::default();
        extractor
            .sources
            .push(RoleClaimSource::claim(PERMISSIONS_CLAIM));
        extractor
    }

    pub fn sources(&self) -> &[RoleClaimSource] {
        &self.sources
    }

    pub fn extract(&self, claims: &Value) -> RoleSet {
        let mut roles = RoleSet::new();
        for source in &self.sources {
            for name in source.read(claims) {
                if let Ok(role) = Role::new(&name) {
                    roles.insert(role);
                }
            }
        }
        roles
    }
}

fn string_or_array(value: Option<&Value>) -> Vec<String> {
    // Roles may be encoded as either a string or array of strings.
    match value {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(value)) => vec![value.clone()],
        _ => Vec::new(),
    }
}
