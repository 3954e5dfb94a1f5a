//! Role names and role sets.
//!
//! # Purpose
//! Wraps role strings so every comparison happens on the uppercase form the
//! routes are declared with.
//!
//! # Key invariants
//! - A [`Role`] is non-empty, trimmed, and uppercase.
//! - A [`RoleSet`] holds no duplicates and keeps first-seen order, which is
//!   the order shown to users on the access-denied view.
//!
//! # Examples
//! ```rust
//! use metamapa_authz::{Role, RoleSet};
//!
//! let held = RoleSet::from_names(["user", "User", "contributor"]);
//! assert_eq!(held.to_string(), "USER, CONTRIBUTOR");
//! assert!(held.contains(&Role::contributor()));
//! ```
use crate::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Uppercase role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role(String);

impl Role {
    pub const ADMIN: &'static str = "ADMIN";
    pub const CONTRIBUTOR: &'static str = "CONTRIBUTOR";
    pub const USER: &'static str = "USER";

    /// Normalize a raw role name.
    ///
    /// # Errors
    /// - [`AuthzError::InvalidRole`] when the name is blank.
    pub fn new(value: impl AsRef<str>) -> AuthzResult<Self> {
        let raw = value.as_ref();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AuthzError::InvalidRole(raw.to_string()));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn admin() -> Self {
        Self(Self::ADMIN.to_string())
    }

    pub fn contributor() -> Self {
        Self(Self::CONTRIBUTOR.to_string())
    }

    pub fn user() -> Self {
        Self(Self::USER.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Role {
    type Error = AuthzError;

    fn try_from(value: String) -> AuthzResult<Self> {
        Role::new(value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

/// Ordered, duplicate-free set of roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from raw names, skipping blank entries.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for name in names {
            if let Ok(role) = Role::new(name) {
                set.insert(role);
            }
        }
        set
    }

    /// Insert a role; returns `false` when it was already present.
    pub fn insert(&mut self, role: Role) -> bool {
        if self.0.contains(&role) {
            return false;
        }
        self.0.push(role);
        true
    }

    pub fn extend(&mut self, other: RoleSet) {
        for role in other.0 {
            self.insert(role);
        }
    }

    pub fn contains(&self, role: &Role) -> bool {
        self.0.contains(role)
    }

    pub fn intersects(&self, other: &RoleSet) -> bool {
        self.0.iter().any(|role| other.contains(role))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|role| role.to_string()).collect()
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        f.write_str(&names.join(", "))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        let mut set = RoleSet::new();
        for role in iter {
            set.insert(role);
        }
        set
    }
}
