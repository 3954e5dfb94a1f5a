use crate::{Identity, RoleSet};
use serde::{Deserialize, Serialize};

/// What to do with a visitor who has no session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthenticatedAction {
    /// Send the visitor home without starting a login.
    RedirectHome,
    /// Start a login that returns to the requested path.
    Login,
}

/// Access requirements of a protected route.
///
/// An empty `required` set admits any authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePolicy {
    pub required: RoleSet,
    pub on_unauthenticated: UnauthenticatedAction,
}

impl RoutePolicy {
    pub fn authenticated() -> Self {
        Self {
            required: RoleSet::new(),
            on_unauthenticated: UnauthenticatedAction::Login,
        }
    }

    pub fn any_of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            required: RoleSet::from_names(roles),
            on_unauthenticated: UnauthenticatedAction::Login,
        }
    }

    pub fn silent(mut self) -> Self {
        self.on_unauthenticated = UnauthenticatedAction::RedirectHome;
        self
    }

    pub fn admits(&self, identity: &Identity) -> bool {
        self.required.is_empty() || self.required.intersects(&identity.roles)
    }
}

/// Access rule over an optional policy and optional identity.
///
/// Public routes are always granted; protected routes need an identity whose
/// roles intersect the policy (or any identity for an empty role set).
pub fn access_granted(policy: Option<&RoutePolicy>, identity: Option<&Identity>) -> bool {
    match (policy, identity) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(policy), Some(identity)) => policy.admits(identity),
    }
}
