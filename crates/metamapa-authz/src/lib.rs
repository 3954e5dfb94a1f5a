//! MetaMapa route authorization primitives.
//!
//! # Purpose
//! Decides, per navigation, whether the current identity may view a route.
//! Identities come from identity-provider claims; routes declare the roles
//! they accept.
//!
//! # How it fits
//! The portal resolves a [`SessionStatus`] through an injected
//! [`SessionAccessor`], looks the requested path up in the [`RouteTable`],
//! and hands both to [`evaluate`] (or to the stateful [`AccessGuard`] when a
//! login side effect must be issued at most once).
//!
//! # Key invariants
//! - Role names are uppercase; comparisons never depend on claim casing.
//! - A policy with a non-empty role set is satisfied iff the identity's roles
//!   intersect it.
//! - Ambiguous session state never renders protected content.
//!
//! # Examples
//! ```rust
//! use metamapa_authz::{GuardDecision, RouteTable, SessionStatus, evaluate};
//!
//! let table = RouteTable::metamapa();
//! let route = table.resolve("/crear-hecho").expect("route");
//! let decision = evaluate(&SessionStatus::Anonymous, route.policy.as_ref(), "/crear-hecho");
//! assert!(matches!(decision, GuardDecision::LoginRedirect { .. }));
//! ```
//!
//! # Common pitfalls
//! - Registering a parameterised route before its literal sibling.
//! - Reading roles from a single claim; use a [`RoleExtractor`].

mod claims;
mod errors;
mod guard;
mod identity;
mod policy;
mod role;
mod routes;
mod session;

pub use claims::{
    GENERIC_ROLES_CLAIM, NAMESPACED_ROLES_CLAIM, PERMISSIONS_CLAIM, RoleClaimSource,
    RoleExtractor,
};
pub use errors::{AuthzError, AuthzResult};
pub use guard::{
    AccessGuard, DeniedView, GuardDecision, GuardEffect, GuardOutcome, HOME_PATH, evaluate,
};
pub use identity::{Identity, Profile};
pub use policy::{RoutePolicy, UnauthenticatedAction, access_granted};
pub use role::{Role, RoleSet};
pub use routes::{RouteEntry, RouteTable};
pub use session::{SessionAccessor, SessionStatus, StaticSession};
