//! Authentication for the portal.
//!
//! # Purpose
//! Resolves the visitor's session from the request's identity token and
//! builds login redirects to the identity provider.
pub mod login;
pub mod oidc;
pub mod session;
