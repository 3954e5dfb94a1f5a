//! Route access decisions.
//!
//! # Purpose
//! Turns (session status, route policy, requested path) into what the
//! visitor sees: a loading state, the route, a redirect, or the
//! access-denied view.
//!
//! # How it fits
//! [`evaluate`] is pure and safe to call on every navigation. [`AccessGuard`]
//! wraps it for callers that must start a login as a side effect: the login
//! effect fires once per unauthenticated episode and re-arms only after the
//! session passes through `Resolving` or `Authenticated`.
//!
//! # Key invariants
//! - Public routes render in every session state, including `Resolving`.
//! - A failed session always leads to an explicit login, even on routes whose
//!   policy would redirect anonymous visitors home.
//! - Protected content never renders while the session is ambiguous.
use crate::{RoleSet, RoutePolicy, SessionStatus, UnauthenticatedAction};
use serde::Serialize;

pub const HOME_PATH: &str = "/";
const NO_ROLES_LABEL: &str = "Ninguno";

/// Content of the access-denied view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeniedView {
    pub required: RoleSet,
    pub held: RoleSet,
    pub home: String,
}

impl DeniedView {
    pub fn required_label(&self) -> String {
        self.required.to_string()
    }

    /// Held roles as shown to the visitor; `Ninguno` when there are none.
    pub fn held_label(&self) -> String {
        if self.held.is_empty() {
            NO_ROLES_LABEL.to_string()
        } else {
            self.held.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    Loading,
    Render,
    RedirectHome,
    LoginRedirect { return_to: String },
    Denied(DeniedView),
}

impl GuardDecision {
    /// Short name used for logs and metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Render => "render",
            Self::RedirectHome => "redirect_home",
            Self::LoginRedirect { .. } => "login_redirect",
            Self::Denied(_) => "denied",
        }
    }
}

pub fn evaluate(status: &SessionStatus, policy: Option<&RoutePolicy>, path: &str) -> GuardDecision {
    let Some(policy) = policy else {
        return GuardDecision::Render;
    };
    match status {
        SessionStatus::Resolving => GuardDecision::Loading,
        SessionStatus::Anonymous => match policy.on_unauthenticated {
            UnauthenticatedAction::RedirectHome => GuardDecision::RedirectHome,
            UnauthenticatedAction::Login => login(path),
        },
        SessionStatus::Failed(reason) => {
            tracing::debug!(%reason, path, "session failed; starting login");
            login(path)
        }
        SessionStatus::Authenticated(identity) => {
            if policy.admits(identity) {
                GuardDecision::Render
            } else {
                GuardDecision::Denied(DeniedView {
                    required: policy.required.clone(),
                    held: identity.roles.clone(),
                    home: HOME_PATH.to_string(),
                })
            }
        }
    }
}

fn login(path: &str) -> GuardDecision {
    GuardDecision::LoginRedirect {
        return_to: path.to_string(),
    }
}

/// Side effect requested by the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardEffect {
    Login { return_to: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    pub decision: GuardDecision,
    pub effect: Option<GuardEffect>,
}

/// Stateful guard that issues the login effect at most once per
/// unauthenticated episode.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    login_armed: bool,
}

impl Default for AccessGuard {
    fn default() -> Self {
        Self { login_armed: true }
    }
}

impl AccessGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(
        &mut self,
        status: &SessionStatus,
        policy: Option<&RoutePolicy>,
        path: &str,
    ) -> GuardOutcome {
        if matches!(
            status,
            SessionStatus::Resolving | SessionStatus::Authenticated(_)
        ) {
            self.login_armed = true;
        }

        let decision = evaluate(status, policy, path);
        let effect = match &decision {
            GuardDecision::LoginRedirect { return_to } if self.login_armed => {
                self.login_armed = false;
                Some(GuardEffect::Login {
                    return_to: return_to.clone(),
                })
            }
            _ => None,
        };
        GuardOutcome { decision, effect }
    }
}
