//! Portal HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules plus the shared session/guard helpers every
//! guarded handler runs before touching data.
pub mod access;
pub mod error;
pub mod facts;
pub mod imports;
pub mod map;
pub mod openapi;
pub mod session;
pub mod system;
pub mod types;

use crate::api::error::{ApiError, api_forbidden, api_unauthorized};
use crate::app::AppState;
use crate::auth::session::TokenSession;
use axum::http::HeaderMap;
use metamapa_authz::{GuardDecision, Identity, RoutePolicy, SessionAccessor, SessionStatus, evaluate};

pub(crate) async fn resolve_session(state: &AppState, headers: &HeaderMap) -> SessionStatus {
    TokenSession::from_headers(&state.oidc_validator, &state.role_extractor, headers)
        .session()
        .await
}

pub(crate) fn record_decision(decision: &GuardDecision) {
    metrics::counter!("metamapa_guard_decisions_total", "decision" => decision.label())
        .increment(1);
}

/// Run the guard for an API operation and return the admitted identity.
///
/// Unlike navigation, API calls never redirect: anything short of `Render`
/// is 401 (no usable session) or 403 (roles do not match).
pub(crate) async fn require(
    state: &AppState,
    headers: &HeaderMap,
    policy: &RoutePolicy,
    operation: &str,
) -> Result<Identity, ApiError> {
    let status = resolve_session(state, headers).await;
    let decision = evaluate(&status, Some(policy), operation);
    record_decision(&decision);
    match (decision, status) {
        (GuardDecision::Render, SessionStatus::Authenticated(identity)) => Ok(identity),
        (GuardDecision::Denied(view), _) => {
            tracing::info!(
                operation,
                required = %view.required_label(),
                held = %view.held_label(),
                "operation denied"
            );
            Err(api_forbidden(&format!(
                "Acceso denegado. Roles requeridos: {}. Roles actuales: {}",
                view.required_label(),
                view.held_label()
            )))
        }
        _ => Err(api_unauthorized("Iniciá sesión para continuar")),
    }
}
