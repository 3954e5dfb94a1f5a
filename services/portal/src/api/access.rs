//! Navigation access decisions.
//!
//! # Purpose and responsibility
//! Answers "may this visitor open this client-side path?" before the browser
//! renders anything. The decision body is always JSON; the status code and
//! `Location` header mirror the decision so a plain HTTP client can follow
//! redirects.
//!
//! # Key invariants and assumptions
//! - Public routes answer 200 whatever the session state.
//! - Failed sessions always produce a login redirect.
//! - Unknown paths are 404 and never consult the session.
use crate::api::error::{ApiError, api_not_found, api_validation_error};
use crate::api::types::{AccessQuery, AccessResponse};
use crate::api::{record_decision, resolve_session};
use crate::app::AppState;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use metamapa_authz::{GuardDecision, HOME_PATH, evaluate};

#[utoipa::path(
    get,
    path = "/v1/access",
    tag = "access",
    params(AccessQuery),
    responses(
        (status = 200, description = "Route may render", body = AccessResponse),
        (status = 302, description = "Login required; Location points at the identity provider", body = AccessResponse),
        (status = 303, description = "Anonymous visitor sent home", body = AccessResponse),
        (status = 403, description = "Authenticated but missing a required role", body = AccessResponse),
        (status = 404, description = "No such route", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn check_access(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AccessQuery>,
) -> Result<Response, ApiError> {
    if !query.path.starts_with('/') {
        return Err(api_validation_error("path must start with '/'"));
    }
    let route = state
        .routes
        .resolve(&query.path)
        .ok_or_else(|| api_not_found("Página no encontrada"))?;

    // Public routes skip token validation entirely.
    let decision = match &route.policy {
        None => GuardDecision::Render,
        Some(policy) => {
            let status = resolve_session(&state, &headers).await;
            evaluate(&status, Some(policy), &query.path)
        }
    };
    record_decision(&decision);
    tracing::debug!(
        path = %query.path,
        route = %route.pattern,
        decision = decision.label(),
        "access evaluated"
    );

    let (status, location) = match &decision {
        GuardDecision::Render => (StatusCode::OK, None),
        GuardDecision::Loading => (StatusCode::ACCEPTED, None),
        GuardDecision::RedirectHome => (StatusCode::SEE_OTHER, Some(HOME_PATH.to_string())),
        GuardDecision::LoginRedirect { return_to } => {
            (StatusCode::FOUND, Some(state.login.url_for(return_to)))
        }
        GuardDecision::Denied(_) => (StatusCode::FORBIDDEN, None),
    };
    let (required_label, held_label) = match &decision {
        GuardDecision::Denied(view) => (Some(view.required_label()), Some(view.held_label())),
        _ => (None, None),
    };
    let login_url = match &decision {
        GuardDecision::LoginRedirect { .. } => location.clone(),
        _ => None,
    };
    let body = AccessResponse {
        path: query.path,
        route: route.pattern.clone(),
        decision,
        login_url,
        required_label,
        held_label,
    };

    let mut response = (status, Json(body)).into_response();
    if let Some(location) = location
        && let Ok(value) = HeaderValue::from_str(&location)
    {
        response.headers_mut().insert(header::LOCATION, value);
    }
    Ok(response)
}
