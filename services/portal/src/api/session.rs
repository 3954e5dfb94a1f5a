// Current-session endpoint backing the profile page and the navbar.
use crate::api::error::{ApiError, api_unauthorized};
use crate::api::resolve_session;
use crate::api::types::SessionResponse;
use crate::app::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use metamapa_authz::SessionStatus;

#[utoipa::path(
    get,
    path = "/v1/session",
    tag = "session",
    responses(
        (status = 200, description = "Authenticated identity with its roles", body = SessionResponse),
        (status = 401, description = "No session or the identity token was rejected", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn current_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ApiError> {
    match resolve_session(&state, &headers).await {
        SessionStatus::Authenticated(identity) => Ok(Json(SessionResponse {
            display_name: identity.display_name().to_string(),
            identity,
        })),
        SessionStatus::Failed(_) => Err(api_unauthorized("La sesión no es válida")),
        SessionStatus::Anonymous | SessionStatus::Resolving => {
            Err(api_unauthorized("No hay una sesión iniciada"))
        }
    }
}
