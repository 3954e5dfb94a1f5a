//! Fact submission.
//!
//! # Purpose and responsibility
//! Accepts the fact creation form (a `hecho` JSON part plus `archivos` media
//! parts), validates it, and forwards it to the remote API on behalf of the
//! signed-in contributor.
//!
//! # Key invariants and assumptions
//! - Only contributors and administrators may submit.
//! - The contributor id sent upstream is the session subject, never a value
//!   taken from the form.
//! - Attachments that are not images or videos are dropped by the client.
use crate::api::error::{ApiError, api_upstream, api_validation_error};
use crate::api::require;
use crate::api::types::FactCreatedResponse;
use crate::app::AppState;
use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use metamapa_authz::{Role, RoutePolicy};
use metamapa_common::{Attachment, NewFactRequest};

const CREATE_FAILED: &str = "Error al crear el hecho";

#[utoipa::path(
    post,
    path = "/v1/hechos",
    tag = "facts",
    request_body(content = String, content_type = "multipart/form-data", description = "`hecho` JSON part and optional `archivos` files"),
    responses(
        (status = 201, description = "Fact created", body = FactCreatedResponse),
        (status = 400, description = "Invalid form", body = crate::api::types::ErrorResponse),
        (status = 401, description = "No session", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Not a contributor", body = crate::api::types::ErrorResponse),
        (status = 502, description = "Remote API failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_fact(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FactCreatedResponse>), ApiError> {
    let policy = RoutePolicy::any_of([Role::CONTRIBUTOR, Role::ADMIN]);
    let identity = require(&state, &headers, &policy, "/crear-hecho").await?;

    let (form, attachments) = read_fact_form(multipart).await?;
    let descriptor = form
        .into_descriptor()
        .map_err(|err| api_validation_error(&err.to_string()))?;

    let created = state
        .api
        .create_fact(&identity.subject, &descriptor, attachments)
        .await
        .map_err(|err| {
            metrics::counter!("metamapa_portal_writes_total", "operation" => "create_fact", "outcome" => "error")
                .increment(1);
            api_upstream(&err, CREATE_FAILED, CREATE_FAILED)
        })?;
    metrics::counter!("metamapa_portal_writes_total", "operation" => "create_fact", "outcome" => "ok")
        .increment(1);
    tracing::info!(
        contributor = %identity.subject,
        titulo = %descriptor.titulo,
        "fact submitted"
    );
    // Show the new fact on the map without waiting for the next interval.
    state.feeds.refresh_all();

    Ok((
        StatusCode::CREATED,
        Json(FactCreatedResponse {
            message: "Hecho creado correctamente".to_string(),
            hecho: created,
        }),
    ))
}

async fn read_fact_form(
    mut multipart: Multipart,
) -> Result<(NewFactRequest, Vec<Attachment>), ApiError> {
    let mut form = None;
    let mut attachments = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| api_validation_error(&format!("multipart inválido: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "hecho" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| api_validation_error(&format!("hecho ilegible: {err}")))?;
                let parsed: NewFactRequest = serde_json::from_slice(&bytes)
                    .map_err(|err| api_validation_error(&format!("hecho inválido: {err}")))?;
                form = Some(parsed);
            }
            "archivos" => {
                let file_name = field.file_name().unwrap_or("archivo").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| api_validation_error(&format!("archivo ilegible: {err}")))?;
                attachments.push(Attachment {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            other => tracing::debug!(field = other, "ignoring unknown multipart field"),
        }
    }
    let form = form.ok_or_else(|| api_validation_error("falta el campo hecho"))?;
    Ok((form, attachments))
}
