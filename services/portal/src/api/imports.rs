//! Dataset import endpoints (administrators only).
use crate::api::error::{ApiError, api_upstream, api_validation_error};
use crate::api::require;
use crate::api::types::{ImportHistoryResponse, ImportResponse, ImportRunView};
use crate::app::AppState;
use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use metamapa_authz::{Role, RoutePolicy};
use metamapa_common::Attachment;

const IMPORT_FAILED: &str = "Error al importar";
const IMPORT_UNREACHABLE: &str = "Error de conexión al importar el dataset";
const HISTORY_FAILED: &str = "Error al obtener el historial de importaciones";

fn admin_policy() -> RoutePolicy {
    RoutePolicy::any_of([Role::ADMIN])
}

#[utoipa::path(
    post,
    path = "/v1/admin/importar-dataset",
    tag = "imports",
    request_body(content = String, content_type = "multipart/form-data", description = "CSV dataset in the `file` part"),
    responses(
        (status = 200, description = "Import report", body = ImportResponse),
        (status = 400, description = "Missing, empty or non-CSV file", body = crate::api::types::ErrorResponse),
        (status = 401, description = "No session", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Not an administrator", body = crate::api::types::ErrorResponse),
        (status = 502, description = "Remote API failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn import_dataset(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, ApiError> {
    let identity = require(&state, &headers, &admin_policy(), "/importar-dataset").await?;

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| api_validation_error(&format!("multipart inválido: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| api_validation_error(&format!("archivo ilegible: {err}")))?;
        file = Some(Attachment {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let file = file.ok_or_else(|| api_validation_error("Seleccioná un archivo CSV"))?;
    if file.bytes.is_empty() {
        return Err(api_validation_error("El archivo está vacío"));
    }
    if !file.is_csv() {
        return Err(api_validation_error("Solo se aceptan archivos CSV"));
    }

    let file_name = file.file_name.clone();
    let report = state
        .api
        .import_dataset(&identity.subject, file)
        .await
        .map_err(|err| {
            metrics::counter!("metamapa_portal_writes_total", "operation" => "import_dataset", "outcome" => "error")
                .increment(1);
            api_upstream(&err, IMPORT_FAILED, IMPORT_UNREACHABLE)
        })?;
    metrics::counter!("metamapa_portal_writes_total", "operation" => "import_dataset", "outcome" => "ok")
        .increment(1);
    tracing::info!(
        admin = %identity.subject,
        file = %file_name,
        procesadas = report.procesadas,
        insertadas = report.insertadas,
        errores = report.errores.len(),
        "dataset imported"
    );
    state.feeds.refresh_all();
    Ok(Json(ImportResponse { report }))
}

#[utoipa::path(
    get,
    path = "/v1/admin/importaciones",
    tag = "imports",
    responses(
        (status = 200, description = "Previous import runs", body = ImportHistoryResponse),
        (status = 401, description = "No session", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Not an administrator", body = crate::api::types::ErrorResponse),
        (status = 502, description = "Remote API failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_imports(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ImportHistoryResponse>, ApiError> {
    require(&state, &headers, &admin_policy(), "/importar-dataset").await?;
    let runs = state
        .api
        .list_imports()
        .await
        .map_err(|err| api_upstream(&err, HISTORY_FAILED, HISTORY_FAILED))?;
    Ok(Json(ImportHistoryResponse {
        items: runs
            .into_iter()
            .map(|run| ImportRunView {
                resultado: run.outcome(),
                run,
            })
            .collect(),
    }))
}
