//! Map endpoint.
//!
//! Serves the marker view for a filter set from the shared feed registry.
//! The map lives on the public home page, so no session is required.
use crate::api::types::MapResponse;
use crate::app::AppState;
use axum::Json;
use axum::extract::{Query, State};
use metamapa_common::FilterCriteria;

#[utoipa::path(
    get,
    path = "/v1/mapa",
    tag = "map",
    params(
        ("categoria" = Option<String>, Query, description = "Fact category"),
        ("desde" = Option<String>, Query, description = "Earliest occurrence date (YYYY-MM-DD)"),
        ("hasta" = Option<String>, Query, description = "Latest occurrence date (YYYY-MM-DD)"),
        ("ubicacion" = Option<String>, Query, description = "Free-text location or title"),
        ("modo" = Option<String>, Query, description = "IRRESTRICTA or CURADA")
    ),
    responses(
        (status = 200, description = "Markers for the current fact set", body = MapResponse)
    )
)]
pub(crate) async fn map_view(
    State(state): State<AppState>,
    Query(criteria): Query<FilterCriteria>,
) -> Json<MapResponse> {
    let view = state.feeds.view(criteria).await;
    Json(MapResponse {
        visible_label: format!("{} hechos visibles", view.visible),
        view,
    })
}
