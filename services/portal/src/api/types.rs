//! HTTP API request/response types.
//!
//! Domain payloads (decisions, map views, import reports) come from the
//! library crates and are documented as free-form objects in the schema.
use metamapa_authz::{GuardDecision, Identity};
use metamapa_common::{ImportOutcome, ImportReport, ImportRun};
use metamapa_map::MapView;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccessQuery {
    /// Client-side path being navigated to.
    pub path: String,
}

/// Guard outcome for one navigation.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccessResponse {
    pub path: String,
    /// Matched route pattern.
    pub route: String,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub decision: GuardDecision,
    /// Present for login redirects.
    pub login_url: Option<String>,
    /// Present for denials: roles the route accepts and roles held
    /// (`Ninguno` when none).
    pub required_label: Option<String>,
    pub held_label: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub display_name: String,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub identity: Identity,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MapResponse {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub view: MapView,
    /// Footer text, e.g. `3 hechos visibles`.
    pub visible_label: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FactCreatedResponse {
    pub message: String,
    #[schema(value_type = Option<Object>)]
    pub hecho: Option<metamapa_common::Fact>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportResponse {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub report: ImportReport,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportRunView {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub run: ImportRun,
    #[schema(value_type = String)]
    pub resultado: ImportOutcome,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportHistoryResponse {
    pub items: Vec<ImportRunView>,
}
