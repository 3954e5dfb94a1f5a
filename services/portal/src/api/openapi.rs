//! OpenAPI schema aggregation for the portal API.
use crate::api::types::{
    AccessResponse, ErrorResponse, FactCreatedResponse, HealthStatus, ImportHistoryResponse,
    ImportResponse, ImportRunView, MapResponse, SessionResponse,
};
use crate::api::{access, facts, imports, map, session, system};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "metamapa-portal",
        version = "v1",
        description = "MetaMapa portal HTTP API"
    ),
    paths(
        system::system_health,
        session::current_session,
        access::check_access,
        map::map_view,
        facts::create_fact,
        imports::import_dataset,
        imports::list_imports
    ),
    components(schemas(
        HealthStatus,
        ErrorResponse,
        AccessResponse,
        SessionResponse,
        MapResponse,
        FactCreatedResponse,
        ImportResponse,
        ImportRunView,
        ImportHistoryResponse
    )),
    tags(
        (name = "system", description = "Health endpoints"),
        (name = "session", description = "Current visitor session"),
        (name = "access", description = "Route access decisions"),
        (name = "map", description = "Map aggregation view"),
        (name = "facts", description = "Fact submission"),
        (name = "imports", description = "Dataset imports")
    )
)]
pub struct ApiDoc;
