//! Portal HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! `AppState::from_config` does no network I/O: the IdP and the remote API are
//! contacted lazily, so the portal starts even when either is down.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::auth::login::LoginRedirect;
use crate::auth::oidc::{IssuerConfig, OidcValidator};
use crate::config::PortalConfig;
use crate::feeds::FeedRegistry;
use crate::observability;
use anyhow::Context;
use axum::{Json, Router};
use metamapa_authz::{RoleExtractor, RouteTable};
use metamapa_client::{ApiClient, ClientConfig};
use metamapa_map::{FactSource, FeedConfig};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub oidc_validator: OidcValidator,
    pub role_extractor: Arc<RoleExtractor>,
    pub login: Arc<LoginRedirect>,
    pub api: ApiClient,
    pub feeds: FeedRegistry,
}

impl AppState {
    pub fn from_config(config: &PortalConfig) -> anyhow::Result<Self> {
        let api = ApiClient::new(&ClientConfig {
            base_url: config.api.base_url.clone(),
            request_timeout: config.api.request_timeout,
        })
        .context("metamapa api client")?;

        let login = LoginRedirect::from_settings(&config.oidc);
        login.validate()?;

        let oidc_validator = OidcValidator::new(
            IssuerConfig {
                issuer: config.oidc.issuer.clone(),
                audience: config.oidc.audience.clone(),
                jwks_url: None,
            },
            config.oidc.jwks_ttl,
            config.oidc.jwks_ttl,
            config.oidc.clock_skew_seconds,
        );
        let role_extractor = if config.oidc.roles_from_permissions {
            RoleExtractor::with_permissions()
        } else {
            RoleExtractor::default()
        };

        let source: Arc<dyn FactSource> = Arc::new(api.clone());
        let feeds = FeedRegistry::new(
            source,
            FeedConfig {
                refresh_interval: config.map.refresh_interval,
            },
            config.map.first_wait,
            config.map.idle_ttl,
            config.map.max_feeds,
        );

        Ok(Self {
            routes: Arc::new(RouteTable::metamapa()),
            oidc_validator,
            role_extractor: Arc::new(role_extractor),
            login: Arc::new(login),
            api,
            feeds,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route(
            "/v1/session",
            axum::routing::get(api::session::current_session),
        )
        .route("/v1/access", axum::routing::get(api::access::check_access))
        .route("/v1/mapa", axum::routing::get(api::map::map_view))
        .route("/v1/hechos", axum::routing::post(api::facts::create_fact))
        .route(
            "/v1/admin/importar-dataset",
            axum::routing::post(api::imports::import_dataset),
        )
        .route(
            "/v1/admin/importaciones",
            axum::routing::get(api::imports::list_imports),
        )
        .route(
            "/v1/openapi.json",
            axum::routing::get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(trace_layer)
        .with_state(state)
}
