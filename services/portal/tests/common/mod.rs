#![allow(dead_code)]

use metamapa_portal::app::{AppState, build_router};
use metamapa_portal::config::{ApiSettings, MapSettings, OidcSettings, PortalConfig};
use metamapa_test_harness::{IdpFixture, StubApi};
use std::time::Duration;

pub const AUDIENCE: &str = "https://metamapa-api";

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Portal wired to a local identity provider and a stub MetaMapa API.
pub struct Portal {
    pub idp: IdpFixture,
    pub api: StubApi,
    pub state: AppState,
}

impl Portal {
    pub async fn spawn() -> Self {
        let idp = IdpFixture::spawn(AUDIENCE).await.expect("idp");
        let api = StubApi::spawn().await.expect("stub api");
        let state = AppState::from_config(&portal_config(&idp, &api)).expect("state");
        Self { idp, api, state }
    }

    pub fn app(&self) -> axum::routing::RouterIntoService<axum::body::Body, ()> {
        build_router(self.state.clone()).into_service()
    }

    pub fn token(&self, subject: &str, roles: &[&str]) -> String {
        self.idp.token_for(subject, roles)
    }
}

pub fn portal_config(idp: &IdpFixture, api: &StubApi) -> PortalConfig {
    PortalConfig {
        bind_addr: "127.0.0.1:0".parse().expect("bind"),
        metrics_bind: "127.0.0.1:0".parse().expect("metrics"),
        api: ApiSettings {
            base_url: api.base_url(),
            request_timeout: Duration::from_secs(2),
        },
        oidc: OidcSettings {
            issuer: idp.issuer().to_string(),
            audience: AUDIENCE.to_string(),
            client_id: "portal-client".to_string(),
            redirect_uri: "http://localhost:3000/callback".to_string(),
            authorize_url: None,
            jwks_ttl: Duration::from_secs(300),
            clock_skew_seconds: 0,
            roles_from_permissions: false,
        },
        map: MapSettings {
            refresh_interval: Duration::from_secs(60),
            first_wait: Duration::from_secs(2),
            idle_ttl: Duration::from_secs(60),
            max_feeds: 16,
        },
    }
}
