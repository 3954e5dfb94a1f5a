//! MetaMapa portal HTTP service entry point.
//!
//! # Purpose
//! Loads configuration, builds the application state, starts the metrics
//! listener and the idle-feed sweeper, then serves the portal API until
//! shutdown.
use metamapa_portal::app::{AppState, build_router};
use metamapa_portal::{config, observability};
use std::future::Future;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::PortalConfig::from_env_or_yaml()?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: config::PortalConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("metamapa-portal");
    let state = AppState::from_config(&config)?;
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let cancel = CancellationToken::new();
    let sweeper = state.feeds.spawn_sweeper(cancel.clone());
    let app = build_router(state.clone());

    let addr = config.bind_addr;
    tracing::info!(
        %addr,
        api = %config.api.base_url,
        issuer = %config.oidc.issuer,
        "portal listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    cancel.cancel();
    let _ = sweeper.await;
    state.feeds.shutdown_all();
    metrics_task.abort();
    let _ = metrics_task.await;
    tracing::info!("portal stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use metamapa_portal::config::{ApiSettings, MapSettings, OidcSettings};
    use serial_test::serial;
    use std::time::Duration;

    fn config() -> config::PortalConfig {
        config::PortalConfig {
            bind_addr: "127.0.0.1:0".parse().expect("bind"),
            metrics_bind: "127.0.0.1:0".parse().expect("metrics"),
            api: ApiSettings {
                base_url: "http://127.0.0.1:1/api".to_string(),
                request_timeout: Duration::from_millis(200),
            },
            oidc: OidcSettings {
                issuer: "https://issuer.test/".to_string(),
                audience: "https://metamapa-api".to_string(),
                client_id: "portal".to_string(),
                redirect_uri: "http://localhost:3000/callback".to_string(),
                authorize_url: None,
                jwks_ttl: Duration::from_secs(60),
                clock_skew_seconds: 0,
                roles_from_permissions: false,
            },
            map: MapSettings {
                refresh_interval: Duration::from_secs(60),
                first_wait: Duration::from_millis(50),
                idle_ttl: Duration::from_secs(60),
                max_feeds: 16,
            },
        }
    }

    #[tokio::test]
    #[serial]
    async fn run_with_shutdown_starts_and_stops() {
        run_with_shutdown(config(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
        })
        .await
        .expect("run should stop cleanly");
    }

    #[tokio::test]
    #[serial]
    async fn run_with_shutdown_fails_on_invalid_api_url() {
        let mut config = config();
        config.api.base_url = "not a url".to_string();
        let err = run_with_shutdown(config, async {})
            .await
            .err()
            .expect("invalid api url");
        assert!(err.to_string().contains("metamapa api client"));
    }
}
