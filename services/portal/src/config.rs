use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9090";
pub const DEFAULT_OIDC_ISSUER: &str = "https://metamapa.us.auth0.com/";
pub const DEFAULT_OIDC_AUDIENCE: &str = "https://metamapa-api";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/callback";
pub const DEFAULT_JWKS_TTL_SECS: u64 = 3600;
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 60;
pub const DEFAULT_MAP_REFRESH_SECS: u64 = 60;
pub const DEFAULT_MAP_FIRST_WAIT_MS: u64 = 2000;
pub const DEFAULT_MAP_IDLE_TTL_SECS: u64 = 300;
pub const DEFAULT_MAP_MAX_FEEDS: usize = 64;

// Portal configuration sourced from environment variables, optionally
// overridden by the YAML file named in METAMAPA_PORTAL_CONFIG.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub api: ApiSettings,
    pub oidc: OidcSettings,
    pub map: MapSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OidcSettings {
    /// Issuer as it appears in the `iss` claim, trailing slash included.
    pub issuer: String,
    pub audience: String,
    pub client_id: String,
    pub redirect_uri: String,
    /// Defaults to `{issuer}authorize`.
    pub authorize_url: Option<String>,
    pub jwks_ttl: Duration,
    pub clock_skew_seconds: u64,
    /// Also read roles from the `permissions` claim.
    pub roles_from_permissions: bool,
}

impl OidcSettings {
    pub fn authorize_endpoint(&self) -> String {
        self.authorize_url.clone().unwrap_or_else(|| {
            format!("{}/authorize", self.issuer.trim_end_matches('/'))
        })
    }
}

#[derive(Debug, Clone)]
pub struct MapSettings {
    pub refresh_interval: Duration,
    pub first_wait: Duration,
    pub idle_ttl: Duration,
    /// Upper bound on concurrently polling feeds.
    pub max_feeds: usize,
}

#[derive(Debug, Default, Deserialize)]
struct PortalConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    api_url: Option<String>,
    api_timeout_ms: Option<u64>,
    oidc: Option<OidcOverride>,
    map: Option<MapOverride>,
}

#[derive(Debug, Default, Deserialize)]
struct OidcOverride {
    issuer: Option<String>,
    audience: Option<String>,
    client_id: Option<String>,
    redirect_uri: Option<String>,
    authorize_url: Option<String>,
    jwks_ttl_secs: Option<u64>,
    clock_skew_secs: Option<u64>,
    roles_from_permissions: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct MapOverride {
    refresh_secs: Option<u64>,
    first_wait_ms: Option<u64>,
    idle_ttl_secs: Option<u64>,
    max_feeds: Option<usize>,
}

fn env_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("parse {key}"))
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl PortalConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_parse("METAMAPA_PORTAL_BIND", DEFAULT_BIND)?;
        let metrics_bind = env_parse("METAMAPA_METRICS_BIND", DEFAULT_METRICS_BIND)?;
        let api = ApiSettings {
            base_url: env_string("METAMAPA_API_URL", metamapa_client::DEFAULT_API_URL),
            request_timeout: Duration::from_millis(env_parse(
                "METAMAPA_API_TIMEOUT_MS",
                &metamapa_client::DEFAULT_REQUEST_TIMEOUT
                    .as_millis()
                    .to_string(),
            )?),
        };
        let oidc = OidcSettings {
            issuer: env_string("METAMAPA_OIDC_ISSUER", DEFAULT_OIDC_ISSUER),
            audience: env_string("METAMAPA_OIDC_AUDIENCE", DEFAULT_OIDC_AUDIENCE),
            client_id: env_string("METAMAPA_OIDC_CLIENT_ID", ""),
            redirect_uri: env_string("METAMAPA_OIDC_REDIRECT_URI", DEFAULT_REDIRECT_URI),
            authorize_url: std::env::var("METAMAPA_OIDC_AUTHORIZE_URL").ok(),
            jwks_ttl: Duration::from_secs(env_parse(
                "METAMAPA_OIDC_JWKS_TTL_SECS",
                &DEFAULT_JWKS_TTL_SECS.to_string(),
            )?),
            clock_skew_seconds: env_parse(
                "METAMAPA_OIDC_CLOCK_SKEW_SECS",
                &DEFAULT_CLOCK_SKEW_SECS.to_string(),
            )?,
            roles_from_permissions: env_parse("METAMAPA_OIDC_ROLES_FROM_PERMISSIONS", "false")?,
        };
        let map = MapSettings {
            refresh_interval: Duration::from_secs(env_parse(
                "METAMAPA_MAP_REFRESH_SECS",
                &DEFAULT_MAP_REFRESH_SECS.to_string(),
            )?),
            first_wait: Duration::from_millis(env_parse(
                "METAMAPA_MAP_FIRST_WAIT_MS",
                &DEFAULT_MAP_FIRST_WAIT_MS.to_string(),
            )?),
            idle_ttl: Duration::from_secs(env_parse(
                "METAMAPA_MAP_IDLE_TTL_SECS",
                &DEFAULT_MAP_IDLE_TTL_SECS.to_string(),
            )?),
            max_feeds: env_parse("METAMAPA_MAP_MAX_FEEDS", &DEFAULT_MAP_MAX_FEEDS.to_string())?,
        };
        let config = Self {
            bind_addr,
            metrics_bind,
            api,
            oidc,
            map,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("METAMAPA_PORTAL_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read METAMAPA_PORTAL_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
            config.validate()?;
        }
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.map.refresh_interval.is_zero() {
            bail!("map refresh interval must be at least one second");
        }
        if self.map.max_feeds == 0 {
            bail!("map max_feeds must be at least 1");
        }
        Ok(())
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: PortalConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse portal config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.api_url {
            self.api.base_url = value;
        }
        if let Some(value) = override_cfg.api_timeout_ms {
            self.api.request_timeout = Duration::from_millis(value);
        }
        if let Some(oidc) = override_cfg.oidc {
            let target = &mut self.oidc;
            if let Some(value) = oidc.issuer {
                target.issuer = value;
            }
            if let Some(value) = oidc.audience {
                target.audience = value;
            }
            if let Some(value) = oidc.client_id {
                target.client_id = value;
            }
            if let Some(value) = oidc.redirect_uri {
                target.redirect_uri = value;
            }
            if oidc.authorize_url.is_some() {
                target.authorize_url = oidc.authorize_url;
            }
            if let Some(value) = oidc.jwks_ttl_secs {
                target.jwks_ttl = Duration::from_secs(value);
            }
            if let Some(value) = oidc.clock_skew_secs {
                target.clock_skew_seconds = value;
            }
            if let Some(value) = oidc.roles_from_permissions {
                target.roles_from_permissions = value;
            }
        }
        if let Some(map) = override_cfg.map {
            if let Some(value) = map.refresh_secs {
                self.map.refresh_interval = Duration::from_secs(value);
            }
            if let Some(value) = map.first_wait_ms {
                self.map.first_wait = Duration::from_millis(value);
            }
            if let Some(value) = map.idle_ttl_secs {
                self.map.idle_ttl = Duration::from_secs(value);
            }
            if let Some(value) = map.max_feeds {
                self.map.max_feeds = value;
            }
        }
        Ok(())
    }
}
