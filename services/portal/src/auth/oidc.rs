//! Identity-token validation with cached discovery and JWKS fetching.
//!
//! # Purpose
//! Verify the visitor's identity token against the configured issuer and
//! audience and hand the verified claims to the session layer.
//!
//! # Key invariants
//! - Only RS256 and ES256 tokens are accepted.
//! - Issuer, audience, expiry and `iat` are validated after the signature.
//! - JWKS and discovery caches are time-bounded; an unknown `kid` forces one
//!   JWKS refresh before failing.
//!
//! # Concurrency model
//! Caches live in `DashMap`s shared by every clone of the validator.
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use dashmap::DashMap;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where tokens come from and who they must be addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerConfig {
    pub issuer: String,
    pub audience: String,
    /// Skips discovery when set.
    pub jwks_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OidcValidator {
    client: reqwest::Client,
    issuer: IssuerConfig,
    jwks_cache: Arc<DashMap<String, CachedJwks>>,
    discovery_cache: Arc<DashMap<String, CachedDiscovery>>,
    jwks_ttl: Duration,
    discovery_ttl: Duration,
    clock_skew_seconds: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum OidcError {
    #[error("missing issuer")]
    MissingIssuer,
    #[error("issuer not allowed")]
    IssuerNotAllowed,
    #[error("missing key id")]
    MissingKeyId,
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,
    #[error("invalid jwk: {0}")]
    InvalidJwk(String),
    #[error("jwks key not found")]
    JwksKeyNotFound,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("invalid claim: {0}")]
    InvalidClaim(String),
}

#[derive(Debug, Clone)]
struct CachedJwks {
    jwks: JwkSet,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
struct CachedDiscovery {
    jwks_url: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    jwks_uri: String,
}

impl OidcValidator {
    pub fn new(
        issuer: IssuerConfig,
        jwks_ttl: Duration,
        discovery_ttl: Duration,
        clock_skew_seconds: u64,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            issuer,
            jwks_cache: Arc::new(DashMap::new()),
            discovery_cache: Arc::new(DashMap::new()),
            jwks_ttl,
            discovery_ttl,
            clock_skew_seconds,
        }
    }

    pub fn issuer(&self) -> &IssuerConfig {
        &self.issuer
    }

    /// Verify `token` and return its claims.
    ///
    /// # Errors
    /// - `OidcError::UnsupportedAlgorithm` for anything but RS256/ES256.
    /// - `OidcError::IssuerNotAllowed` when `iss` is not the configured issuer.
    /// - `OidcError::JwksKeyNotFound` when `kid` is unknown even after refresh.
    /// - `OidcError::Jwt` for signature, expiry or audience failures.
    /// - `OidcError::Http` when discovery or JWKS cannot be fetched.
    pub async fn validate(&self, token: &str) -> Result<Value, OidcError> {
        let header = decode_header(token)?;
        if !is_algorithm_allowed(header.alg) {
            return Err(OidcError::UnsupportedAlgorithm);
        }
        let kid = header.kid.as_deref().ok_or(OidcError::MissingKeyId)?;

        // Unverified claims are only used to reject foreign issuers early.
        let unsafe_claims = decode_unverified_claims(token)?;
        let issuer = unsafe_claims
            .get("iss")
            .and_then(Value::as_str)
            .ok_or(OidcError::MissingIssuer)?;
        if issuer != self.issuer.issuer {
            return Err(OidcError::IssuerNotAllowed);
        }

        let jwks_url = self.resolve_jwks_url().await?;
        let jwks = self.get_jwks(&jwks_url).await?;
        let decoding_key = match find_jwk(&jwks, kid) {
            Some(key) => {
                ensure_jwk_matches_algorithm(key, header.alg)?;
                DecodingKey::from_jwk(key)?
            }
            None => {
                let refreshed = self.refresh_jwks(&jwks_url).await?;
                let key = find_jwk(&refreshed, kid).ok_or(OidcError::JwksKeyNotFound)?;
                ensure_jwk_matches_algorithm(key, header.alg)?;
                DecodingKey::from_jwk(key)?
            }
        };

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[self.issuer.issuer.as_str()]);
        validation.set_audience(&[self.issuer.audience.as_str()]);
        validation
            .required_spec_claims
            .extend(["iss".to_string(), "aud".to_string()]);
        validation.leeway = self.clock_skew_seconds;

        let token = decode::<Value>(token, &decoding_key, &validation)?;
        validate_iat(&token.claims, self.clock_skew_seconds)?;
        Ok(token.claims)
    }

    async fn resolve_jwks_url(&self) -> Result<String, OidcError> {
        if let Some(url) = &self.issuer.jwks_url {
            return Ok(url.clone());
        }
        let discovery_url = format!(
            "{}/.well-known/openid-configuration",
            self.issuer.issuer.trim_end_matches('/')
        );
        if let Some(entry) = self.discovery_cache.get(&discovery_url)
            && entry.expires_at > Instant::now()
        {
            return Ok(entry.jwks_url.clone());
        }

        let doc: DiscoveryDocument = self
            .client
            .get(&discovery_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        self.discovery_cache.insert(
            discovery_url,
            CachedDiscovery {
                jwks_url: doc.jwks_uri.clone(),
                expires_at: Instant::now() + self.discovery_ttl,
            },
        );
        Ok(doc.jwks_uri)
    }

    async fn get_jwks(&self, jwks_url: &str) -> Result<JwkSet, OidcError> {
        if let Some(entry) = self.jwks_cache.get(jwks_url)
            && entry.expires_at > Instant::now()
        {
            return Ok(entry.jwks.clone());
        }
        self.refresh_jwks(jwks_url).await
    }

    async fn refresh_jwks(&self, jwks_url: &str) -> Result<JwkSet, OidcError> {
        tracing::debug!(jwks_url, "fetching jwks");
        let jwks: JwkSet = self
            .client
            .get(jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        self.jwks_cache.insert(
            jwks_url.to_string(),
            CachedJwks {
                jwks: jwks.clone(),
                expires_at: Instant::now() + self.jwks_ttl,
            },
        );
        Ok(jwks)
    }
}

fn is_algorithm_allowed(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::RS256 | Algorithm::ES256)
}

fn ensure_jwk_matches_algorithm(jwk: &Jwk, alg: Algorithm) -> Result<(), OidcError> {
    // Providers may omit `alg` on the key; the key type still has to match.
    if let Some(key_alg) = jwk.common.key_algorithm {
        match (key_alg, alg) {
            (KeyAlgorithm::RS256, Algorithm::RS256) => {}
            (KeyAlgorithm::ES256, Algorithm::ES256) => {}
            _ => return Err(OidcError::InvalidJwk("alg mismatch".to_string())),
        }
    }
    match (&jwk.algorithm, alg) {
        (AlgorithmParameters::RSA(_), Algorithm::RS256) => Ok(()),
        (AlgorithmParameters::EllipticCurve(params), Algorithm::ES256) => {
            if params.curve != EllipticCurve::P256 {
                return Err(OidcError::InvalidJwk("unexpected EC curve".to_string()));
            }
            Ok(())
        }
        _ => Err(OidcError::InvalidJwk("kty mismatch".to_string())),
    }
}

fn find_jwk<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|key| key.common.key_id.as_deref() == Some(kid))
}

fn decode_unverified_claims(token: &str) -> Result<Value, OidcError> {
    let mut parts = token.split('.');
    let _header = parts.next();
    let payload = parts
        .next()
        .ok_or_else(|| OidcError::InvalidClaim("token format".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| OidcError::InvalidClaim("token payload".to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| OidcError::InvalidClaim(format!("token payload: {err}")))
}

fn validate_iat(claims: &Value, leeway_seconds: u64) -> Result<(), OidcError> {
    let iat = claims
        .get("iat")
        .and_then(Value::as_i64)
        .ok_or_else(|| OidcError::InvalidClaim("iat".to_string()))?;
    let now = Utc::now().timestamp();
    if iat > now + leeway_seconds as i64 {
        return Err(OidcError::InvalidClaim("iat in future".to_string()));
    }
    Ok(())
}
