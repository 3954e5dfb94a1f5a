// Login redirects to the identity provider's authorize endpoint.
use crate::config::OidcSettings;

const LOGIN_SCOPE: &str = "openid profile email";

#[derive(Debug, Clone)]
pub struct LoginRedirect {
    authorize_url: String,
    client_id: String,
    redirect_uri: String,
    audience: String,
}

impl LoginRedirect {
    pub fn from_settings(settings: &OidcSettings) -> Self {
        Self {
            authorize_url: settings.authorize_endpoint(),
            client_id: settings.client_id.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            audience: settings.audience.clone(),
        }
    }

    /// Authorization-code login URL; `state` carries the path to return to
    /// after the callback.
    pub fn url_for(&self, return_to: &str) -> String {
        let params = [
            ("response_type", "code"),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", LOGIN_SCOPE),
            ("audience", self.audience.as_str()),
            ("state", return_to),
        ];
        match reqwest::Url::parse_with_params(&self.authorize_url, &params) {
            Ok(url) => url.to_string(),
            Err(err) => {
                // Config is validated at startup; fall back to the bare endpoint.
                tracing::warn!(error = %err, url = %self.authorize_url, "invalid authorize url");
                self.authorize_url.clone()
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        reqwest::Url::parse(&self.authorize_url)
            .map(|_| ())
            .map_err(|err| anyhow::anyhow!("invalid authorize url {}: {err}", self.authorize_url))
    }
}
