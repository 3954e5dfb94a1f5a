// Typed calls against the remote fact and import endpoints.
use crate::{ADMIN_HEADER, CONTRIBUTOR_HEADER, ClientConfig, ClientError, ClientResult};
use async_trait::async_trait;
use metamapa_common::{Attachment, Fact, FilterCriteria, ImportReport, ImportRun, NewFact};
use metamapa_map::{FactSource, MapError, MapResult};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;

const FACTS_PATH: &str = "/interna/hechos";
const IMPORT_PATH: &str = "/admin/importar-dataset";
const IMPORTS_PATH: &str = "/admin/importaciones";
const CSV_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|err| ClientError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: err.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                endpoint: "client setup",
                source,
            })?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET /interna/hechos` with the criteria as query parameters.
    pub async fn list_facts(&self, criteria: &FilterCriteria) -> ClientResult<Vec<Fact>> {
        let endpoint = "list facts";
        let response = self
            .http
            .get(self.url(FACTS_PATH))
            .query(&criteria.query_pairs())
            .send()
            .await
            .map_err(|source| ClientError::Transport { endpoint, source })?;
        // A null body is an empty list.
        let facts: Option<Vec<Fact>> = read_json(endpoint, response).await?;
        Ok(facts.unwrap_or_default())
    }

    /// `POST /interna/hechos` as multipart: the `hecho` descriptor plus one
    /// `archivos` part per image or video attachment.
    pub async fn create_fact(
        &self,
        contributor_id: &str,
        fact: &NewFact,
        attachments: Vec<Attachment>,
    ) -> ClientResult<Option<Fact>> {
        let endpoint = "create fact";
        let descriptor = serde_json::to_string(fact)?;
        let mut form = Form::new().part(
            "hecho",
            Part::text(descriptor)
                .mime_str("application/json")
                .map_err(|source| ClientError::Transport { endpoint, source })?,
        );
        for attachment in attachments {
            if !attachment.is_media() {
                tracing::warn!(
                    file = %attachment.file_name,
                    content_type = %attachment.content_type,
                    "dropping attachment that is not an image or video"
                );
                continue;
            }
            form = form.part("archivos", file_part(endpoint, attachment)?);
        }

        let response = self
            .http
            .post(self.url(FACTS_PATH))
            .header(CONTRIBUTOR_HEADER, contributor_id)
            .multipart(form)
            .send()
            .await
            .map_err(|source| ClientError::Transport { endpoint, source })?;
        let created: Option<Value> = read_json(endpoint, response).await?;
        // The created record is informational; tolerate shapes we cannot map.
        Ok(created.and_then(|value| serde_json::from_value(value).ok()))
    }

    /// `POST /admin/importar-dataset` with the CSV as the `file` part.
    pub async fn import_dataset(&self, admin_id: &str, file: Attachment) -> ClientResult<ImportReport> {
        let endpoint = "import dataset";
        let file = if file.content_type.trim().is_empty() {
            Attachment {
                content_type: CSV_CONTENT_TYPE.to_string(),
                ..file
            }
        } else {
            file
        };
        let form = Form::new().part("file", file_part(endpoint, file)?);
        let response = self
            .http
            .post(self.url(IMPORT_PATH))
            .header(ADMIN_HEADER, admin_id)
            .multipart(form)
            .send()
            .await
            .map_err(|source| ClientError::Transport { endpoint, source })?;
        let report: Option<ImportReport> = read_json(endpoint, response).await?;
        report.ok_or_else(|| ClientError::Decode {
            endpoint,
            reason: "empty body".to_string(),
        })
    }

    /// `GET /admin/importaciones`.
    pub async fn list_imports(&self) -> ClientResult<Vec<ImportRun>> {
        let endpoint = "list imports";
        let response = self
            .http
            .get(self.url(IMPORTS_PATH))
            .send()
            .await
            .map_err(|source| ClientError::Transport { endpoint, source })?;
        let runs: Option<Vec<ImportRun>> = read_json(endpoint, response).await?;
        Ok(runs.unwrap_or_default())
    }
}

#[async_trait]
impl FactSource for ApiClient {
    async fn fetch_facts(&self, criteria: &FilterCriteria) -> MapResult<Vec<Fact>> {
        self.list_facts(criteria).await.map_err(MapError::source_error)
    }
}

fn file_part(endpoint: &'static str, attachment: Attachment) -> ClientResult<Part> {
    Part::bytes(attachment.bytes)
        .file_name(attachment.file_name)
        .mime_str(&attachment.content_type)
        .map_err(|source| ClientError::Transport { endpoint, source })
}

/// Decode a JSON body, mapping non-success statuses to [`ClientError::Status`].
/// Empty bodies decode as `None`.
async fn read_json<T: DeserializeOwned>(
    endpoint: &'static str,
    response: reqwest::Response,
) -> ClientResult<Option<T>> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| ClientError::Transport { endpoint, source })?;
    if !status.is_success() {
        return Err(ClientError::Status {
            endpoint,
            status: status.as_u16(),
            message: error_message(&body, status),
        });
    }
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&body).map_err(|err| ClientError::Decode {
        endpoint,
        reason: err.to_string(),
    })
}

/// The API reports failures as `{"error": ...}`, `{"message": ...}` or
/// plain text.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message", "mensaje"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }
    let text = body.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text.to_string()
    }
}
