// HTTP client for the MetaMapa fact and dataset-import API.
mod api;
mod config;
mod error;

pub use api::ApiClient;
pub use config::{ClientConfig, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT};
pub use error::{ClientError, ClientResult};

/// Header naming the contributor on fact creation.
pub const CONTRIBUTOR_HEADER: &str = "X-Contribuyente-Id";
/// Header naming the administrator on dataset imports.
pub const ADMIN_HEADER: &str = "X-Admin-Id";
