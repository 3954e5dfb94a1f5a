use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("fact source failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("map feed stopped")]
    FeedClosed,
    #[error("timed out waiting for the first fact fetch")]
    FirstFetchTimeout,
}

impl MapError {
    pub fn source_error(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Source(Box::new(err))
    }
}

pub type MapResult<T> = Result<T, MapError>;
