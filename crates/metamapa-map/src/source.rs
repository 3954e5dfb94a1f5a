use crate::MapResult;
use async_trait::async_trait;
use metamapa_common::{Fact, FilterCriteria};

/// Anything that can list facts for a filter set.
#[async_trait]
pub trait FactSource: Send + Sync + 'static {
    async fn fetch_facts(&self, criteria: &FilterCriteria) -> MapResult<Vec<Fact>>;
}
