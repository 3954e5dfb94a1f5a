//! Shared map feeds, one per distinct filter set.
//!
//! # Purpose
//! Map requests with identical criteria read from the same polling feed
//! instead of each hitting the remote API. Feeds start on first use and are
//! shut down after sitting idle for the configured TTL.
//!
//! # Notes
//! The registry never holds a map shard lock across an await point; handles
//! are cloned out before waiting on a feed.
//!
//! Criteria come straight from query strings, so the number of live feeds is
//! capped. Starting a feed at the cap stops the least recently used one.
use chrono::Utc;
use dashmap::DashMap;
use metamapa_common::FilterCriteria;
use metamapa_map::{FactSource, FeedConfig, MapFeed, MapView};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

struct FeedEntry {
    feed: Arc<MapFeed>,
    last_access: Instant,
}

#[derive(Clone)]
pub struct FeedRegistry {
    source: Arc<dyn FactSource>,
    config: FeedConfig,
    first_wait: Duration,
    idle_ttl: Duration,
    max_feeds: usize,
    feeds: Arc<DashMap<FilterCriteria, FeedEntry>>,
}

impl FeedRegistry {
    pub fn new(
        source: Arc<dyn FactSource>,
        config: FeedConfig,
        first_wait: Duration,
        idle_ttl: Duration,
        max_feeds: usize,
    ) -> Self {
        Self {
            source,
            config,
            first_wait,
            idle_ttl,
            max_feeds: max_feeds.max(1),
            feeds: Arc::new(DashMap::new()),
        }
    }

    /// Current map view for `criteria`, starting a feed if none exists.
    ///
    /// A fresh feed is given `first_wait` to complete its first cycle; after
    /// that the (possibly empty) snapshot is served as is.
    pub async fn view(&self, criteria: FilterCriteria) -> MapView {
        let feed = self.feed_for(criteria);
        let mut snapshot = feed.snapshot();
        if snapshot.completed_cycles == 0 {
            match feed.wait_first_cycle(self.first_wait).await {
                Ok(first) => snapshot = first,
                Err(err) => {
                    tracing::warn!(error = %err, "serving map before first fetch completed");
                    snapshot = feed.snapshot();
                }
            }
        }
        MapView::from_snapshot(&snapshot, Utc::now())
    }

    fn feed_for(&self, criteria: FilterCriteria) -> Arc<MapFeed> {
        let now = Instant::now();
        if let Some(mut entry) = self.feeds.get_mut(&criteria) {
            entry.last_access = now;
            return Arc::clone(&entry.feed);
        }
        self.make_room();
        let mut entry = self.feeds.entry(criteria.clone()).or_insert_with(|| {
            tracing::info!(criteria = ?criteria, "starting map feed");
            metrics::counter!("metamapa_map_feeds_started_total").increment(1);
            FeedEntry {
                feed: Arc::new(MapFeed::spawn(
                    Arc::clone(&self.source),
                    criteria,
                    self.config.clone(),
                )),
                last_access: now,
            }
        });
        entry.last_access = now;
        Arc::clone(&entry.feed)
    }

    /// Stop least recently used feeds until one more fits under the cap.
    fn make_room(&self) {
        while self.feeds.len() >= self.max_feeds {
            // The iterator's shard guards drop before `remove` locks again.
            let oldest = self
                .feeds
                .iter()
                .min_by_key(|entry| entry.last_access)
                .map(|entry| entry.key().clone());
            let Some(criteria) = oldest else { break };
            if let Some((criteria, entry)) = self.feeds.remove(&criteria) {
                tracing::info!(criteria = ?criteria, max_feeds = self.max_feeds, "stopping least recently used map feed");
                metrics::counter!("metamapa_map_feeds_evicted_total", "reason" => "capacity")
                    .increment(1);
                entry.feed.shutdown();
            }
        }
    }

    /// Ask every running feed to fetch now.
    pub fn refresh_all(&self) {
        for entry in self.feeds.iter() {
            entry.feed.refresh();
        }
    }

    /// Shut down feeds idle for longer than the TTL. Returns how many were
    /// removed.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let before = self.feeds.len();
        self.feeds.retain(|criteria, entry| {
            let idle = now.saturating_duration_since(entry.last_access);
            if idle < self.idle_ttl {
                return true;
            }
            tracing::info!(criteria = ?criteria, idle_secs = idle.as_secs(), "stopping idle map feed");
            metrics::counter!("metamapa_map_feeds_evicted_total", "reason" => "idle").increment(1);
            entry.feed.shutdown();
            false
        });
        before.saturating_sub(self.feeds.len())
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn shutdown_all(&self) {
        for entry in self.feeds.iter() {
            entry.feed.shutdown();
        }
        self.feeds.clear();
    }

    /// Periodically evict idle feeds until `cancel` fires.
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let registry = self.clone();
        let period = (self.idle_ttl / 2).max(MIN_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = registry.evict_idle();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = registry.len(), "swept map feeds");
                        }
                    }
                }
            }
            registry.shutdown_all();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use metamapa_common::Fact;
    use metamapa_map::MapResult;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl FixedSource {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
            })
        }
    }

    #[async_trait]
    impl FactSource for FixedSource {
        async fn fetch_facts(&self, criteria: &FilterCriteria) -> MapResult<Vec<Fact>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let title = criteria.categoria.clone().unwrap_or_default();
            Ok(serde_json::from_value(json!([
                { "id": 1, "titulo": title, "latitud": -34.6, "longitud": -58.4 }
            ]))
            .expect("facts"))
        }
    }

    fn criteria(categoria: &str) -> FilterCriteria {
        FilterCriteria {
            categoria: Some(categoria.to_string()),
            ..FilterCriteria::default()
        }
    }

    fn registry(source: Arc<FixedSource>, idle_ttl: Duration) -> FeedRegistry {
        FeedRegistry::new(
            source,
            FeedConfig::default(),
            Duration::from_secs(2),
            idle_ttl,
            16,
        )
    }

    #[tokio::test]
    async fn identical_criteria_share_one_feed() {
        let source = FixedSource::new(Duration::ZERO);
        let registry = registry(Arc::clone(&source), Duration::from_secs(60));

        let first = registry.view(criteria("incendio")).await;
        let second = registry.view(criteria("incendio")).await;
        assert_eq!(first.visible, 1);
        assert_eq!(second.visible, 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        registry.view(criteria("inundacion")).await;
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn slow_first_fetch_serves_empty_view() {
        let source = FixedSource::new(Duration::from_secs(5));
        let registry = FeedRegistry::new(
            source,
            FeedConfig::default(),
            Duration::from_millis(20),
            Duration::from_secs(60),
            16,
        );
        let view = registry.view(FilterCriteria::default()).await;
        assert_eq!(view.visible, 0);
        assert_eq!(view.last_updated_label, "-");
    }

    #[tokio::test]
    async fn feed_count_is_capped_by_evicting_least_recently_used() {
        let source = FixedSource::new(Duration::ZERO);
        let registry = FeedRegistry::new(
            source,
            FeedConfig::default(),
            Duration::from_secs(2),
            Duration::from_secs(60),
            2,
        );

        registry.view(criteria("incendio")).await;
        registry.view(criteria("inundacion")).await;
        let evicted = registry.feed_for(criteria("incendio"));
        // Touch the newer feed so the older one is the eviction candidate.
        tokio::time::sleep(Duration::from_millis(5)).await;
        registry.view(criteria("inundacion")).await;

        for categoria in ["sequia", "granizo", "tornado"] {
            registry.view(criteria(categoria)).await;
            assert!(registry.len() <= 2);
        }
        assert_eq!(registry.len(), 2);
        assert!(evicted.is_closed());
        assert!(!registry.feeds.contains_key(&criteria("incendio")));
        assert!(registry.feeds.contains_key(&criteria("tornado")));
    }

    #[tokio::test]
    async fn idle_feeds_are_evicted() {
        let source = FixedSource::new(Duration::ZERO);
        let registry = registry(source, Duration::from_millis(10));
        registry.view(criteria("incendio")).await;
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(registry.evict_idle(), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn sweeper_stops_on_cancel_and_clears_feeds() {
        let source = FixedSource::new(Duration::ZERO);
        let registry = registry(source, Duration::from_secs(60));
        registry.view(criteria("incendio")).await;

        let cancel = CancellationToken::new();
        let sweeper = registry.spawn_sweeper(cancel.clone());
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), sweeper)
            .await
            .expect("sweeper stops")
            .expect("join");
        assert!(registry.is_empty());
    }
}
