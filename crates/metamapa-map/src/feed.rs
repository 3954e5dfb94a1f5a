//! Polling map feed.
//!
//! # Purpose
//! Keeps the fact list for one filter set fresh: fetch on start, on every
//! criteria change, on demand, and on a fixed interval.
//!
//! # Concurrency model
//! One task owns the interval and the criteria receiver. Each fetch runs in
//! its own spawned task and reports back over a channel tagged with a
//! sequence number, so a slow timer fetch may overlap a criteria fetch. The
//! [`SequenceGuard`] settles that race: only results newer than the last
//! applied one are published, and nothing fetched for superseded criteria
//! is published at all.
//!
//! # Cancellation
//! Dropping the [`MapFeed`] (or calling [`MapFeed::shutdown`]) cancels the
//! interval and every in-flight fetch.
use crate::{FactSource, MapError, MapResult, place};
use chrono::{DateTime, Utc};
use metamapa_common::{Fact, FilterCriteria};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub refresh_interval: Duration,
}

impl FeedConfig {
    /// Interval the feed actually ticks at. A zero interval would spin the
    /// poller, so it falls back to [`DEFAULT_REFRESH_INTERVAL`].
    pub fn effective_interval(&self) -> Duration {
        if self.refresh_interval.is_zero() {
            tracing::warn!(
                fallback_secs = DEFAULT_REFRESH_INTERVAL.as_secs(),
                "zero map refresh interval; using default"
            );
            return DEFAULT_REFRESH_INTERVAL;
        }
        self.refresh_interval
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// Latest published state of a feed.
#[derive(Debug, Clone, Default)]
pub struct MapSnapshot {
    pub facts: Arc<Vec<Fact>>,
    /// Wall-clock time of the last applied success.
    pub last_updated: Option<DateTime<Utc>>,
    pub applied_seq: u64,
    pub last_error: Option<String>,
    /// Fetch results handled so far, successes and failures alike.
    pub completed_cycles: u64,
}

/// Monotonic fetch tagging.
///
/// Only successes advance the applied watermark. A failure newer than the
/// watermark is still reported, but it does not block a slower success for
/// the same criteria. A criteria change raises a floor: anything issued
/// before it is stale, whether or not the newer fetch succeeded.
#[derive(Debug, Default)]
pub struct SequenceGuard {
    issued: u64,
    applied: u64,
    floor: u64,
}

impl SequenceGuard {
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    pub fn is_stale(&self, seq: u64) -> bool {
        seq <= self.applied || seq < self.floor
    }

    /// `seq` is the first fetch for new criteria; older results are dropped.
    pub fn supersede_before(&mut self, seq: u64) {
        self.floor = self.floor.max(seq);
    }

    /// Mark `seq` applied; returns `false` if it is stale.
    pub fn accept(&mut self, seq: u64) -> bool {
        if self.is_stale(seq) {
            return false;
        }
        self.applied = seq;
        true
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }
}

/// Handle to a running feed.
pub struct MapFeed {
    criteria: watch::Sender<FilterCriteria>,
    snapshots: watch::Receiver<MapSnapshot>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
}

impl MapFeed {
    /// Start polling `source`. Must be called within a tokio runtime.
    pub fn spawn(source: Arc<dyn FactSource>, criteria: FilterCriteria, config: FeedConfig) -> Self {
        let (criteria_tx, criteria_rx) = watch::channel(criteria);
        let (snapshot_tx, snapshot_rx) = watch::channel(MapSnapshot::default());
        let refresh = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let task = FeedTask {
            source,
            criteria: criteria_rx,
            snapshots: snapshot_tx,
            refresh: Arc::clone(&refresh),
            cancel: cancel.clone(),
            interval: config.effective_interval(),
        };
        tokio::spawn(task.run());

        Self {
            criteria: criteria_tx,
            snapshots: snapshot_rx,
            refresh,
            cancel,
        }
    }

    pub fn snapshot(&self) -> MapSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MapSnapshot> {
        self.snapshots.clone()
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.criteria.borrow().clone()
    }

    /// Replace the criteria; an actual change triggers an immediate fetch.
    pub fn set_criteria(&self, criteria: FilterCriteria) {
        self.criteria.send_if_modified(|current| {
            if *current == criteria {
                return false;
            }
            *current = criteria;
            true
        });
    }

    /// Request a fetch outside the interval.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Wait until the feed has handled at least one fetch result.
    pub async fn wait_first_cycle(&self, timeout: Duration) -> MapResult<MapSnapshot> {
        let mut snapshots = self.snapshots.clone();
        let waited =
            tokio::time::timeout(timeout, snapshots.wait_for(|s| s.completed_cycles > 0)).await;
        match waited {
            Ok(Ok(snapshot)) => Ok(snapshot.clone()),
            Ok(Err(_)) => Err(MapError::FeedClosed),
            Err(_) => Err(MapError::FirstFetchTimeout),
        }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.snapshots.has_changed().is_err()
    }
}

impl Drop for MapFeed {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

type FetchResult = (u64, MapResult<Vec<Fact>>);

struct FeedTask {
    source: Arc<dyn FactSource>,
    criteria: watch::Receiver<FilterCriteria>,
    snapshots: watch::Sender<MapSnapshot>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
    interval: Duration,
}

impl FeedTask {
    async fn run(mut self) {
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<FetchResult>();
        let mut sequence = SequenceGuard::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut fetched: Option<FilterCriteria> = None;

        loop {
            let trigger = tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => "interval",
                changed = self.criteria.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    ticker.reset();
                    "criteria"
                }
                _ = self.refresh.notified() => "refresh",
                Some((seq, result)) = result_rx.recv() => {
                    self.apply(&mut sequence, seq, result);
                    continue;
                }
            };

            let seq = sequence.issue();
            let criteria = self.criteria.borrow_and_update().clone();
            // Any trigger may be the first to observe new criteria.
            if fetched.as_ref().is_some_and(|previous| *previous != criteria) {
                sequence.supersede_before(seq);
            }
            fetched = Some(criteria.clone());
            tracing::debug!(seq, trigger, "map fetch started");
            self.spawn_fetch(seq, criteria, result_tx.clone());
        }
        tracing::debug!("map feed stopped");
    }

    fn spawn_fetch(
        &self,
        seq: u64,
        criteria: FilterCriteria,
        results: mpsc::UnboundedSender<FetchResult>,
    ) {
        let source = Arc::clone(&self.source);
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = source.fetch_facts(&criteria) => {
                    let _ = results.send((seq, result));
                }
            }
        });
    }

    fn apply(&self, sequence: &mut SequenceGuard, seq: u64, result: MapResult<Vec<Fact>>) {
        if sequence.is_stale(seq) {
            metrics::counter!("metamapa_map_fetch_total", "outcome" => "stale").increment(1);
            tracing::debug!(seq, applied = sequence.applied(), "dropping stale map fetch result");
            return;
        }
        match result {
            Ok(facts) => {
                sequence.accept(seq);
                metrics::counter!("metamapa_map_fetch_total", "outcome" => "ok").increment(1);
                tracing::debug!(seq, facts = facts.len(), "map facts updated");
                let defaulted = defaulted_labels(&facts);
                if !defaulted.is_empty() {
                    tracing::warn!(
                        count = defaulted.len(),
                        facts = ?defaulted,
                        "facts without valid coordinates drawn at default position"
                    );
                }
                self.snapshots.send_modify(|snapshot| {
                    snapshot.facts = Arc::new(facts);
                    snapshot.last_updated = Some(Utc::now());
                    snapshot.applied_seq = seq;
                    snapshot.last_error = None;
                    snapshot.completed_cycles += 1;
                });
            }
            Err(err) => {
                metrics::counter!("metamapa_map_fetch_total", "outcome" => "error").increment(1);
                tracing::warn!(error = %err, seq, "map fact fetch failed; keeping previous facts");
                self.snapshots.send_modify(|snapshot| {
                    snapshot.last_error = Some(err.to_string());
                    snapshot.completed_cycles += 1;
                });
            }
        }
    }
}

/// Labels of the facts that fall back to the default position.
fn defaulted_labels(facts: &[Fact]) -> Vec<String> {
    facts
        .iter()
        .filter(|fact| place(fact).defaulted)
        .map(Fact::label)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    const LONG: Duration = Duration::from_secs(3600);
    const WAIT: Duration = Duration::from_secs(5);

    enum Step {
        Ready(MapResult<Vec<Fact>>),
        Gated(oneshot::Receiver<MapResult<Vec<Fact>>>),
    }

    #[derive(Default)]
    struct ScriptedSource {
        steps: Mutex<VecDeque<Step>>,
        calls: Mutex<Vec<FilterCriteria>>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                calls: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl FactSource for ScriptedSource {
        async fn fetch_facts(&self, criteria: &FilterCriteria) -> MapResult<Vec<Fact>> {
            self.calls.lock().expect("calls").push(criteria.clone());
            let step = self.steps.lock().expect("steps").pop_front();
            match step {
                Some(Step::Ready(result)) => result,
                Some(Step::Gated(rx)) => rx.await.unwrap_or(Err(MapError::FeedClosed)),
                None => std::future::pending().await,
            }
        }
    }

    struct CountingSource(AtomicUsize);

    #[async_trait]
    impl FactSource for CountingSource {
        async fn fetch_facts(&self, _criteria: &FilterCriteria) -> MapResult<Vec<Fact>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn facts(ids: &[u32]) -> Vec<Fact> {
        ids.iter()
            .map(|id| serde_json::from_value(json!({ "id": id })).expect("fact"))
            .collect()
    }

    fn ids(snapshot: &MapSnapshot) -> Vec<String> {
        snapshot
            .facts
            .iter()
            .filter_map(|fact| fact.id.as_ref().map(|id| id.to_string()))
            .collect()
    }

    fn config(refresh_interval: Duration) -> FeedConfig {
        FeedConfig { refresh_interval }
    }

    fn failure() -> MapResult<Vec<Fact>> {
        Err(MapError::source_error(std::io::Error::other("connection refused")))
    }

    async fn wait_until(feed: &MapFeed, predicate: impl FnMut(&MapSnapshot) -> bool) -> MapSnapshot {
        let mut rx = feed.subscribe();
        let snapshot = tokio::time::timeout(WAIT, rx.wait_for(predicate))
            .await
            .expect("timeout")
            .expect("feed alive")
            .clone();
        snapshot
    }

    #[test]
    fn sequence_guard_drops_older_results() {
        let mut guard = SequenceGuard::default();
        let first = guard.issue();
        let second = guard.issue();
        assert!(guard.accept(second));
        assert!(!guard.accept(first));
        assert!(guard.is_stale(second));
        assert_eq!(guard.applied(), second);
        let next = guard.issue();
        assert!(guard.accept(next));
    }

    #[test]
    fn sequence_guard_floor_drops_superseded_criteria() {
        let mut guard = SequenceGuard::default();
        let old_criteria = guard.issue();
        let new_criteria = guard.issue();
        guard.supersede_before(new_criteria);
        // Nothing applied yet, but the old fetch is still stale.
        assert!(guard.is_stale(old_criteria));
        assert!(!guard.accept(old_criteria));
        assert_eq!(guard.applied(), 0);
        assert!(guard.accept(new_criteria));

        // Lowering the floor is ignored.
        guard.supersede_before(1);
        let next = guard.issue();
        assert!(!guard.is_stale(next));
    }

    #[test]
    fn zero_interval_falls_back_to_default() {
        assert_eq!(config(Duration::ZERO).effective_interval(), DEFAULT_REFRESH_INTERVAL);
        assert_eq!(
            config(Duration::from_secs(5)).effective_interval(),
            Duration::from_secs(5)
        );
    }

    #[tokio::test]
    async fn zero_interval_feed_polls_once() {
        let source = Arc::new(CountingSource(AtomicUsize::new(0)));
        let feed = MapFeed::spawn(source.clone(), FilterCriteria::default(), config(Duration::ZERO));
        feed.wait_first_cycle(WAIT).await.expect("first cycle");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn defaulted_labels_name_facts_without_coordinates() {
        let facts: Vec<Fact> = [
            json!({ "id": 1, "titulo": "Con ubicación", "latitud": -31.4, "longitud": -64.2 }),
            json!({ "id": 2, "titulo": "Sin ubicación" }),
        ]
        .into_iter()
        .map(|value| serde_json::from_value(value).expect("fact"))
        .collect();
        let labels = defaulted_labels(&facts);
        assert_eq!(labels, vec![facts[1].label()]);
    }

    #[tokio::test]
    async fn first_cycle_publishes_facts() {
        let source = ScriptedSource::new(vec![Step::Ready(Ok(facts(&[1, 2])))]);
        let feed = MapFeed::spawn(source.clone(), FilterCriteria::default(), config(LONG));

        let snapshot = feed.wait_first_cycle(WAIT).await.expect("first cycle");
        assert_eq!(ids(&snapshot), vec!["1", "2"]);
        assert!(snapshot.last_updated.is_some());
        assert_eq!(snapshot.applied_seq, 1);
        assert_eq!(source.calls.lock().expect("calls").len(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_previous_facts() {
        let source = ScriptedSource::new(vec![Step::Ready(Ok(facts(&[1, 2]))), Step::Ready(failure())]);
        let feed = MapFeed::spawn(source, FilterCriteria::default(), config(LONG));
        let first = feed.wait_first_cycle(WAIT).await.expect("first cycle");

        feed.refresh();
        let snapshot = wait_until(&feed, |s| s.completed_cycles >= 2).await;
        assert_eq!(ids(&snapshot), vec!["1", "2"]);
        assert_eq!(snapshot.last_updated, first.last_updated);
        assert!(snapshot.last_error.is_some());
    }

    #[tokio::test]
    async fn first_cycle_failure_still_completes() {
        let source = ScriptedSource::new(vec![Step::Ready(failure())]);
        let feed = MapFeed::spawn(source, FilterCriteria::default(), config(LONG));
        let snapshot = feed.wait_first_cycle(WAIT).await.expect("first cycle");
        assert!(snapshot.facts.is_empty());
        assert_eq!(snapshot.last_updated, None);
    }

    #[tokio::test]
    async fn stale_response_does_not_overwrite_fresher_one() {
        let (slow_tx, slow_rx) = oneshot::channel();
        let source = ScriptedSource::new(vec![
            Step::Gated(slow_rx),
            Step::Ready(Ok(facts(&[3]))),
        ]);
        let feed = MapFeed::spawn(source.clone(), FilterCriteria::default(), config(LONG));

        let curated = FilterCriteria {
            categoria: Some("incendio".to_string()),
            ..FilterCriteria::default()
        };
        // Wait for the initial fetch to be in flight before changing criteria.
        tokio::time::timeout(WAIT, async {
            while source.calls.lock().expect("calls").is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("initial fetch");
        feed.set_criteria(curated.clone());

        let fresh = wait_until(&feed, |s| s.applied_seq == 2).await;
        assert_eq!(ids(&fresh), vec!["3"]);

        slow_tx.send(Ok(facts(&[1, 2]))).expect("deliver slow result");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snapshot = feed.snapshot();
        assert_eq!(ids(&snapshot), vec!["3"]);
        assert_eq!(snapshot.applied_seq, 2);
        assert_eq!(source.calls.lock().expect("calls")[1], curated);
    }

    #[tokio::test]
    async fn old_criteria_result_is_dropped_after_new_criteria_fail() {
        let (slow_tx, slow_rx) = oneshot::channel();
        let source = ScriptedSource::new(vec![Step::Gated(slow_rx), Step::Ready(failure())]);
        let feed = MapFeed::spawn(source.clone(), FilterCriteria::default(), config(LONG));

        tokio::time::timeout(WAIT, async {
            while source.calls.lock().expect("calls").is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("initial fetch");
        feed.set_criteria(FilterCriteria {
            categoria: Some("incendio".to_string()),
            ..FilterCriteria::default()
        });

        let failed = wait_until(&feed, |s| s.last_error.is_some()).await;
        assert!(failed.facts.is_empty());

        slow_tx.send(Ok(facts(&[1, 2]))).expect("deliver slow result");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snapshot = feed.snapshot();
        assert!(snapshot.facts.is_empty());
        assert_eq!(snapshot.applied_seq, 0);
        assert!(snapshot.last_error.is_some());
    }

    #[tokio::test]
    async fn unchanged_criteria_do_not_refetch() {
        let source = ScriptedSource::new(vec![Step::Ready(Ok(facts(&[1])))]);
        let feed = MapFeed::spawn(source.clone(), FilterCriteria::default(), config(LONG));
        feed.wait_first_cycle(WAIT).await.expect("first cycle");

        feed.set_criteria(FilterCriteria::default());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.calls.lock().expect("calls").len(), 1);
    }

    #[tokio::test]
    async fn dropping_the_feed_stops_polling() {
        let source = Arc::new(CountingSource(AtomicUsize::new(0)));
        let feed = MapFeed::spawn(
            source.clone(),
            FilterCriteria::default(),
            config(Duration::from_millis(10)),
        );
        wait_until(&feed, |s| s.completed_cycles >= 2).await;
        drop(feed);

        tokio::time::sleep(Duration::from_millis(30)).await;
        let after_drop = source.0.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(source.0.load(Ordering::SeqCst), after_drop);
    }

    #[tokio::test]
    async fn wait_first_cycle_times_out() {
        let source = ScriptedSource::new(Vec::new());
        let feed = MapFeed::spawn(source, FilterCriteria::default(), config(LONG));
        let err = feed
            .wait_first_cycle(Duration::from_millis(20))
            .await
            .expect_err("no result");
        assert!(matches!(err, MapError::FirstFetchTimeout));
    }
}
