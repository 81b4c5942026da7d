use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use aniweek_anilist::{FetchError, ScheduleSource};
use aniweek_config::ScheduleConfig;
use aniweek_models::AiringEntry;

use crate::week;

type WeekResult = Result<Arc<Vec<AiringEntry>>, FetchError>;

/// A resolved week: the key it was fetched under plus the shared entries.
#[derive(Debug, Clone)]
pub struct WeekEntries {
    pub week_start: i64,
    pub entries: Arc<Vec<AiringEntry>>,
}

enum WeekSlot {
    Pending(PendingFetch),
    Resolved(Arc<Vec<AiringEntry>>),
}

struct PendingFetch {
    generation: u64,
    cancel: CancellationToken,
    notify: broadcast::Sender<WeekResult>,
}

struct Inner {
    source: Arc<dyn ScheduleSource>,
    tz: Tz,
    week_range: i32,
    prefetch: bool,
    prefetch_delay: Duration,
    state: Mutex<HashMap<i64, WeekSlot>>,
    generation: AtomicU64,
}

/// Session-scoped week cache and request coordinator.
///
/// Each week key is either absent, pending (one in-flight fetch that every
/// concurrent caller joins), or resolved. A failed fetch empties its slot so
/// the next call retries; a superseded fetch is cancelled and can never write
/// its result. Cloning shares the same cache.
#[derive(Clone)]
pub struct WeekCache {
    inner: Arc<Inner>,
}

impl WeekCache {
    pub fn new(source: Arc<dyn ScheduleSource>, tz: Tz, config: &ScheduleConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                tz,
                week_range: config.week_range,
                prefetch: config.prefetch,
                prefetch_delay: Duration::from_millis(config.prefetch_delay_ms),
                state: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn tz(&self) -> Tz {
        self.inner.tz
    }

    pub fn week_range(&self) -> i32 {
        self.inner.week_range
    }

    /// Week key for an offset, computed against the current instant.
    pub fn week_start_for(&self, offset: i32) -> i64 {
        week::week_start(Utc::now(), offset, self.inner.tz)
    }

    /// Entries for a week, fetching only when the key is absent. Concurrent
    /// callers for the same key share a single in-flight fetch.
    pub async fn get_week(&self, offset: i32) -> Result<WeekEntries, FetchError> {
        let week_start = self.week_start_for(offset);
        let entries = self.get_week_by_start(week_start).await?;
        self.spawn_prefetch(offset);
        Ok(WeekEntries {
            week_start,
            entries,
        })
    }

    /// Force a fresh fetch for a week. Any in-flight fetch for the same key
    /// is cancelled first and its result discarded, so only the newer fetch
    /// can populate the cache.
    pub async fn refresh_week(&self, offset: i32) -> Result<WeekEntries, FetchError> {
        let week_start = self.week_start_for(offset);

        let mut rx = {
            let mut state = self.inner.state.lock().await;
            match state.remove(&week_start) {
                Some(WeekSlot::Pending(pending)) => {
                    debug!("Superseding in-flight fetch for week {}", week_start);
                    pending.cancel.cancel();
                }
                Some(WeekSlot::Resolved(_)) => {
                    debug!("Evicting resolved week {} for refresh", week_start);
                }
                None => {}
            }
            self.start_fetch(&mut state, week_start)
        };

        let entries = recv_result(&mut rx).await?;
        self.spawn_prefetch(offset);
        Ok(WeekEntries {
            week_start,
            entries,
        })
    }

    /// Cancel everything in flight and drop all cached weeks.
    pub async fn reset(&self) {
        let mut state = self.inner.state.lock().await;
        for slot in state.values() {
            if let WeekSlot::Pending(pending) = slot {
                pending.cancel.cancel();
            }
        }
        let cleared = state.len();
        state.clear();
        info!("Cleared week cache ({} slots)", cleared);
    }

    /// Number of weeks currently resolved.
    pub async fn cached_weeks(&self) -> usize {
        let state = self.inner.state.lock().await;
        state
            .values()
            .filter(|slot| matches!(slot, WeekSlot::Resolved(_)))
            .count()
    }

    async fn get_week_by_start(&self, week_start: i64) -> WeekResult {
        let mut rx = {
            let mut state = self.inner.state.lock().await;
            match state.get(&week_start) {
                Some(WeekSlot::Resolved(entries)) => {
                    debug!("Cache hit for week {}", week_start);
                    return Ok(Arc::clone(entries));
                }
                Some(WeekSlot::Pending(pending)) => {
                    debug!("Joining in-flight fetch for week {}", week_start);
                    pending.notify.subscribe()
                }
                None => {
                    debug!("Cache miss for week {}", week_start);
                    self.start_fetch(&mut state, week_start)
                }
            }
        };

        recv_result(&mut rx).await
    }

    /// Insert a pending slot and spawn its fetch task. Must run under the
    /// state lock so no second fetch can start for the same key.
    fn start_fetch(
        &self,
        state: &mut HashMap<i64, WeekSlot>,
        week_start: i64,
    ) -> broadcast::Receiver<WeekResult> {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (notify, rx) = broadcast::channel(1);

        state.insert(
            week_start,
            WeekSlot::Pending(PendingFetch {
                generation,
                cancel: cancel.clone(),
                notify: notify.clone(),
            }),
        );

        let cache = self.clone();
        tokio::spawn(async move {
            let result = fetch_week_entries(cache.inner.source.as_ref(), week_start, &cancel)
                .await
                .map(Arc::new);
            cache.complete(week_start, generation, result, notify).await;
        });

        rx
    }

    /// Write a finished fetch back, unless the slot was superseded or reset
    /// while it ran. Waiters on this fetch are notified either way.
    async fn complete(
        &self,
        week_start: i64,
        generation: u64,
        result: WeekResult,
        notify: broadcast::Sender<WeekResult>,
    ) {
        {
            let mut state = self.inner.state.lock().await;
            let current = matches!(
                state.get(&week_start),
                Some(WeekSlot::Pending(p)) if p.generation == generation
            );
            if current {
                match &result {
                    Ok(entries) => {
                        debug!(
                            "Week {} resolved with {} entries",
                            week_start,
                            entries.len()
                        );
                        state.insert(week_start, WeekSlot::Resolved(Arc::clone(entries)));
                    }
                    Err(e) => {
                        warn!("Week {} fetch failed: {}", week_start, e);
                        state.remove(&week_start);
                    }
                }
            } else {
                debug!("Discarding superseded result for week {}", week_start);
            }
        }
        let _ = notify.send(result);
    }

    /// Warm the two adjacent weeks after a successful load. Runs detached on
    /// a delay so it never competes with the request that triggered it, and
    /// failures are swallowed.
    fn spawn_prefetch(&self, offset: i32) {
        if !self.inner.prefetch {
            return;
        }
        for adjacent in [offset - 1, offset + 1] {
            if adjacent < -self.inner.week_range || adjacent > self.inner.week_range {
                continue;
            }
            let cache = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(cache.inner.prefetch_delay).await;
                let week_start = cache.week_start_for(adjacent);
                if cache.is_known(week_start).await {
                    return;
                }
                debug!("Prefetching week {} (offset {})", week_start, adjacent);
                if let Err(e) = cache.get_week_by_start(week_start).await {
                    if !e.is_cancelled() {
                        debug!("Prefetch for week {} failed: {}", week_start, e);
                    }
                }
            });
        }
    }

    async fn is_known(&self, week_start: i64) -> bool {
        let state = self.inner.state.lock().await;
        state.contains_key(&week_start)
    }
}

async fn recv_result(rx: &mut broadcast::Receiver<WeekResult>) -> WeekResult {
    match rx.recv().await {
        Ok(result) => result,
        // Sender dropped without completing; treat like a cancelled fetch
        Err(_) => Err(FetchError::Cancelled),
    }
}

/// The two sub-range fetches for one week, run concurrently and concatenated
/// in range order.
async fn fetch_week_entries(
    source: &dyn ScheduleSource,
    week_start: i64,
    cancel: &CancellationToken,
) -> Result<Vec<AiringEntry>, FetchError> {
    let [(first_from, first_to), (second_from, second_to)] = week::sub_ranges(week_start);
    let (mut first, second) = futures::future::try_join(
        source.fetch_airing_range(first_from, first_to, cancel),
        source.fetch_airing_range(second_from, second_to, cancel),
    )
    .await?;
    first.extend(second);
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use chrono_tz::America::New_York;

    use aniweek_models::{Media, MediaDetail, MediaTitle};

    /// In-memory source that tags every successful response with its call
    /// number, so tests can tell which fetch produced the cached data.
    struct ScriptedSource {
        calls: AtomicUsize,
        fail: AtomicBool,
        delay: Duration,
    }

    impl ScriptedSource {
        fn new(delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                delay: Duration::from_millis(delay_ms),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    fn call_entry(call: usize) -> AiringEntry {
        AiringEntry {
            airing_at: call as i64,
            episode: call as i32,
            media: Media {
                id: call as i32,
                title: Some(MediaTitle {
                    romaji: Some(format!("Call {}", call)),
                    english: None,
                    native: None,
                }),
                cover_image: None,
                average_score: None,
                trending: None,
                popularity: None,
            },
        }
    }

    #[async_trait]
    impl ScheduleSource for ScriptedSource {
        async fn fetch_airing_range(
            &self,
            _from: i64,
            _to: i64,
            cancel: &CancellationToken,
        ) -> Result<Vec<AiringEntry>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::select! {
                _ = cancel.cancelled() => Err(FetchError::Cancelled),
                _ = tokio::time::sleep(self.delay) => {
                    if self.fail.load(Ordering::SeqCst) {
                        Err(FetchError::Http { status: 500, message: "boom".into() })
                    } else {
                        Ok(vec![call_entry(call)])
                    }
                }
            }
        }

        async fn fetch_media(&self, id: i32) -> Result<MediaDetail, FetchError> {
            Err(FetchError::NotFound(id))
        }
    }

    fn test_config(prefetch: bool) -> ScheduleConfig {
        ScheduleConfig {
            timezone: "America/New_York".to_string(),
            week_range: 3,
            prefetch,
            prefetch_delay_ms: 10,
        }
    }

    fn make_cache(source: Arc<ScriptedSource>, prefetch: bool) -> WeekCache {
        WeekCache::new(source, New_York, &test_config(prefetch))
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch_pair() {
        let source = ScriptedSource::new(50);
        let cache = make_cache(Arc::clone(&source), false);

        let (a, b) = tokio::join!(cache.get_week(0), cache.get_week(0));
        let a = a.unwrap();
        let b = b.unwrap();

        // One pair of sub-range fetches, one shared buffer
        assert_eq!(source.calls(), 2);
        assert!(Arc::ptr_eq(&a.entries, &b.entries));
        assert_eq!(a.week_start, b.week_start);
    }

    #[tokio::test]
    async fn test_resolved_week_is_served_from_cache() {
        let source = ScriptedSource::new(1);
        let cache = make_cache(Arc::clone(&source), false);

        let first = cache.get_week(0).await.unwrap();
        let second = cache.get_week(0).await.unwrap();

        assert_eq!(source.calls(), 2);
        assert!(Arc::ptr_eq(&first.entries, &second.entries));
        assert_eq!(cache.cached_weeks().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_offsets_fetch_independently() {
        let source = ScriptedSource::new(1);
        let cache = make_cache(Arc::clone(&source), false);

        let this_week = cache.get_week(0).await.unwrap();
        let next_week = cache.get_week(1).await.unwrap();

        assert_eq!(source.calls(), 4);
        assert_eq!(
            next_week.week_start - this_week.week_start,
            week::SECONDS_PER_WEEK
        );
        assert_eq!(cache.cached_weeks().await, 2);
    }

    #[tokio::test]
    async fn test_refresh_supersedes_in_flight_fetch() {
        let source = ScriptedSource::new(200);
        let cache = make_cache(Arc::clone(&source), false);

        let stale = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_week(0).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        let fresh = cache.refresh_week(0).await.unwrap();
        let stale = stale.await.unwrap();

        // The superseded fetch surfaces as cancelled and never lands
        assert!(matches!(stale, Err(FetchError::Cancelled)));
        assert_eq!(source.calls(), 4);
        assert!(fresh.entries.iter().all(|e| e.episode >= 3));

        // The cache holds the fresh result
        let cached = cache.get_week(0).await.unwrap();
        assert!(Arc::ptr_eq(&cached.entries, &fresh.entries));
    }

    #[tokio::test]
    async fn test_refresh_evicts_resolved_week() {
        let source = ScriptedSource::new(1);
        let cache = make_cache(Arc::clone(&source), false);

        let first = cache.get_week(0).await.unwrap();
        let refreshed = cache.refresh_week(0).await.unwrap();

        assert_eq!(source.calls(), 4);
        assert!(!Arc::ptr_eq(&first.entries, &refreshed.entries));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_slot_empty_for_retry() {
        let source = ScriptedSource::new(1);
        let cache = make_cache(Arc::clone(&source), false);

        source.set_fail(true);
        let err = cache.get_week(0).await.unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 500, .. }));
        assert_eq!(cache.cached_weeks().await, 0);

        source.set_fail(false);
        let recovered = cache.get_week(0).await.unwrap();
        assert!(!recovered.entries.is_empty());
        assert_eq!(cache.cached_weeks().await, 1);
    }

    #[tokio::test]
    async fn test_prefetch_warms_adjacent_weeks_without_blocking() {
        let source = ScriptedSource::new(1);
        let cache = make_cache(Arc::clone(&source), true);

        cache.get_week(0).await.unwrap();
        // The foreground request finished on its own pair of fetches
        assert_eq!(source.calls(), 2);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.cached_weeks().await, 3);
        assert_eq!(source.calls(), 6);
    }

    #[tokio::test]
    async fn test_prefetch_respects_week_range_edge() {
        let source = ScriptedSource::new(1);
        let cache = make_cache(Arc::clone(&source), true);

        cache.get_week(3).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Offset 4 is out of range, so only offset 2 was warmed
        assert_eq!(cache.cached_weeks().await, 2);
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn test_prefetch_failures_are_silent() {
        let source = ScriptedSource::new(1);
        let cache = make_cache(Arc::clone(&source), true);

        let week = cache.get_week(0).await.unwrap();
        source.set_fail(true);
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Both prefetches failed quietly; the loaded week is untouched
        assert_eq!(cache.cached_weeks().await, 1);
        let again = cache.get_week(0).await.unwrap();
        assert!(Arc::ptr_eq(&week.entries, &again.entries));
    }

    #[tokio::test]
    async fn test_reset_cancels_and_clears() {
        let source = ScriptedSource::new(200);
        let cache = make_cache(Arc::clone(&source), false);

        let pending = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_week(0).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        cache.reset().await;
        let pending = pending.await.unwrap();
        assert!(matches!(pending, Err(FetchError::Cancelled)));
        assert_eq!(cache.cached_weeks().await, 0);

        // A later call starts from scratch
        let fresh = cache.get_week(0).await.unwrap();
        assert!(!fresh.entries.is_empty());
    }
}
