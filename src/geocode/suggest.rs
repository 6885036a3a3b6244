//! # Suggestion Engine
//!
//! Resolves autocomplete suggestions in the background while the user types.
//!
//! ```text
//! notify("par")   ─▶ gen 1 ─▶ sleep(debounce) ─▶ superseded, exits
//! notify("pari")  ─▶ gen 2 ─▶ sleep(debounce) ─▶ superseded, exits
//! notify("paris") ─▶ gen 3 ─▶ sleep(debounce) ─▶ suggest() ─▶ commit
//! ```
//!
//! Every call to [`SuggestionEngine::notify_text_changed`] takes the next
//! generation number and spawns one worker. Workers are never cancelled.
//! A worker skips its network call if a newer generation was scheduled
//! during its debounce, and its commit is refused if a newer generation has
//! already been committed. The last scheduled query therefore wins no matter
//! in which order the network calls return.
//!
//! The committed [`SuggestionSet`] sits behind a mutex that is held only for
//! the copy in or out, so the render loop never waits on the network.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, warn};
use tokio::runtime::Handle;

use crate::geocode::Geocoder;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

/// Ranked place names tagged with the query and generation that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionSet {
    query: String,
    generation: u64,
    names: Vec<String>,
}

impl SuggestionSet {
    pub fn new(query: impl Into<String>, generation: u64, names: Vec<String>) -> Self {
        Self {
            query: query.into(),
            generation,
            names,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Most relevant first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

struct Shared {
    /// Highest generation handed out by `notify_text_changed`.
    scheduled: AtomicU64,
    committed: Mutex<SuggestionSet>,
}

impl Shared {
    fn committed(&self) -> MutexGuard<'_, SuggestionSet> {
        self.committed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.scheduled.load(Ordering::SeqCst) == generation
    }

    /// Replaces the snapshot unless a newer generation is already committed.
    fn commit(&self, set: SuggestionSet) -> bool {
        let mut committed = self.committed();
        if set.generation < committed.generation {
            debug!(
                "Discarding suggestions for {:?} (gen {} < committed gen {})",
                set.query, set.generation, committed.generation
            );
            return false;
        }
        debug!(
            "Committing {} suggestions for {:?} (gen {})",
            set.names.len(),
            set.query,
            set.generation
        );
        *committed = set;
        true
    }
}

pub struct SuggestionEngine {
    shared: Arc<Shared>,
    geocoder: Arc<dyn Geocoder>,
    runtime: Handle,
    debounce: Duration,
    limit: usize,
}

impl SuggestionEngine {
    /// Workers are spawned onto `runtime`, so the engine can be driven from a
    /// plain synchronous loop.
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        runtime: Handle,
        debounce: Duration,
        limit: usize,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                scheduled: AtomicU64::new(0),
                committed: Mutex::new(SuggestionSet::default()),
            }),
            geocoder,
            runtime,
            debounce,
            limit,
        }
    }

    /// Records `text` as the pending search and schedules a worker for it.
    /// Returns the generation assigned to the request. Never blocks.
    pub fn notify_text_changed(&self, text: &str) -> u64 {
        let generation = self.shared.scheduled.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Scheduling suggestions for {:?} (gen {})", text, generation);

        let shared = Arc::clone(&self.shared);
        let geocoder = Arc::clone(&self.geocoder);
        let query = text.to_string();
        let debounce = self.debounce;
        let limit = self.limit;

        self.runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            if !shared.is_current(generation) {
                debug!("Suggestion worker for {:?} superseded (gen {})", query, generation);
                return;
            }

            let names = if query.trim().is_empty() {
                Vec::new()
            } else {
                match geocoder.suggest(&query, limit).await {
                    Ok(names) => names,
                    Err(e) => {
                        warn!("Suggestions for {:?} failed: {}", query, e);
                        Vec::new()
                    }
                }
            };

            shared.commit(SuggestionSet {
                query,
                generation,
                names,
            });
        });

        generation
    }

    /// Copy of the most recently committed snapshot.
    pub fn current_suggestions(&self) -> SuggestionSet {
        self.shared.committed().clone()
    }

    /// Generation of the committed snapshot; cheap enough to poll every tick.
    pub fn committed_generation(&self) -> u64 {
        self.shared.committed().generation
    }

    /// Number of requests scheduled so far.
    pub fn scheduled(&self) -> u64 {
        self.shared.scheduled.load(Ordering::SeqCst)
    }

    /// Empties the snapshot and orphans every in-flight worker.
    pub fn clear(&self) {
        let generation = self.shared.scheduled.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.commit(SuggestionSet {
            query: String::new(),
            generation,
            names: Vec::new(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StaticGeocoder, wait_until};
    use tokio::runtime::Runtime;

    fn engine(rt: &Runtime, geocoder: Arc<StaticGeocoder>, debounce: Duration) -> SuggestionEngine {
        SuggestionEngine::new(geocoder, rt.handle().clone(), debounce, DEFAULT_SUGGESTION_LIMIT)
    }

    #[test]
    fn test_rapid_typing_settles_on_last_query() {
        let rt = Runtime::new().unwrap();
        let geocoder = Arc::new(
            StaticGeocoder::empty()
                .with_suggestions("par", &["Parma"])
                .with_suggestions("pari", &["Parish"])
                .with_suggestions("paris", &["Paris, France", "Paris, Texas"]),
        );
        let engine = engine(&rt, geocoder.clone(), Duration::from_millis(50));

        engine.notify_text_changed("par");
        engine.notify_text_changed("pari");
        let last = engine.notify_text_changed("paris");

        assert!(wait_until(Duration::from_secs(2), || engine.committed_generation() == last));
        let set = engine.current_suggestions();
        assert_eq!(set.query(), "paris");
        assert_eq!(set.names(), ["Paris, France", "Paris, Texas"]);

        // The two superseded workers never reached the network.
        assert_eq!(geocoder.suggest_queries(), ["paris"]);
    }

    #[test]
    fn test_stale_worker_finishing_last_does_not_overwrite() {
        // A worker that passed its debounce check but returns after a newer
        // query was committed is dropped. Comparing query text alone would
        // let "lon" overwrite "london" here.
        let rt = Runtime::new().unwrap();
        let geocoder = Arc::new(
            StaticGeocoder::empty()
                .with_suggestions("lon", &["Lonavala"])
                .with_delay("lon", Duration::from_millis(300))
                .with_suggestions("london", &["London, England"]),
        );
        let engine = engine(&rt, geocoder.clone(), Duration::ZERO);

        engine.notify_text_changed("lon");
        assert!(wait_until(Duration::from_secs(2), || geocoder.suggest_queries().len() == 1));
        let newest = engine.notify_text_changed("london");

        assert!(wait_until(Duration::from_secs(2), || engine.committed_generation() == newest));
        std::thread::sleep(Duration::from_millis(500));

        let set = engine.current_suggestions();
        assert_eq!(set.query(), "london");
        assert_eq!(set.names(), ["London, England"]);
        assert_eq!(geocoder.suggest_queries(), ["lon", "london"]);
    }

    #[test]
    fn test_network_failure_commits_empty_set() {
        let rt = Runtime::new().unwrap();
        let engine = engine(&rt, Arc::new(StaticGeocoder::failing()), Duration::ZERO);

        let generation = engine.notify_text_changed("berlin");
        assert!(wait_until(Duration::from_secs(2), || engine.committed_generation() == generation));
        let set = engine.current_suggestions();
        assert_eq!(set.query(), "berlin");
        assert!(set.is_empty());
    }

    #[test]
    fn test_blank_query_skips_geocoder() {
        let rt = Runtime::new().unwrap();
        let geocoder = Arc::new(StaticGeocoder::empty());
        let engine = engine(&rt, geocoder.clone(), Duration::ZERO);

        let generation = engine.notify_text_changed("");
        assert!(wait_until(Duration::from_secs(2), || engine.committed_generation() == generation));
        assert!(geocoder.suggest_queries().is_empty());
    }

    #[test]
    fn test_clear_orphans_in_flight_workers() {
        let rt = Runtime::new().unwrap();
        let geocoder = Arc::new(
            StaticGeocoder::empty()
                .with_suggestions("rome", &["Rome, Italy"])
                .with_delay("rome", Duration::from_millis(200)),
        );
        let engine = engine(&rt, geocoder.clone(), Duration::ZERO);

        engine.notify_text_changed("rome");
        assert!(wait_until(Duration::from_secs(2), || geocoder.suggest_queries().len() == 1));
        engine.clear();
        std::thread::sleep(Duration::from_millis(400));

        let set = engine.current_suggestions();
        assert!(set.is_empty());
        assert_eq!(set.generation(), engine.scheduled());
    }

    #[test]
    fn test_initial_snapshot_is_empty() {
        let rt = Runtime::new().unwrap();
        let engine = engine(&rt, Arc::new(StaticGeocoder::empty()), DEFAULT_DEBOUNCE);
        assert_eq!(engine.current_suggestions(), SuggestionSet::default());
        assert_eq!(engine.scheduled(), 0);
    }
}
