pub mod entry;
pub use entry::CacheEntry;

pub mod error;
pub use error::{CacheError, CacheResult};

pub mod retention;
pub use retention::{PruneReport, RetentionPolicy, prune};

pub mod status;
pub use status::CacheStatus;

pub mod store;
pub use store::ArtifactStore;

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::generator::DumpGenerator;

type RefreshOutcome = CacheResult<CacheEntry>;
type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Default)]
struct CacheState {
    current: Option<CacheEntry>,
    in_flight: Option<InFlight>,
    last_error: Option<String>,
}

impl CacheState {
    fn is_stale(&self, ttl: Duration) -> bool {
        self.current
            .as_ref()
            .is_none_or(|entry| entry.is_stale(ttl, Utc::now()))
    }
}

enum Flight {
    Fresh(CacheEntry),
    Started(InFlight),
    Joined(InFlight),
}

struct Inner {
    state: Mutex<CacheState>,
    store: ArtifactStore,
    generator: Arc<dyn DumpGenerator>,
    retention: RetentionPolicy,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[tracing::instrument(skip(self), level = "info", name = "Refresh")]
    async fn run_refresh(self: Arc<Self>) -> RefreshOutcome {
        tracing::info!("Generating a new dump");

        let entry = match self.generator.generate(&self.store).await {
            Ok(entry) => entry,
            Err(e) => return self.fail_refresh(e),
        };

        {
            let mut state = self.lock_state();
            state.current = Some(entry.clone());
            state.last_error = None;
        }
        tracing::info!("Published {}", entry.file_name());

        // Runs after publication so the new entry is already protected.
        prune(&self.store, self.retention, Some(entry.path())).await;

        self.lock_state().in_flight = None;
        Ok(entry)
    }

    /// Record a refresh that did not publish anything and release the flight.
    fn fail_refresh(&self, err: CacheError) -> RefreshOutcome {
        tracing::error!("Dump refresh failed: {}", err);
        let mut state = self.lock_state();
        state.last_error = Some(err.to_string());
        state.in_flight = None;
        Err(err)
    }
}

/// Owns the pointer to the current dump and serializes regeneration.
///
/// At most one generation runs at a time. Callers that arrive while one is
/// running attach to it and receive its outcome instead of starting another.
/// The generation itself runs on its own task, so it finishes and updates the
/// state even when every waiting caller has gone away.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(
        store: ArtifactStore,
        generator: Arc<dyn DumpGenerator>,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(CacheState::default()),
                store,
                generator,
                retention,
            }),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.inner.store
    }

    pub fn current(&self) -> Option<CacheEntry> {
        self.inner.lock_state().current.clone()
    }

    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.inner.lock_state().is_stale(ttl)
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.lock_state().in_flight.is_some()
    }

    pub fn status(&self) -> CacheStatus {
        let state = self.inner.lock_state();
        let now = Utc::now();

        CacheStatus {
            has_entry: state.current.is_some(),
            created_at: state.current.as_ref().map(|entry| entry.created_at),
            age_seconds: state
                .current
                .as_ref()
                .map(|entry| entry.age(now).as_secs_f64()),
            refresh_in_progress: state.in_flight.is_some(),
            last_error: state.last_error.clone(),
        }
    }

    /// Return a dump no older than `ttl`, generating one if needed.
    ///
    /// Joins a running refresh rather than starting a second one; every
    /// caller attached to the same refresh sees the same outcome.
    pub async fn ensure_fresh(&self, ttl: Duration) -> RefreshOutcome {
        match self.start_or_join(ttl) {
            Flight::Fresh(entry) => Ok(entry),
            Flight::Started(in_flight) => in_flight.await,
            Flight::Joined(in_flight) => {
                tracing::debug!("Waiting on the refresh already in progress");
                in_flight.await
            }
        }
    }

    /// Start a background refresh if the cache is stale and none is running.
    /// Returns whether a refresh was started. Failures only reach the log
    /// and [`CacheStatus::last_error`].
    pub fn trigger_refresh(&self, ttl: Duration) -> bool {
        match self.start_or_join(ttl) {
            Flight::Started(_) => {
                tracing::debug!("Background refresh started");
                true
            }
            Flight::Fresh(_) | Flight::Joined(_) => false,
        }
    }

    /// Regenerate regardless of age, refusing if a refresh is already running.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        let in_flight = {
            let mut state = self.inner.lock_state();
            if state.in_flight.is_some() {
                return Err(CacheError::RefreshBusy);
            }
            self.launch(&mut state)
        };

        in_flight.await
    }

    /// Forget `entry` if it is still the current one. Used when its file
    /// turned out to be gone from the store.
    pub fn invalidate(&self, entry: &CacheEntry) -> bool {
        let mut state = self.inner.lock_state();
        if state.current.as_ref() != Some(entry) {
            return false;
        }

        tracing::warn!("Dropping {} from the cache, file is gone", entry.file_name());
        state.current = None;
        true
    }

    /// Publish the newest dump already in the store, e.g. after a restart.
    /// An entry published by a refresh in the meantime is never replaced by
    /// an older one.
    pub async fn recover(&self) -> CacheResult<Option<CacheEntry>> {
        let Some(latest) = self.inner.store.latest().await? else {
            tracing::info!("No existing dumps in {}", self.inner.store.dir().display());
            return Ok(None);
        };

        let mut state = self.inner.lock_state();
        let newer = state
            .current
            .as_ref()
            .is_none_or(|current| current.created_at < latest.created_at);
        if newer {
            tracing::info!("Recovered {} from the store", latest.file_name());
            state.current = Some(latest);
        }

        Ok(state.current.clone())
    }

    fn start_or_join(&self, ttl: Duration) -> Flight {
        let mut state = self.inner.lock_state();

        if let Some(in_flight) = &state.in_flight {
            return Flight::Joined(in_flight.clone());
        }

        if !state.is_stale(ttl) {
            if let Some(entry) = &state.current {
                return Flight::Fresh(entry.clone());
            }
        }

        Flight::Started(self.launch(&mut state))
    }

    /// Spawn the refresh task and register it as in flight. The caller holds
    /// the state lock, so no other refresh can be registered concurrently.
    /// A panic or cancellation anywhere in the task still releases the flight.
    fn launch(&self, state: &mut CacheState) -> InFlight {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            AssertUnwindSafe(Arc::clone(&inner).run_refresh())
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    inner.fail_refresh(CacheError::Aborted("refresh task panicked".into()))
                })
        });

        let inner = Arc::clone(&self.inner);
        let in_flight = async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => inner.fail_refresh(CacheError::Aborted(e.to_string())),
            }
        }
        .boxed()
        .shared();

        state.in_flight = Some(in_flight.clone());
        in_flight
    }
}
