//! Time-boxed, single-flight response cache.
//!
//! One [`ResponseCache`] holds the last good payload of one upstream integration.
//! A refresh is registered under the same lock that observed the entry as stale,
//! so concurrent callers either join the registered refresh or see its result.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::{sync::oneshot, time::Instant};

use crate::core::ApiError;

/// Which cache branch produced a response. Sent to clients as `X-Cache-Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// Served from a fresh entry without touching the upstream.
    Hit,
    /// This caller ran the refresh and it succeeded.
    Miss,
    /// The refresh failed; the previous entry was served.
    Stale,
    /// Joined a refresh started by another caller.
    Deduped,
    /// The refresh failed and nothing was cached; a default payload was served.
    Fallback,
}

impl CacheStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Stale => "STALE",
            CacheStatus::Deduped => "DEDUPED",
            CacheStatus::Fallback => "FALLBACK",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The answer of one cache lookup.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub data: Arc<T>,
    pub status: CacheStatus,
    /// Why the refresh failed, for `Stale` and `Fallback`.
    pub error: Option<Arc<ApiError>>,
}

type Outcome<T> = Result<Arc<T>, Arc<ApiError>>;
type Pending<T> = Shared<BoxFuture<'static, Outcome<T>>>;

struct CacheEntry<T> {
    data: Arc<T>,
    fetched_at: Instant,
    invalidated: bool,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        !self.invalidated && now.saturating_duration_since(self.fetched_at) < ttl
    }
}

struct Slot<T> {
    entry: Option<CacheEntry<T>>,
    pending: Option<Pending<T>>,
}

/// Process-wide cache for one integration's payload.
///
/// Create it once and share it (it is `Clone`; clones share state).
pub struct ResponseCache<T> {
    name: &'static str,
    ttl: Duration,
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for ResponseCache<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            ttl: self.ttl,
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> fmt::Debug for ResponseCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("ResponseCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("cached", &slot.entry.is_some())
            .field("refreshing", &slot.pending.is_some())
            .finish()
    }
}

impl<T> ResponseCache<T>
where
    T: Default + Send + Sync + 'static,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            slot: Arc::new(Mutex::new(Slot {
                entry: None,
                pending: None,
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached payload, fresh or not, without triggering a refresh.
    pub fn peek(&self) -> Option<Arc<T>> {
        self.slot.lock().entry.as_ref().map(|e| Arc::clone(&e.data))
    }

    /// Whether a refresh is currently registered.
    pub fn is_refreshing(&self) -> bool {
        self.slot.lock().pending.is_some()
    }

    /// Force the next lookup to refresh. The current payload stays available as a fallback.
    pub fn invalidate(&self) {
        if let Some(entry) = self.slot.lock().entry.as_mut() {
            entry.invalidated = true;
        }
    }

    /// Serve the cached payload, refreshing it through `fetch` when stale.
    ///
    /// `fetch` receives the previous payload (if any) so it can degrade per field.
    /// It is only invoked by the caller that registers the refresh; everyone
    /// arriving while it runs awaits the same result.
    pub async fn get_with<F, Fut>(&self, fetch: F) -> Cached<T>
    where
        F: FnOnce(Option<Arc<T>>) -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let (pending, leader) = {
            let mut slot = self.slot.lock();
            if let Some(entry) = &slot.entry {
                if entry.is_fresh(self.ttl, Instant::now()) {
                    tracing::debug!(cache = self.name, "cache hit");
                    return Cached {
                        data: Arc::clone(&entry.data),
                        status: CacheStatus::Hit,
                        error: None,
                    };
                }
            }
            match &slot.pending {
                Some(pending) => (pending.clone(), None),
                None => {
                    let previous = slot.entry.as_ref().map(|e| Arc::clone(&e.data));
                    // build the refresh before registering it so a panicking `fetch` leaves no pending
                    let fut = fetch(previous);
                    let (tx, rx) = oneshot::channel::<Outcome<T>>();
                    let pending: Pending<T> = rx
                        .map(|r| {
                            r.unwrap_or_else(|_| {
                                Err(Arc::new(ApiError::Data("refresh task aborted".into())))
                            })
                        })
                        .boxed()
                        .shared();
                    slot.pending = Some(pending.clone());
                    (pending, Some((fut, tx)))
                }
            }
        };

        let is_leader = leader.is_some();
        if let Some((fut, tx)) = leader {
            tracing::debug!(cache = self.name, "cache stale, starting refresh");
            self.spawn_refresh(fut, tx);
        } else {
            tracing::debug!(cache = self.name, "joining in-flight refresh");
        }

        match pending.await {
            Ok(data) => Cached {
                data,
                status: if is_leader {
                    CacheStatus::Miss
                } else {
                    CacheStatus::Deduped
                },
                error: None,
            },
            Err(error) => match self.peek() {
                Some(data) => {
                    tracing::warn!(cache = self.name, %error, "refresh failed, serving stale payload");
                    Cached {
                        data,
                        status: CacheStatus::Stale,
                        error: Some(error),
                    }
                }
                None => {
                    tracing::error!(cache = self.name, %error, "refresh failed with nothing cached");
                    Cached {
                        data: Arc::new(T::default()),
                        status: CacheStatus::Fallback,
                        error: Some(error),
                    }
                }
            },
        }
    }

    /// Run the refresh detached from the caller so it settles even if every waiter goes away.
    fn spawn_refresh<Fut>(&self, fut: Fut, tx: oneshot::Sender<Outcome<T>>)
    where
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let name = self.name;
        let mut settle = Settle {
            slot: Arc::clone(&self.slot),
            data: None,
        };
        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = fut.await.map(Arc::new).map_err(Arc::new);
            match &outcome {
                Ok(data) => {
                    tracing::info!(cache = name, elapsed_ms = started.elapsed().as_millis() as u64, "refresh succeeded");
                    settle.data = Some(Arc::clone(data));
                }
                Err(error) => {
                    tracing::warn!(cache = name, %error, "refresh failed");
                }
            }
            // entry and pending must change together, before any waiter wakes
            drop(settle);
            let _ = tx.send(outcome);
        });
    }
}

/// Publishes a refresh result into the slot and clears the pending marker.
/// Runs on drop so a panicking refresh still frees the slot.
struct Settle<T> {
    slot: Arc<Mutex<Slot<T>>>,
    data: Option<Arc<T>>,
}

impl<T> Drop for Settle<T> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        if let Some(data) = self.data.take() {
            slot.entry = Some(CacheEntry {
                data,
                fetched_at: Instant::now(),
                invalidated: false,
            });
        }
        slot.pending = None;
    }
}
