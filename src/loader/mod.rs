//! Request-scoped batch loading
//!
//! A [`BatchLoader`] solves the N+1 problem for a single GraphQL request.
//! Resolvers call [`BatchLoader::load`] for whatever key they need; the
//! loader collects every key requested during the current scheduling turn,
//! deduplicates them and hands them to its [`BatchFetch`] in one call.
//!
//! # Lifecycle
//!
//! 1. **Collecting** - `load(key)` parks the caller on a oneshot channel.
//!    The first key of a window spawns a dispatch task.
//! 2. **Dispatching** - the task yields (or sleeps for the configured delay),
//!    drains the queued keys and calls `fetch` exactly once.
//! 3. **Settled** - results are written to the request cache and every
//!    parked caller is woken. The loader is collecting again.
//!
//! Keys that are already in flight are joined rather than queued again, so a
//! key is fetched at most once per request as long as its fetch succeeds.
//! Failed fetches are not cached.
//!
//! Loaders are created per request (see [`RequestLoaders`]) and must never
//! be stored in the schema, where they would leak data between requests.

mod fetchers;
mod request;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::ExplorerError;

pub use fetchers::{
    BlockFetch, DepositTotalFetch, ExpectedReturnFetch, ParticipationFetch, ProposalFetch,
    ReactionFetch, ReactionsByTargetFetch, RelativeProposalCountFetch, TallyFetch,
    ValidatorByAccountFetch, ValidatorFetch,
};
pub use request::{NodeLoader, RequestLoaders};

/// Keyed fetch capability supplied by the data-access layer.
///
/// Implementations should return an entry for every key they can find.
/// Keys missing from the returned map are settled as "not found".
#[async_trait]
pub trait BatchFetch: Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;

    /// Label used in log lines and error messages
    fn name(&self) -> &str;

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, Self::Value>>;
}

#[async_trait]
impl<T: BatchFetch + ?Sized> BatchFetch for Arc<T> {
    type Value = T::Value;

    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, Self::Value>> {
        (**self).fetch(keys).await
    }
}

type Outcome<V> = Result<Option<V>, ExplorerError>;

struct LoaderState<V> {
    /// Settled results; `None` records a key the store does not have
    cache: HashMap<String, Option<V>>,
    /// Parked callers for every queued or in-flight key
    waiting: HashMap<String, Vec<oneshot::Sender<Outcome<V>>>>,
    /// Distinct keys collected in the current window, in request order
    queued: Vec<String>,
    dispatch_scheduled: bool,
}

struct LoaderInner<F: BatchFetch> {
    fetcher: F,
    delay: Duration,
    state: Mutex<LoaderState<F::Value>>,
}

/// Deduplicating, caching batch loader over a [`BatchFetch`].
///
/// Cloning is cheap and clones share the same cache.
pub struct BatchLoader<F: BatchFetch> {
    inner: Arc<LoaderInner<F>>,
}

impl<F: BatchFetch> Clone for BatchLoader<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: BatchFetch> BatchLoader<F> {
    /// Create a loader that dispatches as soon as the current turn yields
    pub fn new(fetcher: F) -> Self {
        Self::with_delay(fetcher, Duration::ZERO)
    }

    /// Create a loader that waits `delay` after the first key of a window
    /// before dispatching, to widen batches under a multi-threaded runtime.
    pub fn with_delay(fetcher: F, delay: Duration) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                fetcher,
                delay,
                state: Mutex::new(LoaderState {
                    cache: HashMap::new(),
                    waiting: HashMap::new(),
                    queued: Vec::new(),
                    dispatch_scheduled: false,
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.fetcher.name()
    }

    /// Load one key. `Ok(None)` means the store has no such key.
    pub async fn load(&self, key: impl Into<String>) -> Result<Option<F::Value>, ExplorerError> {
        let key = key.into();
        let rx = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;

            if let Some(hit) = state.cache.get(&key) {
                return Ok(hit.clone());
            }

            let (tx, rx) = oneshot::channel();
            match state.waiting.entry(key) {
                Entry::Occupied(mut waiters) => waiters.get_mut().push(tx),
                Entry::Vacant(slot) => {
                    state.queued.push(slot.key().clone());
                    slot.insert(vec![tx]);
                }
            }

            if !state.dispatch_scheduled {
                state.dispatch_scheduled = true;
                let inner = Arc::clone(&self.inner);
                tokio::spawn(inner.dispatch());
            }
            rx
        };

        rx.await.unwrap_or_else(|_| {
            Err(ExplorerError::batch_fetch(
                self.name(),
                anyhow::anyhow!("batch dispatch dropped before settling"),
            ))
        })
    }
}

impl<F: BatchFetch> LoaderInner<F> {
    async fn dispatch(self: Arc<Self>) {
        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }

        let keys = {
            let mut state = self.state.lock();
            state.dispatch_scheduled = false;
            std::mem::take(&mut state.queued)
        };
        if keys.is_empty() {
            return;
        }

        tracing::debug!(
            entity = self.fetcher.name(),
            key_count = keys.len(),
            "Dispatching batch load"
        );

        let result = match AssertUnwindSafe(self.fetcher.fetch(&keys)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("batch fetch panicked")),
        };

        let mut state = self.state.lock();
        match result {
            Ok(mut found) => {
                for key in keys {
                    let value = found.remove(&key);
                    let settled = state.cache.entry(key.clone()).or_insert(value).clone();
                    for tx in state.waiting.remove(&key).unwrap_or_default() {
                        let _ = tx.send(Ok(settled.clone()));
                    }
                }
                if !found.is_empty() {
                    tracing::warn!(
                        entity = self.fetcher.name(),
                        extra = found.len(),
                        "Batch fetch returned keys that were not requested"
                    );
                }
            }
            Err(e) => {
                tracing::error!(
                    entity = self.fetcher.name(),
                    key_count = keys.len(),
                    error = %e,
                    "Batch load failed"
                );
                let failure = ExplorerError::batch_fetch(self.fetcher.name(), e);
                for key in keys {
                    for tx in state.waiting.remove(&key).unwrap_or_default() {
                        let _ = tx.send(Err(failure.clone()));
                    }
                }
            }
        }
    }
}
