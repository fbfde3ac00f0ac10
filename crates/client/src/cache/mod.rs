//! Keyed cache of server state.
//!
//! Each entry moves through `Empty -> Loading -> Ready`, becomes `Stale` when
//! its resource is invalidated, and `Error` when a fetch fails. Concurrent
//! observers of a loading key share one fetch. Every fetch is tagged with a
//! cache-wide generation; a completion whose generation has been retired by an
//! invalidation (or by `clear`) is dropped instead of overwriting newer state.

mod key;
mod query;

use std::{
    any::Any,
    collections::{BTreeSet, HashMap},
    future::Future,
    sync::Arc,
    time::Duration,
};

use tokio::{
    sync::{Mutex, broadcast, mpsc},
    time::Instant,
};

pub use key::{Family, QueryKey, Resource};
pub use query::{Query, Refresher};

use crate::{
    config::CacheConfig,
    error::{ClientError, Result},
    inflight::InFlight,
};

type Erased = Arc<dyn Any + Send + Sync>;

const EVENT_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched (or dropped by `clear`).
    Empty,
    /// A fetch is running and there is no ready value to show meanwhile.
    Loading,
    Ready,
    /// Invalidated; the next observation refetches.
    Stale,
    /// The last fetch failed. The error is kept until a retry or invalidation.
    Error,
}

/// Something that happened to a cache entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheEvent {
    Fetched(QueryKey),
    Failed(QueryKey),
    Invalidated(QueryKey),
    /// A response arrived for a generation that had already been retired.
    Discarded(QueryKey),
}

/// Read-only view of one entry.
pub struct QuerySnapshot<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<ClientError>,
    /// `true` while any fetch runs, including background revalidation.
    pub is_fetching: bool,
    pub updated_at: Option<Instant>,
}

impl<T> QuerySnapshot<T> {
    fn empty() -> Self {
        Self {
            status: QueryStatus::Empty,
            data: None,
            error: None,
            is_fetching: false,
            updated_at: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }
}

impl<T> Clone for QuerySnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            updated_at: self.updated_at,
        }
    }
}

/// Handle notified each time its key is invalidated.
pub struct Subscription {
    key: QueryKey,
    rx: mpsc::UnboundedReceiver<()>,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Waits for the next invalidation. Returns `false` once the cache is gone.
    pub async fn invalidated(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

struct Entry {
    status: QueryStatus,
    value: Option<Erased>,
    error: Option<ClientError>,
    updated_at: Option<Instant>,
    last_access: Instant,
    /// Generation whose completion this entry still accepts.
    generation: u64,
    in_flight: Option<InFlight<Erased>>,
    /// The running operation grows the held value instead of replacing it.
    extending: bool,
}

impl Entry {
    fn new() -> Self {
        Self {
            status: QueryStatus::Empty,
            value: None,
            error: None,
            updated_at: None,
            last_access: Instant::now(),
            generation: 0,
            in_flight: None,
            extending: false,
        }
    }

    fn ready_value(&self) -> Option<Erased> {
        match self.status {
            QueryStatus::Ready => self.value.clone(),
            _ => None,
        }
    }

    fn is_stale(&self, stale_time: Duration) -> bool {
        self.updated_at
            .is_none_or(|updated_at| updated_at.elapsed() >= stale_time)
    }

    fn begin(&mut self, generation: u64, flight: InFlight<Erased>) {
        self.generation = generation;
        self.in_flight = Some(flight);
        self.extending = false;
    }

    fn begin_extend(&mut self, generation: u64, flight: InFlight<Erased>) {
        self.begin(generation, flight);
        self.extending = true;
    }

    fn retire(&mut self, generation: u64) {
        self.generation = generation;
        self.in_flight = None;
        self.extending = false;
        if self.value.is_some() || self.status == QueryStatus::Error {
            self.status = QueryStatus::Stale;
        }
    }

    fn observed_status(&self) -> QueryStatus {
        match (self.status, &self.in_flight) {
            (QueryStatus::Ready, _) => QueryStatus::Ready,
            (_, Some(_)) => QueryStatus::Loading,
            (status, None) => status,
        }
    }
}

#[derive(Default)]
struct State {
    entries: HashMap<QueryKey, Entry>,
    subscribers: HashMap<QueryKey, Vec<mpsc::UnboundedSender<()>>>,
    generation: u64,
    last_sweep: Option<Instant>,
}

impl State {
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Sweeps at most once per gc window; called on every observation.
    fn sweep_if_due(&mut self, gc_time: Duration) {
        if self
            .last_sweep
            .is_some_and(|swept_at| swept_at.elapsed() < gc_time)
        {
            return;
        }
        self.sweep(gc_time);
    }

    fn sweep(&mut self, gc_time: Duration) -> usize {
        self.last_sweep = Some(Instant::now());
        self.subscribers.retain(|_, senders| {
            senders.retain(|tx| !tx.is_closed());
            !senders.is_empty()
        });

        let before = self.entries.len();
        let subscribers = &self.subscribers;
        self.entries.retain(|key, entry| {
            entry.in_flight.is_some()
                || subscribers.contains_key(key)
                || entry.last_access.elapsed() < gc_time
        });
        let collected = before - self.entries.len();
        if collected > 0 {
            tracing::debug!(collected, "collected idle cache entries");
        }
        collected
    }
}

struct Inner {
    config: CacheConfig,
    state: Mutex<State>,
    events: broadcast::Sender<CacheEvent>,
}

enum Observed {
    Serve(Erased),
    Join(InFlight<Erased>),
    Fail(ClientError),
}

/// Shared query cache. Clones are handles to the same cache.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State::default()),
                events,
            }),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.inner.config
    }

    /// Stream of every entry change from now on.
    pub fn events(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Observes `key`.
    ///
    /// A fresh value is returned as is. A time-stale value is returned too,
    /// while `fetcher` refreshes it in the background. Empty and invalidated
    /// entries are fetched and the caller waits for the result. A failed
    /// entry returns its retained error without fetching; use
    /// [`QueryCache::refetch`] to retry.
    pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let stale_time = self.inner.config.stale_time;
        let observed = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            state.sweep_if_due(self.inner.config.gc_time);
            let entry = state.entries.entry(key.clone()).or_insert_with(Entry::new);
            entry.last_access = Instant::now();

            if let Some(flight) = entry.in_flight.clone() {
                entry.ready_value().map_or(Observed::Join(flight), Observed::Serve)
            } else if let Some(value) = entry.ready_value() {
                if entry.is_stale(stale_time) {
                    tracing::debug!(%key, "serving stale value while revalidating");
                    state.generation += 1;
                    let generation = state.generation;
                    entry.begin(generation, self.spawn_fetch(key.clone(), generation, fetcher()));
                }
                Observed::Serve(value)
            } else if let (QueryStatus::Error, Some(err)) = (entry.status, entry.error.clone()) {
                Observed::Fail(err)
            } else {
                state.generation += 1;
                let generation = state.generation;
                let flight = self.spawn_fetch(key.clone(), generation, fetcher());
                entry.begin(generation, flight.clone());
                Observed::Join(flight)
            }
        };

        let value = match observed {
            Observed::Serve(value) => value,
            Observed::Join(flight) => flight.wait().await?,
            Observed::Fail(err) => return Err(err),
        };
        downcast(key, value)
    }

    /// Fetches `key` again regardless of freshness, joining a fetch that is
    /// already running.
    pub async fn refetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let flight = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            state.sweep_if_due(self.inner.config.gc_time);
            let entry = state.entries.entry(key.clone()).or_insert_with(Entry::new);
            entry.last_access = Instant::now();

            match entry.in_flight.clone() {
                Some(flight) => flight,
                None => {
                    state.generation += 1;
                    let generation = state.generation;
                    let flight = self.spawn_fetch(key.clone(), generation, fetcher());
                    entry.begin(generation, flight.clone());
                    flight
                }
            }
        };
        downcast(key, flight.wait().await?)
    }

    /// Replaces the value of `key` with one derived from its current ready
    /// value (`None` when empty, stale or failed). Runs through the same
    /// in-flight slot as fetches: a call made while anything is in flight for
    /// `key` joins that operation instead of starting another.
    ///
    /// A failed extension keeps the held value ready and only records the
    /// error, so the next call extends the same value again.
    pub async fn extend<T, F, Fut>(&self, key: &QueryKey, extender: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(Option<Arc<T>>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let flight = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            state.sweep_if_due(self.inner.config.gc_time);
            let entry = state.entries.entry(key.clone()).or_insert_with(Entry::new);
            entry.last_access = Instant::now();

            match entry.in_flight.clone() {
                Some(flight) => flight,
                None => {
                    let current = entry
                        .ready_value()
                        .map(|value| downcast::<T>(key, value))
                        .transpose()?;
                    state.generation += 1;
                    let generation = state.generation;
                    let flight = self.spawn_fetch(key.clone(), generation, extender(current));
                    entry.begin_extend(generation, flight.clone());
                    flight
                }
            }
        };
        downcast(key, flight.wait().await?)
    }

    /// Marks every entry of `resource` stale and notifies their subscribers.
    /// Responses still in flight for those entries will be discarded.
    pub async fn invalidate(&self, resource: Resource) -> Vec<QueryKey> {
        let keys = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            let keys: BTreeSet<QueryKey> = state
                .entries
                .keys()
                .chain(state.subscribers.keys())
                .filter(|key| key.resource() == resource)
                .cloned()
                .collect();
            retire(state, &keys);
            keys
        };

        for key in &keys {
            tracing::debug!(%key, "invalidated");
            let _ = self.inner.events.send(CacheEvent::Invalidated(key.clone()));
        }
        keys.into_iter().collect()
    }

    /// Invalidates a single key.
    pub async fn invalidate_key(&self, key: &QueryKey) {
        {
            let mut guard = self.inner.state.lock().await;
            retire(&mut guard, &BTreeSet::from([key.clone()]));
        }
        tracing::debug!(%key, "invalidated");
        let _ = self.inner.events.send(CacheEvent::Invalidated(key.clone()));
    }

    pub async fn subscribe(&self, key: &QueryKey) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.state.lock().await;
        state.subscribers.entry(key.clone()).or_default().push(tx);
        Subscription {
            key: key.clone(),
            rx,
        }
    }

    pub async fn snapshot<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QuerySnapshot<T> {
        let state = self.inner.state.lock().await;
        let Some(entry) = state.entries.get(key) else {
            return QuerySnapshot::empty();
        };
        QuerySnapshot {
            status: entry.observed_status(),
            data: entry
                .value
                .clone()
                .and_then(|value| value.downcast::<T>().ok()),
            error: entry.error.clone(),
            is_fetching: entry.in_flight.is_some(),
            updated_at: entry.updated_at,
        }
    }

    /// Drops every entry. Fetches still running are discarded on arrival.
    pub async fn clear(&self) {
        let mut state = self.inner.state.lock().await;
        state.next_generation();
        state.entries.clear();
        tracing::debug!("query cache cleared");
    }

    /// Drops entries untouched for longer than the gc window, unless a fetch
    /// is running for them or someone is subscribed. Returns how many went.
    ///
    /// Observations already do this once per gc window; calling it directly
    /// only forces an early sweep.
    pub async fn collect_garbage(&self) -> usize {
        let mut state = self.inner.state.lock().await;
        state.sweep(self.inner.config.gc_time)
    }

    fn spawn_fetch<T, Fut>(&self, key: QueryKey, generation: u64, future: Fut) -> InFlight<Erased>
    where
        T: Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let cache = self.clone();
        InFlight::spawn(async move {
            let outcome = future.await.map(|value| Arc::new(value) as Erased);
            cache.complete(&key, generation, &outcome).await;
            outcome
        })
    }

    async fn complete(&self, key: &QueryKey, generation: u64, outcome: &Result<Erased>) {
        let event = {
            let mut state = self.inner.state.lock().await;
            match state.entries.get_mut(key) {
                Some(entry) if entry.generation == generation => {
                    entry.in_flight = None;
                    let extending = std::mem::take(&mut entry.extending);
                    match outcome {
                        Ok(value) => {
                            entry.value = Some(value.clone());
                            entry.error = None;
                            entry.status = QueryStatus::Ready;
                            entry.updated_at = Some(Instant::now());
                            CacheEvent::Fetched(key.clone())
                        }
                        Err(err) => {
                            entry.error = Some(err.clone());
                            if !(extending && entry.status == QueryStatus::Ready) {
                                entry.status = QueryStatus::Error;
                            }
                            CacheEvent::Failed(key.clone())
                        }
                    }
                }
                _ => CacheEvent::Discarded(key.clone()),
            }
        };

        match &event {
            CacheEvent::Discarded(key) => tracing::debug!(%key, "discarded superseded response"),
            CacheEvent::Failed(key) => {
                if let Err(err) = outcome {
                    tracing::debug!(%key, "fetch failed: {err}");
                }
            }
            _ => {}
        }
        let _ = self.inner.events.send(event);
    }
}

fn retire(state: &mut State, keys: &BTreeSet<QueryKey>) {
    let generation = state.next_generation();
    for key in keys {
        if let Some(entry) = state.entries.get_mut(key) {
            entry.retire(generation);
        }
        if let Some(senders) = state.subscribers.get_mut(key) {
            senders.retain(|tx| tx.send(()).is_ok());
        }
    }
}

fn downcast<T: Send + Sync + 'static>(key: &QueryKey, value: Erased) -> Result<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| ClientError::Decode(format!("cached value for {key} has an unexpected type")))
}
