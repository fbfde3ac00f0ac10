use std::{future::Future, pin::Pin, sync::Arc};

use tokio::task::JoinHandle;

use super::{QueryCache, QueryKey, QuerySnapshot, Subscription};
use crate::error::Result;

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;
type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// A cache key bound to the request that loads it.
pub struct Query<T> {
    cache: QueryCache,
    key: QueryKey,
    fetcher: Fetcher<T>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            key: self.key.clone(),
            fetcher: self.fetcher.clone(),
        }
    }
}

impl<T> Query<T>
where
    T: Send + Sync + 'static,
{
    pub fn new<F, Fut>(cache: QueryCache, key: QueryKey, fetcher: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            cache,
            key,
            fetcher: Arc::new(move || Box::pin(fetcher()) as BoxFuture<T>),
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub async fn fetch(&self) -> Result<Arc<T>> {
        self.cache.fetch(&self.key, || (self.fetcher)()).await
    }

    pub async fn refetch(&self) -> Result<Arc<T>> {
        self.cache.refetch(&self.key, || (self.fetcher)()).await
    }

    pub async fn snapshot(&self) -> QuerySnapshot<T> {
        self.cache.snapshot(&self.key).await
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate_key(&self.key).await;
    }

    pub async fn subscribe(&self) -> Subscription {
        self.cache.subscribe(&self.key).await
    }

    /// Refetches this query every time it is invalidated, for as long as the
    /// returned handle lives.
    pub async fn keep_fresh(&self) -> Refresher {
        let mut subscription = self.subscribe().await;
        let query = self.clone();
        let task = tokio::spawn(async move {
            while subscription.invalidated().await {
                if let Err(err) = query.fetch().await {
                    tracing::debug!(key = %query.key, "refetch after invalidation failed: {err}");
                }
            }
        });
        Refresher { task }
    }
}

/// Background refetcher created by [`Query::keep_fresh`]; stops on drop.
pub struct Refresher {
    task: JoinHandle<()>,
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
