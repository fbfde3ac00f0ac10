//! A single pending operation that any number of callers can wait on.
//!
//! The operation runs on its own task, so it completes (and records its
//! outcome) even when every waiter has gone away.

use std::future::Future;

use tokio::sync::watch;

use crate::error::{ClientError, Result};

pub(crate) struct InFlight<T> {
    rx: watch::Receiver<Option<Result<T>>>,
}

impl<T> Clone for InFlight<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn spawn<F>(operation: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(None);
        tokio::spawn(async move {
            let outcome = operation.await;
            let _ = tx.send(Some(outcome));
        });
        Self { rx }
    }

    /// Waits for the shared outcome.
    pub(crate) async fn wait(&self) -> Result<T> {
        let mut rx = self.rx.clone();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(Err(ClientError::Interrupted))
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.rx.borrow().is_some()
    }
}
