//! Writes. Each mutation validates its payload, issues exactly one request
//! and, only once that request has succeeded, invalidates the cache
//! resources it affects. Cached values are never edited in place.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use api_types::{
    Amount, MessageResponse,
    category::{Category, CategoryCreate, CategoryUpdate},
    journal::{Journal, JournalCreate, JournalUpdate},
    user::{ApiKeyCreate, ApiKeyCreated, ProfileUpdate, UserProfile},
};

use crate::{
    Kaizen,
    cache::Resource,
    error::{ClientError, Result},
};

const JOURNAL_RESOURCES: &[Resource] = &[Resource::Journals, Resource::Summary];

struct Pending(Arc<AtomicUsize>);

impl Pending {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Kaizen {
    pub async fn create_category(&self, payload: &CategoryCreate) -> Result<Category> {
        require_text("name", &payload.name)?;
        self.mutate(
            "create_category",
            &[Resource::Categories],
            self.api.category_create(payload),
        )
        .await
    }

    pub async fn update_category(&self, id: i64, payload: &CategoryUpdate) -> Result<Category> {
        if let Some(name) = &payload.name {
            require_text("name", name)?;
        }
        self.mutate(
            "update_category",
            &[Resource::Categories],
            self.api.category_update(id, payload),
        )
        .await
    }

    /// Journals that referenced the category keep their `category_id`; they
    /// fall into the uncategorized bucket once categories are refetched.
    pub async fn delete_category(&self, id: i64) -> Result<MessageResponse> {
        self.mutate(
            "delete_category",
            &[Resource::Categories],
            self.api.category_delete(id),
        )
        .await
    }

    pub async fn create_journal(&self, payload: &JournalCreate) -> Result<Journal> {
        require_text("title", &payload.title)?;
        require_positive("amount", payload.amount)?;
        if payload.category_id <= 0 {
            return Err(ClientError::invalid_field("category_id", "select a category"));
        }
        self.mutate(
            "create_journal",
            JOURNAL_RESOURCES,
            self.api.journal_create(payload),
        )
        .await
    }

    pub async fn update_journal(&self, id: i64, payload: &JournalUpdate) -> Result<Journal> {
        if let Some(title) = &payload.title {
            require_text("title", title)?;
        }
        if let Some(amount) = payload.amount {
            require_positive("amount", amount)?;
        }
        self.mutate(
            "update_journal",
            JOURNAL_RESOURCES,
            self.api.journal_update(id, payload),
        )
        .await
    }

    pub async fn delete_journal(&self, id: i64) -> Result<MessageResponse> {
        self.mutate(
            "delete_journal",
            JOURNAL_RESOURCES,
            self.api.journal_delete(id),
        )
        .await
    }

    /// Creates an API key. The returned value is the only place the full
    /// secret ever appears; the cached listing holds masked keys.
    pub async fn create_api_key(&self, payload: &ApiKeyCreate) -> Result<ApiKeyCreated> {
        require_text("name", &payload.name)?;
        self.mutate(
            "create_api_key",
            &[Resource::ApiKeys],
            self.api.api_key_create(payload),
        )
        .await
    }

    pub async fn revoke_api_key(&self, id: i64) -> Result<MessageResponse> {
        self.mutate(
            "revoke_api_key",
            &[Resource::ApiKeys],
            self.api.api_key_delete(id),
        )
        .await
    }

    pub async fn update_profile(&self, payload: &ProfileUpdate) -> Result<UserProfile> {
        require_text("name", &payload.name)?;
        self.mutate(
            "update_profile",
            &[Resource::Profile],
            self.api.me_update(payload),
        )
        .await
        .map(UserProfile::from)
    }

    async fn mutate<T, W>(&self, name: &'static str, resources: &[Resource], write: W) -> Result<T>
    where
        W: Future<Output = Result<T>>,
    {
        let _pending = Pending::start(&self.pending_mutations);
        match write.await {
            Ok(value) => {
                for resource in resources {
                    self.cache.invalidate(*resource).await;
                }
                tracing::debug!(mutation = name, "mutation applied");
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(mutation = name, "mutation failed: {err}");
                Err(err)
            }
        }
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::invalid_field(field, "is required"));
    }
    Ok(())
}

fn require_positive(field: &str, amount: Amount) -> Result<()> {
    if amount.is_negative() || amount.is_zero() {
        return Err(ClientError::invalid_field(field, "must be positive"));
    }
    Ok(())
}
