use std::future::Future;

use api_types::{
    category::{Category, CategoryQuery},
    journal::{Journal, JournalFilters, JournalListResponse},
    summary::{Summary, SummaryQuery},
    user::{ApiKey, UserProfile},
};

use crate::{
    Kaizen,
    cache::{Family, Query, QueryKey},
    error::Result,
    http::ApiClient,
};

impl Kaizen {
    fn query<T, P, F, Fut>(&self, key: QueryKey, params: P, load: F) -> Query<T>
    where
        T: Send + Sync + 'static,
        P: Clone + Send + Sync + 'static,
        F: Fn(ApiClient, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let api = self.api.clone();
        Query::new(self.cache.clone(), key, move || {
            load(api.clone(), params.clone())
        })
    }

    pub fn categories(&self, query: &CategoryQuery) -> Result<Query<Vec<Category>>> {
        let key = QueryKey::with_params(Family::Categories, query)?;
        Ok(self.query(key, query.clone(), |api, query| async move {
            api.categories_list(&query).await
        }))
    }

    pub fn category(&self, id: i64) -> Query<Category> {
        let key = QueryKey::new(Family::Category).param("id", id);
        self.query(key, id, |api, id| async move { api.category_get(id).await })
    }

    /// One page of journals, addressed by the complete filter set.
    pub fn journals(&self, filters: &JournalFilters) -> Result<Query<JournalListResponse>> {
        let key = QueryKey::with_params(Family::JournalList, filters)?;
        Ok(self.query(key, filters.clone(), |api, filters| async move {
            api.journals_list(&filters).await
        }))
    }

    pub fn journal(&self, id: i64) -> Query<Journal> {
        let key = QueryKey::new(Family::Journal).param("id", id);
        self.query(key, id, |api, id| async move { api.journal_get(id).await })
    }

    pub fn summary(&self, query: &SummaryQuery) -> Result<Query<Summary>> {
        let key = QueryKey::with_params(Family::Summary, query)?;
        Ok(self.query(key, query.clone(), |api, query| async move {
            api.summary_get(&query).await
        }))
    }

    pub fn profile(&self) -> Query<UserProfile> {
        self.query(QueryKey::new(Family::Profile), (), |api, ()| async move {
            api.me_get().await.map(UserProfile::from)
        })
    }

    /// API keys with their secrets already masked.
    pub fn api_keys(&self) -> Query<Vec<ApiKey>> {
        self.query(QueryKey::new(Family::ApiKeys), (), |api, ()| async move {
            let keys = api.api_keys_list().await?;
            Ok(keys.iter().map(ApiKey::masked).collect())
        })
    }
}
