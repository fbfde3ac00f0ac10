//! Infinite journal lists.

use std::{collections::HashSet, sync::Arc};

use api_types::journal::{Journal, JournalFilters, JournalListResponse};

use crate::{
    Kaizen,
    cache::{Family, QueryCache, QueryKey, QuerySnapshot},
    error::Result,
    http::ApiClient,
};

/// Pages loaded so far, flattened in page order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JournalPages {
    journals: Vec<Journal>,
    last_page: u32,
    page_count: usize,
    total_count: u64,
    exhausted: bool,
}

impl JournalPages {
    pub fn first(page: JournalListResponse) -> Self {
        let mut pages = Self::default();
        pages.push(page);
        pages
    }

    /// Appends a page. Entries already present (shifted by an insertion
    /// between requests) are skipped.
    pub fn push(&mut self, page: JournalListResponse) {
        let seen: HashSet<i64> = self.journals.iter().map(|journal| journal.id).collect();
        self.exhausted = page.journals.is_empty();
        self.last_page = page.page;
        self.total_count = page.total_count;
        self.page_count += 1;
        self.journals.extend(
            page.journals
                .into_iter()
                .filter(|journal| !seen.contains(&journal.id)),
        );
    }

    pub fn journals(&self) -> &[Journal] {
        &self.journals
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Total reported by the most recent page.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn has_next_page(&self) -> bool {
        !self.exhausted && (self.journals.len() as u64) < self.total_count
    }

    pub fn next_page(&self) -> u32 {
        self.last_page + 1
    }
}

/// A journal listing that grows one page at a time. All pages live in a
/// single cache entry keyed by the filters (paging excluded).
#[derive(Clone)]
pub struct InfiniteJournals {
    api: ApiClient,
    cache: QueryCache,
    key: QueryKey,
    filters: JournalFilters,
    page_size: u32,
}

impl InfiniteJournals {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn filters(&self) -> &JournalFilters {
        &self.filters
    }

    /// Observes the list, loading the first page when nothing is cached.
    pub async fn fetch(&self) -> Result<Arc<JournalPages>> {
        let loader = self.clone();
        self.cache
            .fetch(&self.key, move || async move { loader.first_page().await })
            .await
    }

    /// Reloads from page one.
    pub async fn refetch(&self) -> Result<Arc<JournalPages>> {
        let loader = self.clone();
        self.cache
            .refetch(&self.key, move || async move { loader.first_page().await })
            .await
    }

    /// Loads the page after the last one held. Calls made while a page is
    /// loading share that request.
    pub async fn fetch_next_page(&self) -> Result<Arc<JournalPages>> {
        let loader = self.clone();
        self.cache
            .extend(&self.key, move |current: Option<Arc<JournalPages>>| async move {
                match current {
                    None => loader.first_page().await,
                    Some(pages) if !pages.has_next_page() => Ok(pages.as_ref().clone()),
                    Some(pages) => {
                        let next = loader.load_page(pages.next_page()).await?;
                        let mut merged = pages.as_ref().clone();
                        merged.push(next);
                        Ok(merged)
                    }
                }
            })
            .await
    }

    pub async fn snapshot(&self) -> QuerySnapshot<JournalPages> {
        self.cache.snapshot(&self.key).await
    }

    async fn first_page(&self) -> Result<JournalPages> {
        self.load_page(1).await.map(JournalPages::first)
    }

    async fn load_page(&self, page: u32) -> Result<JournalListResponse> {
        let filters = JournalFilters {
            page: Some(page),
            page_size: Some(self.page_size),
            ..self.filters.without_paging()
        };
        tracing::debug!(page, key = %self.key, "loading journal page");
        self.api.journals_list(&filters).await
    }
}

impl Kaizen {
    /// Infinite listing with the configured page size.
    pub fn infinite_journals(&self, filters: &JournalFilters) -> Result<InfiniteJournals> {
        self.infinite_journals_with(filters, self.config.page_size)
    }

    pub fn infinite_journals_with(
        &self,
        filters: &JournalFilters,
        page_size: u32,
    ) -> Result<InfiniteJournals> {
        let filters = filters.without_paging();
        let key = QueryKey::with_params(Family::JournalInfinite, &filters)?
            .param("page_size", page_size);
        Ok(InfiniteJournals {
            api: self.api.clone(),
            cache: self.cache.clone(),
            key,
            filters,
            page_size,
        })
    }
}
