use api_types::{
    MessageResponse,
    category::{Category, CategoryCreate, CategoryQuery, CategoryUpdate},
    journal::{Journal, JournalCreate, JournalFilters, JournalListResponse, JournalUpdate},
    summary::{Summary, SummaryQuery},
};

use crate::{error::Result, http::ApiClient};

impl ApiClient {
    pub async fn categories_list(&self, query: &CategoryQuery) -> Result<Vec<Category>> {
        self.get_with("/categories", query).await
    }

    pub async fn category_get(&self, id: i64) -> Result<Category> {
        self.get(&format!("/categories/{id}")).await
    }

    pub async fn category_create(&self, payload: &CategoryCreate) -> Result<Category> {
        self.post("/categories", payload).await
    }

    pub async fn category_update(&self, id: i64, payload: &CategoryUpdate) -> Result<Category> {
        self.put(&format!("/categories/{id}"), payload).await
    }

    pub async fn category_delete(&self, id: i64) -> Result<MessageResponse> {
        self.delete(&format!("/categories/{id}")).await
    }

    pub async fn journals_list(&self, filters: &JournalFilters) -> Result<JournalListResponse> {
        self.get_with("/journals", filters).await
    }

    pub async fn journal_get(&self, id: i64) -> Result<Journal> {
        self.get(&format!("/journals/{id}")).await
    }

    pub async fn journal_create(&self, payload: &JournalCreate) -> Result<Journal> {
        self.post("/journals", payload).await
    }

    pub async fn journal_update(&self, id: i64, payload: &JournalUpdate) -> Result<Journal> {
        self.put(&format!("/journals/{id}"), payload).await
    }

    pub async fn journal_delete(&self, id: i64) -> Result<MessageResponse> {
        self.delete(&format!("/journals/{id}")).await
    }

    pub async fn summary_get(&self, query: &SummaryQuery) -> Result<Summary> {
        self.get_with("/journals/summary", query).await
    }
}
