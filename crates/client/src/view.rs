//! View-models: compositions of queries and mutations shaped for screens.
//! They own no fetching logic of their own.

use std::sync::Arc;

use api_types::{
    MessageResponse,
    category::{Category, CategoryCreate, CategoryQuery, CategoryUpdate},
    journal::{Journal, JournalCreate, JournalFilters, JournalListResponse, JournalUpdate},
    summary::{Summary, SummaryQuery},
};

use crate::{
    Kaizen,
    aggregation::{self, CategoryBreakdown, CategorySlice},
    cache::{Query, QuerySnapshot},
    error::{ClientError, Result},
    filters::{FinanceTab, FinanceUiState, MonthWindow, TypeFilter},
    pages::{InfiniteJournals, JournalPages},
};

/// Page size used to pull a whole month of journals at once.
pub const MONTH_PAGE_SIZE: u32 = 1000;
/// Number of journals shown on the dashboard.
pub const RECENT_LIMIT: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl From<&JournalListResponse> for Pagination {
    fn from(list: &JournalListResponse) -> Self {
        let total_pages = match list.page_size {
            0 => 0,
            size => list.total_count.div_ceil(u64::from(size)),
        };
        Self {
            page: list.page,
            page_size: list.page_size,
            total_count: list.total_count,
            total_pages,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FinanceOptions {
    pub journal_filters: JournalFilters,
    pub summary: SummaryQuery,
}

/// Everything a finance screen reads, at one point in time.
#[derive(Clone, Debug)]
pub struct FinanceSnapshot {
    pub categories: Arc<Vec<Category>>,
    pub journals: Vec<Journal>,
    pub pagination: Option<Pagination>,
    /// All zeros until a summary has been loaded.
    pub summary: Summary,
    pub is_loading: bool,
    pub is_categories_loading: bool,
    pub is_journals_loading: bool,
    pub is_summary_loading: bool,
    pub is_mutating: bool,
    pub categories_error: Option<ClientError>,
    pub journals_error: Option<ClientError>,
    pub summary_error: Option<ClientError>,
}

impl FinanceSnapshot {
    pub fn breakdown(&self, filter: TypeFilter) -> CategoryBreakdown {
        aggregation::aggregate_by_category(&self.journals, &self.categories, filter)
    }
}

/// Categories, one page of journals and a summary, with the mutations that
/// touch them.
#[derive(Clone)]
pub struct FinanceView {
    kaizen: Kaizen,
    categories: Query<Vec<Category>>,
    journals: Query<JournalListResponse>,
    summary: Query<Summary>,
}

impl FinanceView {
    pub fn new(kaizen: &Kaizen, options: &FinanceOptions) -> Result<Self> {
        Ok(Self {
            kaizen: kaizen.clone(),
            categories: kaizen.categories(&CategoryQuery::default())?,
            journals: kaizen.journals(&options.journal_filters)?,
            summary: kaizen.summary(&options.summary)?,
        })
    }

    /// Observes the three queries concurrently, then reports their state.
    /// Failures end up in the per-resource error fields.
    pub async fn load(&self) -> FinanceSnapshot {
        let _ = tokio::join!(
            self.categories.fetch(),
            self.journals.fetch(),
            self.summary.fetch(),
        );
        self.snapshot().await
    }

    /// Current state without triggering any fetch.
    pub async fn snapshot(&self) -> FinanceSnapshot {
        let categories = self.categories.snapshot().await;
        let journals = self.journals.snapshot().await;
        let summary = self.summary.snapshot().await;

        FinanceSnapshot {
            categories: categories.data.clone().unwrap_or_default(),
            journals: journals
                .data
                .as_ref()
                .map(|list| list.journals.clone())
                .unwrap_or_default(),
            pagination: journals.data.as_deref().map(Pagination::from),
            summary: summary_or_default(&summary),
            is_loading: categories.is_loading() || journals.is_loading() || summary.is_loading(),
            is_categories_loading: categories.is_loading(),
            is_journals_loading: journals.is_loading(),
            is_summary_loading: summary.is_loading(),
            is_mutating: self.kaizen.is_mutating(),
            categories_error: categories.error,
            journals_error: journals.error,
            summary_error: summary.error,
        }
    }

    pub async fn refetch_categories(&self) -> Result<Arc<Vec<Category>>> {
        self.categories.refetch().await
    }

    pub async fn refetch_journals(&self) -> Result<Arc<JournalListResponse>> {
        self.journals.refetch().await
    }

    pub async fn refetch_summary(&self) -> Result<Arc<Summary>> {
        self.summary.refetch().await
    }

    pub async fn create_category(&self, payload: &CategoryCreate) -> Result<Category> {
        self.kaizen.create_category(payload).await
    }

    pub async fn update_category(&self, id: i64, payload: &CategoryUpdate) -> Result<Category> {
        self.kaizen.update_category(id, payload).await
    }

    pub async fn delete_category(&self, id: i64) -> Result<MessageResponse> {
        self.kaizen.delete_category(id).await
    }

    pub async fn create_journal(&self, payload: &JournalCreate) -> Result<Journal> {
        self.kaizen.create_journal(payload).await
    }

    pub async fn update_journal(&self, id: i64, payload: &JournalUpdate) -> Result<Journal> {
        self.kaizen.update_journal(id, payload).await
    }

    pub async fn delete_journal(&self, id: i64) -> Result<MessageResponse> {
        self.kaizen.delete_journal(id).await
    }
}

fn summary_or_default(snapshot: &QuerySnapshot<Summary>) -> Summary {
    snapshot
        .data
        .as_deref()
        .cloned()
        .unwrap_or_default()
}

#[derive(Clone, Debug)]
pub struct FinancePageSnapshot {
    pub tab: FinanceTab,
    pub journals: Vec<Journal>,
    pub total_count: u64,
    pub has_next_page: bool,
    pub categories: Arc<Vec<Category>>,
    pub month: MonthWindow,
    pub summary: Summary,
    /// Journals of the selected month; empty unless the summary tab is open.
    pub month_journals: Vec<Journal>,
    pub is_loading: bool,
    pub is_mutating: bool,
    pub journals_error: Option<ClientError>,
    pub categories_error: Option<ClientError>,
    pub summary_error: Option<ClientError>,
}

impl FinancePageSnapshot {
    /// Category breakdown of the selected month.
    pub fn breakdown(&self, filter: TypeFilter) -> CategoryBreakdown {
        aggregation::aggregate_by_category(&self.month_journals, &self.categories, filter)
    }

    pub fn expense_slices(&self) -> Vec<CategorySlice> {
        aggregation::expense_by_category(&self.month_journals, &self.categories)
    }
}

/// The finance screen: selection state bound to the queries it drives.
pub struct FinancePage {
    kaizen: Kaizen,
    ui: FinanceUiState<Journal, Category>,
    month: MonthWindow,
    categories: Query<Vec<Category>>,
}

impl FinancePage {
    pub fn new(kaizen: &Kaizen) -> Result<Self> {
        Ok(Self {
            kaizen: kaizen.clone(),
            ui: FinanceUiState::default(),
            month: MonthWindow::containing(kaizen.today()),
            categories: kaizen.categories(&CategoryQuery::default())?,
        })
    }

    pub fn ui(&self) -> &FinanceUiState<Journal, Category> {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut FinanceUiState<Journal, Category> {
        &mut self.ui
    }

    pub fn month(&self) -> MonthWindow {
        self.month
    }

    pub fn set_month(&mut self, month: MonthWindow) {
        self.month = month;
    }

    pub fn prev_month(&mut self) {
        self.month = self.month.prev();
    }

    /// Moves one month forward, never past the current month.
    pub fn next_month(&mut self) {
        if !self.month.is_current(self.kaizen.today()) {
            self.month = self.month.next();
        }
    }

    /// Transactions tab listing for the current filters. A filter change
    /// yields a list under a different key.
    pub fn transactions(&self) -> Result<InfiniteJournals> {
        self.kaizen.infinite_journals(&self.ui.journal_filters())
    }

    pub fn summary(&self) -> Result<Query<Summary>> {
        self.kaizen.summary(&self.month.summary_query())
    }

    pub fn month_journals(&self) -> Result<Query<JournalListResponse>> {
        self.kaizen
            .journals(&self.month.journal_filters(MONTH_PAGE_SIZE))
    }

    pub async fn fetch_next_page(&self) -> Result<Arc<JournalPages>> {
        self.transactions()?.fetch_next_page().await
    }

    pub async fn load(&self) -> Result<FinancePageSnapshot> {
        let transactions = self.transactions()?;
        let summary = self.summary()?;
        let month_journals = match self.ui.active_tab() {
            FinanceTab::Summary => Some(self.month_journals()?),
            _ => None,
        };

        let _ = tokio::join!(
            transactions.fetch(),
            self.categories.fetch(),
            summary.fetch(),
            async {
                if let Some(query) = &month_journals {
                    let _ = query.fetch().await;
                }
            },
        );

        let pages = transactions.snapshot().await;
        let categories = self.categories.snapshot().await;
        let summary = summary.snapshot().await;
        let month = match &month_journals {
            Some(query) => Some(query.snapshot().await),
            None => None,
        };

        let held = pages.data.clone().unwrap_or_default();
        Ok(FinancePageSnapshot {
            tab: self.ui.active_tab(),
            journals: held.journals().to_vec(),
            total_count: held.total_count(),
            has_next_page: held.has_next_page(),
            categories: categories.data.clone().unwrap_or_default(),
            month: self.month,
            summary: summary_or_default(&summary),
            month_journals: month
                .as_ref()
                .and_then(|month| month.data.as_ref())
                .map(|list| list.journals.clone())
                .unwrap_or_default(),
            is_loading: pages.is_loading()
                || categories.is_loading()
                || summary.is_loading()
                || month.as_ref().is_some_and(QuerySnapshot::is_loading),
            is_mutating: self.kaizen.is_mutating(),
            journals_error: pages.error,
            categories_error: categories.error,
            summary_error: summary.error,
        })
    }

    /// Submits the journal dialog: updates the entry being edited, or creates
    /// one. The dialog closes only on success.
    pub async fn save_journal(&mut self, payload: JournalCreate) -> Result<Journal> {
        let saved = match self.ui.journal_modal().editing() {
            Some(journal) => {
                self.kaizen
                    .update_journal(journal.id, &JournalUpdate::from(payload))
                    .await?
            }
            None => self.kaizen.create_journal(&payload).await?,
        };
        self.ui.close_journal_modal();
        Ok(saved)
    }

    pub async fn save_category(&mut self, payload: CategoryCreate) -> Result<Category> {
        let saved = match self.ui.category_modal().editing() {
            Some(category) => {
                self.kaizen
                    .update_category(category.id, &CategoryUpdate::from(payload))
                    .await?
            }
            None => self.kaizen.create_category(&payload).await?,
        };
        self.ui.close_category_modal();
        Ok(saved)
    }

    pub async fn delete_journal(&self, id: i64) -> Result<MessageResponse> {
        self.kaizen.delete_journal(id).await
    }

    pub async fn delete_category(&self, id: i64) -> Result<MessageResponse> {
        self.kaizen.delete_category(id).await
    }
}

#[derive(Clone, Debug)]
pub struct DashboardSnapshot {
    pub recent: Vec<Journal>,
    pub summary: Summary,
    pub is_journals_loading: bool,
    pub is_summary_loading: bool,
    pub journals_error: Option<ClientError>,
    pub summary_error: Option<ClientError>,
}

/// Most recent journals plus the all-time summary.
#[derive(Clone)]
pub struct DashboardView {
    recent: Query<JournalListResponse>,
    summary: Query<Summary>,
}

impl DashboardView {
    pub fn new(kaizen: &Kaizen) -> Result<Self> {
        let filters = JournalFilters {
            page_size: Some(RECENT_LIMIT),
            ..JournalFilters::default()
        };
        Ok(Self {
            recent: kaizen.journals(&filters)?,
            summary: kaizen.summary(&SummaryQuery::default())?,
        })
    }

    pub async fn load(&self) -> DashboardSnapshot {
        let _ = tokio::join!(self.recent.fetch(), self.summary.fetch());
        self.snapshot().await
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let recent = self.recent.snapshot().await;
        let summary = self.summary.snapshot().await;
        DashboardSnapshot {
            recent: recent
                .data
                .as_ref()
                .map(|list| {
                    list.journals
                        .iter()
                        .take(RECENT_LIMIT as usize)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            summary: summary_or_default(&summary),
            is_journals_loading: recent.is_loading(),
            is_summary_loading: summary.is_loading(),
            journals_error: recent.error,
            summary_error: summary.error,
        }
    }
}
