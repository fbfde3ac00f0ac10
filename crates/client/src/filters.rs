//! Transient selection state of the finance screen and the month window used
//! by the summary tab. Nothing here is persisted.

use std::{fmt, str::FromStr};

use api_types::{
    EntryType,
    journal::JournalFilters,
    summary::SummaryQuery,
};
use chrono::{Datelike, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FinanceTab {
    #[default]
    Transactions,
    Categories,
    Summary,
}

impl FinanceTab {
    pub const ALL: [FinanceTab; 3] = [Self::Transactions, Self::Categories, Self::Summary];

    pub fn label(self) -> &'static str {
        match self {
            Self::Transactions => "Transactions",
            Self::Categories => "Categories",
            Self::Summary => "Summary",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TypeFilter {
    #[default]
    All,
    Income,
    Expense,
}

impl TypeFilter {
    pub fn matches(self, kind: EntryType) -> bool {
        self.entry_type().is_none_or(|wanted| wanted == kind)
    }

    /// The entry type to filter on, `None` for `All`.
    pub fn entry_type(self) -> Option<EntryType> {
        match self {
            Self::All => None,
            Self::Income => Some(EntryType::Income),
            Self::Expense => Some(EntryType::Expense),
        }
    }
}

impl From<EntryType> for TypeFilter {
    fn from(kind: EntryType) -> Self {
        match kind {
            EntryType::Income => Self::Income,
            EntryType::Expense => Self::Expense,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Open/closed state of a create-or-edit dialog.
#[derive(Clone, Debug, PartialEq)]
pub enum ModalState<T> {
    Closed,
    Creating,
    Editing(T),
}

impl<T> Default for ModalState<T> {
    fn default() -> Self {
        Self::Closed
    }
}

impl<T> ModalState<T> {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    pub fn editing(&self) -> Option<&T> {
        match self {
            Self::Editing(target) => Some(target),
            _ => None,
        }
    }
}

/// Selection state of one finance screen.
#[derive(Clone, Debug, PartialEq)]
pub struct FinanceUiState<J, C> {
    active_tab: FinanceTab,
    type_filter: TypeFilter,
    date_range: DateRange,
    journal_modal: ModalState<J>,
    category_modal: ModalState<C>,
}

impl<J, C> Default for FinanceUiState<J, C> {
    fn default() -> Self {
        Self {
            active_tab: FinanceTab::default(),
            type_filter: TypeFilter::default(),
            date_range: DateRange::default(),
            journal_modal: ModalState::Closed,
            category_modal: ModalState::Closed,
        }
    }
}

impl<J, C> FinanceUiState<J, C> {
    pub fn active_tab(&self) -> FinanceTab {
        self.active_tab
    }

    pub fn set_active_tab(&mut self, tab: FinanceTab) {
        self.active_tab = tab;
    }

    pub fn type_filter(&self) -> TypeFilter {
        self.type_filter
    }

    pub fn set_type_filter(&mut self, filter: TypeFilter) {
        self.type_filter = filter;
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn set_date_range(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.date_range = DateRange { start, end };
    }

    pub fn clear_date_range(&mut self) {
        self.date_range = DateRange::default();
    }

    pub fn clear_all_filters(&mut self) {
        self.type_filter = TypeFilter::All;
        self.date_range = DateRange::default();
    }

    pub fn journal_modal(&self) -> &ModalState<J> {
        &self.journal_modal
    }

    /// Opens the journal dialog, editing `journal` or creating when `None`.
    pub fn open_journal_modal(&mut self, journal: Option<J>) {
        self.journal_modal = journal.map_or(ModalState::Creating, ModalState::Editing);
    }

    pub fn close_journal_modal(&mut self) {
        self.journal_modal = ModalState::Closed;
    }

    pub fn category_modal(&self) -> &ModalState<C> {
        &self.category_modal
    }

    pub fn open_category_modal(&mut self, category: Option<C>) {
        self.category_modal = category.map_or(ModalState::Creating, ModalState::Editing);
    }

    pub fn close_category_modal(&mut self) {
        self.category_modal = ModalState::Closed;
    }

    /// Request filters for the current selection. Default selections add
    /// nothing, so the initial state never constrains a listing.
    pub fn journal_filters(&self) -> JournalFilters {
        JournalFilters {
            kind: self.type_filter.entry_type(),
            start_date: self.date_range.start,
            end_date: self.date_range.end,
            ..JournalFilters::default()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Shortcuts offered next to the month navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonthPreset {
    ThisMonth,
    LastMonth,
    ThreeMonthsAgo,
}

/// A calendar month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthWindow {
    year: i32,
    month: u32,
}

impl MonthWindow {
    /// `None` unless `month` is in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self::containing)
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Month of "now" in `tz`.
    pub fn current(tz: Tz) -> Self {
        Self::containing(Utc::now().with_timezone(&tz).date_naive())
    }

    pub fn preset(preset: MonthPreset, today: NaiveDate) -> Self {
        let this = Self::containing(today);
        match preset {
            MonthPreset::ThisMonth => this,
            MonthPreset::LastMonth => this.prev(),
            MonthPreset::ThreeMonthsAgo => this.prev().prev(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    #[must_use]
    pub fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(self) -> NaiveDate {
        self.first_day()
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// Whether this is the month containing `today`. Navigation past the
    /// current month is disabled.
    pub fn is_current(self, today: NaiveDate) -> bool {
        self == Self::containing(today)
    }

    /// Display label, e.g. `January 2024`.
    pub fn label(self) -> String {
        self.first_day().format("%B %Y").to_string()
    }

    pub fn summary_query(self) -> SummaryQuery {
        SummaryQuery {
            start_date: Some(self.first_day()),
            end_date: Some(self.last_day()),
        }
    }

    /// Filters covering the whole month in a single page of `page_size`.
    pub fn journal_filters(self, page_size: u32) -> JournalFilters {
        JournalFilters {
            start_date: Some(self.first_day()),
            end_date: Some(self.last_day()),
            page: Some(1),
            page_size: Some(page_size),
            ..JournalFilters::default()
        }
    }
}

impl fmt::Display for MonthWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid month `{0}`, expected YYYY-MM")]
pub struct ParseMonthError(String);

impl FromStr for MonthWindow {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseMonthError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type UiState = FinanceUiState<i64, i64>;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_state_does_not_constrain_queries() {
        let state = UiState::default();
        assert_eq!(state.active_tab(), FinanceTab::Transactions);
        assert_eq!(state.journal_filters(), JournalFilters::default());
    }

    #[test]
    fn only_non_default_fields_become_filters() {
        let mut state = UiState::default();
        state.set_type_filter(TypeFilter::Expense);
        state.set_date_range(Some(date(2024, 3, 1)), None);

        let filters = state.journal_filters();
        assert_eq!(filters.kind, Some(EntryType::Expense));
        assert_eq!(filters.start_date, Some(date(2024, 3, 1)));
        assert_eq!(filters.end_date, None);
        assert_eq!(filters.page, None);
    }

    #[test]
    fn clear_all_filters_resets_type_and_dates() {
        let mut state = UiState::default();
        state.set_type_filter(TypeFilter::Income);
        state.set_date_range(Some(date(2024, 1, 1)), Some(date(2024, 1, 31)));
        state.set_active_tab(FinanceTab::Summary);

        state.clear_all_filters();
        assert_eq!(state.type_filter(), TypeFilter::All);
        assert!(state.date_range().is_empty());
        assert_eq!(state.active_tab(), FinanceTab::Summary);
    }

    #[test]
    fn modal_transitions() {
        let mut state = UiState::default();
        state.open_journal_modal(Some(7));
        assert_eq!(state.journal_modal().editing(), Some(&7));

        state.open_journal_modal(None);
        assert_eq!(state.journal_modal(), &ModalState::Creating);
        assert!(state.journal_modal().is_open());

        state.close_journal_modal();
        assert_eq!(state.journal_modal(), &ModalState::Closed);
        assert_eq!(state.journal_modal().editing(), None);

        state.open_category_modal(Some(3));
        state.reset();
        assert!(!state.category_modal().is_open());
    }

    #[test]
    fn type_filter_matching() {
        assert!(TypeFilter::All.matches(EntryType::Income));
        assert!(TypeFilter::Expense.matches(EntryType::Expense));
        assert!(!TypeFilter::Expense.matches(EntryType::Income));
    }

    #[test]
    fn month_navigation_wraps_years() {
        let january = MonthWindow::new(2024, 1).unwrap();
        assert_eq!(january.prev(), MonthWindow::new(2023, 12).unwrap());
        assert_eq!(january.prev().next(), january);
        assert!(MonthWindow::new(2024, 13).is_none());
    }

    #[test]
    fn month_bounds_and_label() {
        let february = MonthWindow::new(2024, 2).unwrap();
        assert_eq!(february.first_day(), date(2024, 2, 1));
        assert_eq!(february.last_day(), date(2024, 2, 29));
        assert_eq!(MonthWindow::new(2023, 12).unwrap().last_day(), date(2023, 12, 31));
        assert_eq!(february.label(), "February 2024");
        assert_eq!(february.to_string(), "2024-02");

        let query = february.summary_query();
        assert_eq!(query.start_date, Some(date(2024, 2, 1)));
        assert_eq!(query.end_date, Some(date(2024, 2, 29)));
        assert_eq!(february.journal_filters(1000).page_size, Some(1000));
    }

    #[test]
    fn presets_count_back_from_today() {
        let today = date(2024, 2, 15);
        assert_eq!(
            MonthWindow::preset(MonthPreset::ThisMonth, today),
            MonthWindow::new(2024, 2).unwrap()
        );
        assert_eq!(
            MonthWindow::preset(MonthPreset::ThreeMonthsAgo, today),
            MonthWindow::new(2023, 12).unwrap()
        );
        assert!(MonthWindow::containing(today).is_current(today));
        assert!(!MonthWindow::new(2024, 1).unwrap().is_current(today));
    }

    #[test]
    fn months_parse_from_their_display_form() {
        let parsed: MonthWindow = "2024-02".parse().unwrap();
        assert_eq!(parsed, MonthWindow::new(2024, 2).unwrap());
        assert_eq!(parsed.to_string().parse::<MonthWindow>().unwrap(), parsed);
        assert!("2024-13".parse::<MonthWindow>().is_err());
        assert!("february".parse::<MonthWindow>().is_err());
    }
}
