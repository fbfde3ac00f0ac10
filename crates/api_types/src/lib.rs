use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

pub use amount::{Amount, ParseAmountError};

mod amount;
pub mod dates;

/// Direction of a category or journal entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Income,
    Expense,
}

impl EntryType {
    /// Returns the canonical string used by the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body returned by the backend for non-2xx responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Per-field validation messages, when the backend reports them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

pub mod category {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Category {
        #[serde(rename = "ID")]
        pub id: i64,
        #[serde(default)]
        pub user_id: i64,
        pub name: String,
        #[serde(rename = "type")]
        pub kind: EntryType,
        #[serde(default)]
        pub description: String,
        #[serde(default)]
        pub color: String,
        #[serde(default)]
        pub icon: String,
        #[serde(default = "default_true")]
        pub is_active: bool,
        #[serde(rename = "CreatedAt", default, with = "dates::lenient_timestamp")]
        pub created_at: Option<DateTime<FixedOffset>>,
        #[serde(rename = "UpdatedAt", default, with = "dates::lenient_timestamp")]
        pub updated_at: Option<DateTime<FixedOffset>>,
        /// Soft-delete marker.
        #[serde(rename = "DeletedAt", default, with = "dates::lenient_timestamp")]
        pub deleted_at: Option<DateTime<FixedOffset>>,
    }

    /// Query parameters for `GET /categories`.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CategoryQuery {
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        pub kind: Option<EntryType>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub active: Option<bool>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryCreate {
        pub name: String,
        #[serde(rename = "type")]
        pub kind: EntryType,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub color: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub icon: Option<String>,
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        pub kind: Option<EntryType>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub color: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub icon: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub is_active: Option<bool>,
    }

    /// An edit dialog submits the same fields as a create dialog.
    impl From<CategoryCreate> for CategoryUpdate {
        fn from(payload: CategoryCreate) -> Self {
            Self {
                name: Some(payload.name),
                kind: Some(payload.kind),
                description: payload.description,
                color: payload.color,
                icon: payload.icon,
                is_active: None,
            }
        }
    }
}

pub mod journal {
    use super::{category::Category, *};

    /// A single income/expense record.
    ///
    /// `amount` is never negative; `kind` carries the direction. The entry's
    /// `kind` is independent from its category's kind.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Journal {
        #[serde(rename = "ID")]
        pub id: i64,
        #[serde(default)]
        pub user_id: i64,
        #[serde(default)]
        pub category_id: Option<i64>,
        #[serde(rename = "type")]
        pub kind: EntryType,
        pub amount: Amount,
        pub title: String,
        #[serde(default)]
        pub description: String,
        /// Calendar date; source of truth for grouping and sorting.
        #[serde(with = "dates::calendar_date")]
        pub date: NaiveDate,
        #[serde(default)]
        pub payment_method: String,
        #[serde(default)]
        pub location: String,
        #[serde(default)]
        pub is_recurring: bool,
        #[serde(default)]
        pub receipt_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category: Option<Category>,
        #[serde(rename = "CreatedAt", default, with = "dates::lenient_timestamp")]
        pub created_at: Option<DateTime<FixedOffset>>,
        #[serde(rename = "UpdatedAt", default, with = "dates::lenient_timestamp")]
        pub updated_at: Option<DateTime<FixedOffset>>,
        #[serde(rename = "DeletedAt", default, with = "dates::lenient_timestamp")]
        pub deleted_at: Option<DateTime<FixedOffset>>,
    }

    /// Query parameters for `GET /journals`.
    ///
    /// Only the populated fields are sent, so `JournalFilters::default()` never
    /// constrains a listing.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct JournalFilters {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub start_date: Option<NaiveDate>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub end_date: Option<NaiveDate>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub category_id: Option<i64>,
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        pub kind: Option<EntryType>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub page: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub page_size: Option<u32>,
    }

    impl JournalFilters {
        /// Same filters, with paging parameters removed.
        #[must_use]
        pub fn without_paging(&self) -> Self {
            Self {
                page: None,
                page_size: None,
                ..self.clone()
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct JournalListResponse {
        #[serde(alias = "items")]
        pub journals: Vec<Journal>,
        pub page: u32,
        pub page_size: u32,
        pub total_count: u64,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct JournalCreate {
        pub category_id: i64,
        /// Entry direction; when absent the backend derives it from the category.
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        pub kind: Option<EntryType>,
        pub amount: Amount,
        pub title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(
            default,
            with = "dates::optional_calendar_date",
            skip_serializing_if = "Option::is_none"
        )]
        pub date: Option<NaiveDate>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub payment_method: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub location: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub is_recurring: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub receipt_url: Option<String>,
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct JournalUpdate {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub category_id: Option<i64>,
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        pub kind: Option<EntryType>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub amount: Option<Amount>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(
            default,
            with = "dates::optional_calendar_date",
            skip_serializing_if = "Option::is_none"
        )]
        pub date: Option<NaiveDate>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub payment_method: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub location: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub is_recurring: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub receipt_url: Option<String>,
    }

    impl From<JournalCreate> for JournalUpdate {
        fn from(payload: JournalCreate) -> Self {
            Self {
                category_id: Some(payload.category_id),
                kind: payload.kind,
                amount: Some(payload.amount),
                title: Some(payload.title),
                description: payload.description,
                date: payload.date,
                payment_method: payload.payment_method,
                location: payload.location,
                is_recurring: payload.is_recurring,
                receipt_url: payload.receipt_url,
            }
        }
    }
}

pub mod summary {
    use super::*;

    /// Server-computed totals for a date window.
    ///
    /// `Summary::default()` is the all-zero summary shown while nothing has
    /// been loaded.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Summary {
        #[serde(default)]
        pub total_income: Amount,
        #[serde(default)]
        pub total_expense: Amount,
        #[serde(default)]
        pub net_balance: Amount,
        #[serde(default)]
        pub entry_count: u64,
        #[serde(
            default,
            with = "dates::optional_calendar_date",
            skip_serializing_if = "Option::is_none"
        )]
        pub start_date: Option<NaiveDate>,
        #[serde(
            default,
            with = "dates::optional_calendar_date",
            skip_serializing_if = "Option::is_none"
        )]
        pub end_date: Option<NaiveDate>,
    }

    /// Query parameters for `GET /journals/summary`.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SummaryQuery {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub start_date: Option<NaiveDate>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub end_date: Option<NaiveDate>,
    }
}

pub mod user {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct User {
        pub id: i64,
        pub name: String,
        pub email: String,
        #[serde(default)]
        pub email_verified: bool,
        #[serde(default, with = "dates::lenient_timestamp")]
        pub last_login_at: Option<DateTime<FixedOffset>>,
        #[serde(rename = "createdAt", default, with = "dates::lenient_timestamp")]
        pub created_at: Option<DateTime<FixedOffset>>,
        #[serde(rename = "updatedAt", default, with = "dates::lenient_timestamp")]
        pub updated_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct UserProfile {
        pub id: i64,
        pub name: String,
        pub email: String,
    }

    impl From<User> for UserProfile {
        fn from(user: User) -> Self {
            Self {
                id: user.id,
                name: user.name,
                email: user.email,
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ProfileUpdate {
        pub name: String,
    }

    /// Number of secret characters kept visible once a key has been created.
    pub const API_KEY_VISIBLE_PREFIX: usize = 8;
    const API_KEY_MASK: &str = "••••••••••••••••••••";

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ApiKey {
        pub id: i64,
        pub name: String,
        pub key: String,
        #[serde(default, with = "dates::lenient_timestamp")]
        pub expires_at: Option<DateTime<FixedOffset>>,
        #[serde(default)]
        pub is_active: bool,
        #[serde(default, with = "dates::lenient_timestamp")]
        pub last_used_at: Option<DateTime<FixedOffset>>,
        #[serde(rename = "createdAt", default, with = "dates::lenient_timestamp")]
        pub created_at: Option<DateTime<FixedOffset>>,
        #[serde(rename = "updatedAt", default, with = "dates::lenient_timestamp")]
        pub updated_at: Option<DateTime<FixedOffset>>,
    }

    impl ApiKey {
        /// Copy of the key with the secret reduced to its visible prefix.
        #[must_use]
        pub fn masked(&self) -> Self {
            Self {
                key: mask_secret(&self.key),
                ..self.clone()
            }
        }
    }

    /// Keeps the first [`API_KEY_VISIBLE_PREFIX`] characters of a secret.
    pub fn mask_secret(secret: &str) -> String {
        let prefix: String = secret.chars().take(API_KEY_VISIBLE_PREFIX).collect();
        format!("{prefix}{API_KEY_MASK}")
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ApiKeyCreate {
        pub name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub expires_at: Option<String>,
    }

    /// Response of a key creation: the only time the full secret is visible.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ApiKeyCreated {
        pub id: i64,
        pub name: String,
        pub key: String,
        #[serde(default, with = "dates::lenient_timestamp")]
        pub expires_at: Option<DateTime<FixedOffset>>,
        #[serde(default, with = "dates::lenient_timestamp")]
        pub created_at: Option<DateTime<FixedOffset>>,
    }
}

pub mod auth {
    use super::{user::UserProfile, *};

    #[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LoginRequest {
        pub email: String,
        pub password: String,
    }

    impl fmt::Debug for LoginRequest {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("LoginRequest")
                .field("email", &self.email)
                .field("password", &"***")
                .finish()
        }
    }

    #[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RegisterRequest {
        pub name: String,
        pub email: String,
        pub password: String,
    }

    impl fmt::Debug for RegisterRequest {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("RegisterRequest")
                .field("name", &self.name)
                .field("email", &self.email)
                .field("password", &"***")
                .finish()
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AuthResponse {
        pub access_token: String,
        pub refresh_token: String,
        pub user: UserProfile,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TokenPair {
        pub access_token: String,
        pub refresh_token: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RefreshRequest {
        pub refresh_token: String,
    }
}

#[cfg(test)]
mod tests {
    use super::{journal::*, summary::Summary, user::*, *};

    #[test]
    fn journal_decodes_backend_shape() {
        let raw = r#"{
            "ID": 7,
            "user_id": 1,
            "category_id": 3,
            "type": "expense",
            "amount": 12.5,
            "title": "Lunch",
            "date": "2024-01-15T00:00:00Z",
            "CreatedAt": "2024-01-15T12:00:00Z",
            "UpdatedAt": "",
            "DeletedAt": null
        }"#;
        let journal: Journal = serde_json::from_str(raw).unwrap();
        assert_eq!(journal.id, 7);
        assert_eq!(journal.kind, EntryType::Expense);
        assert_eq!(journal.amount, Amount::new(1250));
        assert_eq!(journal.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert!(journal.created_at.is_some());
        assert!(journal.updated_at.is_none());
        assert_eq!(journal.description, "");
    }

    #[test]
    fn list_response_accepts_items_alias() {
        let raw = r#"{"items": [], "page": 1, "page_size": 20, "total_count": 0}"#;
        let list: JournalListResponse = serde_json::from_str(raw).unwrap();
        assert!(list.journals.is_empty());
    }

    #[test]
    fn default_filters_serialize_to_nothing() {
        assert_eq!(serde_json::to_string(&JournalFilters::default()).unwrap(), "{}");

        let filters = JournalFilters {
            kind: Some(EntryType::Income),
            start_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            ..JournalFilters::default()
        };
        assert_eq!(
            serde_json::to_string(&filters).unwrap(),
            r#"{"start_date":"2024-02-01","type":"income"}"#
        );
    }

    #[test]
    fn summary_tolerates_empty_window() {
        let raw = r#"{"total_income": 100, "total_expense": 40.5, "net_balance": 59.5,
                      "entry_count": 3, "start_date": "", "end_date": ""}"#;
        let summary: Summary = serde_json::from_str(raw).unwrap();
        assert_eq!(summary.net_balance, Amount::new(5950));
        assert_eq!(summary.start_date, None);
    }

    #[test]
    fn api_key_masking_keeps_prefix() {
        assert_eq!(mask_secret("kz_1234567890abcdef"), "kz_12345••••••••••••••••••••");
        assert_eq!(mask_secret("short"), "short••••••••••••••••••••");
    }
}
