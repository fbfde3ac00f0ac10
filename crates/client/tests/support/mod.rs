//! In-process backend used by the integration tests.

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use api_types::{
    Amount, EntryType, ErrorResponse, MessageResponse,
    auth::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, TokenPair},
    category::{Category, CategoryCreate, CategoryUpdate},
    journal::{Journal, JournalCreate, JournalFilters, JournalListResponse, JournalUpdate},
    summary::{Summary, SummaryQuery},
    user::{ApiKey, ApiKeyCreate, ApiKeyCreated, ProfileUpdate, User},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};
use chrono::NaiveDate;
use client::{ClientConfig, Kaizen, TokenStore};

pub const PASSWORD: &str = "correct horse";

type Reply<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn reject<T>(status: StatusCode, error: &str) -> Reply<T> {
    Err((
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            fields: BTreeMap::new(),
        }),
    ))
}

pub struct Data {
    pub access_token: String,
    pub refresh_token: String,
    rotations: u32,
    next_id: i64,
    pub user: User,
    pub categories: Vec<Category>,
    /// Newest first, like the real listing.
    pub journals: Vec<Journal>,
    pub api_keys: Vec<ApiKey>,
    /// Every request, as `METHOD /path`, in arrival order.
    pub log: Vec<String>,
    /// Applied to `GET /journals` before answering.
    pub list_delay: Duration,
    /// Applied to `POST /auth/refresh` before answering.
    pub refresh_delay: Duration,
    /// When set, journal writes fail with 422 and this field error.
    pub reject_journal_writes: Option<(String, String)>,
    /// When set, `GET /journals` answers 503.
    pub fail_journal_lists: bool,
}

#[derive(Clone)]
pub struct Backend {
    data: Arc<Mutex<Data>>,
}

impl Backend {
    pub fn new() -> Self {
        let data = Data {
            access_token: "access-0".to_string(),
            refresh_token: "refresh-0".to_string(),
            rotations: 0,
            next_id: 100,
            user: User {
                id: 1,
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                email_verified: true,
                last_login_at: None,
                created_at: None,
                updated_at: None,
            },
            categories: vec![
                category(1, "Salary", EntryType::Income),
                category(2, "Food", EntryType::Expense),
            ],
            journals: Vec::new(),
            api_keys: Vec::new(),
            log: Vec::new(),
            list_delay: Duration::ZERO,
            refresh_delay: Duration::ZERO,
            reject_journal_writes: None,
            fail_journal_lists: false,
        };
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    pub fn data(&self) -> MutexGuard<'_, Data> {
        self.data.lock().unwrap()
    }

    /// How many logged requests match `entry` exactly (e.g. `GET /journals`).
    pub fn hits(&self, entry: &str) -> usize {
        self.data().log.iter().filter(|logged| *logged == entry).count()
    }

    pub fn log(&self) -> Vec<String> {
        self.data().log.clone()
    }

    /// Makes the access token the client holds stale.
    pub fn expire_access_token(&self) {
        self.data().access_token = "access-rotated-away".to_string();
    }

    pub fn insert_journal(&self, id: i64, category_id: Option<i64>, kind: EntryType, cents: i64) {
        self.data().journals.insert(0, journal(id, category_id, kind, cents));
    }

    fn record(&self, entry: &str) {
        self.data().log.push(entry.to_string());
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
        let expected = format!("Bearer {}", self.data().access_token);
        let given = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        if given == Some(expected.as_str()) {
            return Ok(());
        }
        Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "token expired".to_string(),
                fields: BTreeMap::new(),
            }),
        ))
    }

    fn next_id(&self) -> i64 {
        let mut data = self.data();
        data.next_id += 1;
        data.next_id
    }

    pub async fn spawn(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = router(self.clone());
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                eprintln!("mock backend failed: {err}");
            }
        });
        addr
    }
}

pub fn category(id: i64, name: &str, kind: EntryType) -> Category {
    Category {
        id,
        user_id: 1,
        name: name.to_string(),
        kind,
        description: String::new(),
        color: "#22c55e".to_string(),
        icon: "🏷".to_string(),
        is_active: true,
        created_at: None,
        updated_at: None,
        deleted_at: None,
    }
}

pub fn journal(id: i64, category_id: Option<i64>, kind: EntryType, cents: i64) -> Journal {
    Journal {
        id,
        user_id: 1,
        category_id,
        kind,
        amount: Amount::new(cents),
        title: format!("entry {id}"),
        description: String::new(),
        date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        payment_method: String::new(),
        location: String::new(),
        is_recurring: false,
        receipt_url: String::new(),
        category: None,
        created_at: None,
        updated_at: None,
        deleted_at: None,
    }
}

/// Test context with credentials the backend currently accepts.
pub async fn logged_in() -> (Kaizen, Backend) {
    let backend = Backend::new();
    let addr = backend.spawn().await;
    let kaizen = kaizen_for(addr, TokenStore::in_memory());
    {
        let data = backend.data();
        kaizen
            .tokens()
            .set_tokens(&data.access_token, &data.refresh_token)
            .unwrap();
    }
    (kaizen, backend)
}

pub fn kaizen_for(addr: SocketAddr, tokens: TokenStore) -> Kaizen {
    Kaizen::builder()
        .config(ClientConfig {
            base_url: format!("http://{addr}/api/v1"),
            token_path: None,
            ..ClientConfig::default()
        })
        .tokens(tokens)
        .build()
        .unwrap()
}

fn router(backend: Backend) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/logout-all", post(logout_all))
        .route("/auth/refresh", post(refresh))
        .route("/users/me", get(me).put(update_me))
        .route("/users/api-keys", get(list_api_keys).post(create_api_key))
        .route("/users/api-keys/{id}", axum::routing::delete(delete_api_key))
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/journals", get(list_journals).post(create_journal))
        .route("/journals/summary", get(summary))
        .route(
            "/journals/{id}",
            get(get_journal).put(update_journal).delete(delete_journal),
        )
        .with_state(backend);
    Router::new().nest("/api/v1", api)
}

fn auth_response(data: &Data) -> AuthResponse {
    AuthResponse {
        access_token: data.access_token.clone(),
        refresh_token: data.refresh_token.clone(),
        user: data.user.clone().into(),
    }
}

async fn login(State(backend): State<Backend>, Json(payload): Json<LoginRequest>) -> Reply<AuthResponse> {
    backend.record("POST /auth/login");
    if payload.password != PASSWORD {
        return reject(StatusCode::UNAUTHORIZED, "invalid credentials");
    }
    Ok(Json(auth_response(&backend.data())))
}

async fn register(
    State(backend): State<Backend>,
    Json(payload): Json<RegisterRequest>,
) -> Reply<AuthResponse> {
    backend.record("POST /auth/register");
    let mut data = backend.data();
    if payload.email == data.user.email {
        return reject(StatusCode::CONFLICT, "email already registered");
    }
    data.user.name = payload.name;
    data.user.email = payload.email;
    Ok(Json(auth_response(&data)))
}

async fn logout(State(backend): State<Backend>, headers: HeaderMap) -> Reply<MessageResponse> {
    backend.record("POST /auth/logout");
    backend.authorize(&headers)?;
    Ok(Json(MessageResponse {
        message: "logged out".to_string(),
    }))
}

async fn logout_all(State(backend): State<Backend>, headers: HeaderMap) -> Reply<MessageResponse> {
    backend.record("POST /auth/logout-all");
    backend.authorize(&headers)?;
    let mut data = backend.data();
    data.refresh_token = "refresh-revoked".to_string();
    Ok(Json(MessageResponse {
        message: "logged out everywhere".to_string(),
    }))
}

async fn refresh(
    State(backend): State<Backend>,
    Json(payload): Json<RefreshRequest>,
) -> Reply<TokenPair> {
    backend.record("POST /auth/refresh");
    let delay = backend.data().refresh_delay;
    tokio::time::sleep(delay).await;

    let mut data = backend.data();
    if payload.refresh_token != data.refresh_token {
        return reject(StatusCode::UNAUTHORIZED, "refresh token invalid");
    }
    data.rotations += 1;
    data.access_token = format!("access-{}", data.rotations);
    data.refresh_token = format!("refresh-{}", data.rotations);
    Ok(Json(TokenPair {
        access_token: data.access_token.clone(),
        refresh_token: data.refresh_token.clone(),
    }))
}

async fn me(State(backend): State<Backend>, headers: HeaderMap) -> Reply<User> {
    backend.record("GET /users/me");
    backend.authorize(&headers)?;
    Ok(Json(backend.data().user.clone()))
}

async fn update_me(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(payload): Json<ProfileUpdate>,
) -> Reply<User> {
    backend.record("PUT /users/me");
    backend.authorize(&headers)?;
    let mut data = backend.data();
    data.user.name = payload.name;
    Ok(Json(data.user.clone()))
}

async fn list_api_keys(State(backend): State<Backend>, headers: HeaderMap) -> Reply<Vec<ApiKey>> {
    backend.record("GET /users/api-keys");
    backend.authorize(&headers)?;
    Ok(Json(backend.data().api_keys.clone()))
}

async fn create_api_key(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(payload): Json<ApiKeyCreate>,
) -> Reply<ApiKeyCreated> {
    backend.record("POST /users/api-keys");
    backend.authorize(&headers)?;
    let id = backend.next_id();
    let secret = format!("kz_live_{id:08}_abcdefghijklmnop");
    backend.data().api_keys.push(ApiKey {
        id,
        name: payload.name.clone(),
        key: secret.clone(),
        expires_at: None,
        is_active: true,
        last_used_at: None,
        created_at: None,
        updated_at: None,
    });
    Ok(Json(ApiKeyCreated {
        id,
        name: payload.name,
        key: secret,
        expires_at: None,
        created_at: None,
    }))
}

async fn delete_api_key(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Reply<MessageResponse> {
    backend.record("DELETE /users/api-keys/{id}");
    backend.authorize(&headers)?;
    backend.data().api_keys.retain(|key| key.id != id);
    Ok(Json(MessageResponse {
        message: "api key revoked".to_string(),
    }))
}

async fn list_categories(State(backend): State<Backend>, headers: HeaderMap) -> Reply<Vec<Category>> {
    backend.record("GET /categories");
    backend.authorize(&headers)?;
    Ok(Json(backend.data().categories.clone()))
}

async fn get_category(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Reply<Category> {
    backend.record("GET /categories/{id}");
    backend.authorize(&headers)?;
    let found = backend
        .data()
        .categories
        .iter()
        .find(|category| category.id == id)
        .cloned();
    match found {
        Some(category) => Ok(Json(category)),
        None => reject(StatusCode::NOT_FOUND, "category not found"),
    }
}

async fn create_category(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(payload): Json<CategoryCreate>,
) -> Reply<Category> {
    backend.record("POST /categories");
    backend.authorize(&headers)?;
    let mut created = category(backend.next_id(), &payload.name, payload.kind);
    created.icon = payload.icon.unwrap_or_default();
    created.color = payload.color.unwrap_or_default();
    backend.data().categories.push(created.clone());
    Ok(Json(created))
}

async fn update_category(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryUpdate>,
) -> Reply<Category> {
    backend.record("PUT /categories/{id}");
    backend.authorize(&headers)?;
    let mut data = backend.data();
    let Some(category) = data.categories.iter_mut().find(|category| category.id == id) else {
        return reject(StatusCode::NOT_FOUND, "category not found");
    };
    if let Some(name) = payload.name {
        category.name = name;
    }
    if let Some(kind) = payload.kind {
        category.kind = kind;
    }
    Ok(Json(category.clone()))
}

async fn delete_category(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Reply<MessageResponse> {
    backend.record("DELETE /categories/{id}");
    backend.authorize(&headers)?;
    backend.data().categories.retain(|category| category.id != id);
    Ok(Json(MessageResponse {
        message: "category deleted".to_string(),
    }))
}

fn matches(journal: &Journal, filters: &JournalFilters) -> bool {
    filters.kind.is_none_or(|kind| journal.kind == kind)
        && filters
            .category_id
            .is_none_or(|id| journal.category_id == Some(id))
        && filters.start_date.is_none_or(|start| journal.date >= start)
        && filters.end_date.is_none_or(|end| journal.date <= end)
}

async fn list_journals(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Query(filters): Query<JournalFilters>,
) -> Reply<JournalListResponse> {
    backend.record("GET /journals");
    backend.authorize(&headers)?;
    let delay = backend.data().list_delay;
    tokio::time::sleep(delay).await;
    if backend.data().fail_journal_lists {
        return reject(StatusCode::SERVICE_UNAVAILABLE, "listing unavailable");
    }

    let page = filters.page.unwrap_or(1).max(1);
    let page_size = filters.page_size.unwrap_or(20).max(1);
    let data = backend.data();
    let matching: Vec<&Journal> = data
        .journals
        .iter()
        .filter(|journal| matches(journal, &filters))
        .collect();
    let journals = matching
        .iter()
        .skip(((page - 1) * page_size) as usize)
        .take(page_size as usize)
        .map(|journal| (*journal).clone())
        .collect();
    Ok(Json(JournalListResponse {
        journals,
        page,
        page_size,
        total_count: matching.len() as u64,
    }))
}

async fn get_journal(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Reply<Journal> {
    backend.record("GET /journals/{id}");
    backend.authorize(&headers)?;
    let found = backend
        .data()
        .journals
        .iter()
        .find(|journal| journal.id == id)
        .cloned();
    match found {
        Some(journal) => Ok(Json(journal)),
        None => reject(StatusCode::NOT_FOUND, "journal not found"),
    }
}

fn rejected_write(backend: &Backend) -> Option<(StatusCode, Json<ErrorResponse>)> {
    let (field, message) = backend.data().reject_journal_writes.clone()?;
    Some((
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            error: "validation failed".to_string(),
            fields: BTreeMap::from([(field, message)]),
        }),
    ))
}

async fn create_journal(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(payload): Json<JournalCreate>,
) -> Reply<Journal> {
    backend.record("POST /journals");
    backend.authorize(&headers)?;
    if let Some(rejection) = rejected_write(&backend) {
        return Err(rejection);
    }
    let kind = payload.kind.unwrap_or(EntryType::Expense);
    let mut created = journal(
        backend.next_id(),
        Some(payload.category_id),
        kind,
        payload.amount.cents(),
    );
    created.title = payload.title;
    if let Some(date) = payload.date {
        created.date = date;
    }
    backend.data().journals.insert(0, created.clone());
    Ok(Json(created))
}

async fn update_journal(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<JournalUpdate>,
) -> Reply<Journal> {
    backend.record("PUT /journals/{id}");
    backend.authorize(&headers)?;
    if let Some(rejection) = rejected_write(&backend) {
        return Err(rejection);
    }
    let mut data = backend.data();
    let Some(journal) = data.journals.iter_mut().find(|journal| journal.id == id) else {
        return reject(StatusCode::NOT_FOUND, "journal not found");
    };
    if let Some(amount) = payload.amount {
        journal.amount = amount;
    }
    if let Some(title) = payload.title {
        journal.title = title;
    }
    Ok(Json(journal.clone()))
}

async fn delete_journal(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Reply<MessageResponse> {
    backend.record("DELETE /journals/{id}");
    backend.authorize(&headers)?;
    let mut data = backend.data();
    let before = data.journals.len();
    data.journals.retain(|journal| journal.id != id);
    if data.journals.len() == before {
        return reject(StatusCode::NOT_FOUND, "journal not found");
    }
    Ok(Json(MessageResponse {
        message: "journal deleted".to_string(),
    }))
}

async fn summary(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Query(query): Query<SummaryQuery>,
) -> Reply<Summary> {
    backend.record("GET /journals/summary");
    backend.authorize(&headers)?;
    let filters = JournalFilters {
        start_date: query.start_date,
        end_date: query.end_date,
        ..JournalFilters::default()
    };
    let data = backend.data();
    let mut summary = Summary {
        start_date: query.start_date,
        end_date: query.end_date,
        ..Summary::default()
    };
    for journal in data.journals.iter().filter(|journal| matches(journal, &filters)) {
        match journal.kind {
            EntryType::Income => summary.total_income += journal.amount,
            EntryType::Expense => summary.total_expense += journal.amount,
        }
        summary.entry_count += 1;
    }
    summary.net_balance = summary.total_income - summary.total_expense;
    Ok(Json(summary))
}
