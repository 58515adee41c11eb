// 🌐 Web front end - HTML forms + a small JSON API over the Bank
//
// Sessions travel in a signed cookie; the username is never taken from
// the query string. Store work runs on the blocking pool.

use crate::bank::Bank;
use crate::config::ServerConfig;
use crate::entities::{Account, LedgerEntry, Registration};
use crate::error::BankError;
use crate::money::Amount;
use crate::mutator::Receipt;
use crate::render;
use crate::session::{self, SessionKeys};
use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bank: Bank,
    pub sessions: SessionKeys,
    pub session_ttl_secs: i64,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(bank: Bank, sessions: SessionKeys, session_ttl_secs: i64, static_dir: PathBuf) -> Self {
        AppState {
            bank,
            sessions: sessions.with_ttl(chrono::Duration::seconds(session_ttl_secs)),
            session_ttl_secs,
            static_dir,
        }
    }

    fn current_user(&self, headers: &HeaderMap) -> Option<String> {
        let cookie = headers.get(header::COOKIE)?.to_str().ok()?;
        let token = session::token_from_cookie_header(cookie)?;
        self.sessions.verify(token)
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct AmountForm {
    #[serde(default)]
    amount: String,
}

#[derive(Deserialize)]
struct AmountRequest {
    amount: serde_json::Value,
}

#[derive(Deserialize, Default)]
struct DashboardQuery {
    error: Option<String>,
}

#[derive(Serialize)]
struct StatementResponse {
    account: Account,
    entries: Vec<LedgerEntry>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Run store work off the async runtime
async fn blocking<T, F>(f: F) -> Result<T, BankError>
where
    F: FnOnce() -> Result<T, BankError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BankError::StoreUnavailable(format!("worker failed: {}", e)))?
}

fn database_error(err: &BankError) -> Response {
    tracing::error!(error = %err, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
}

fn dashboard_with_error(message: &str) -> Response {
    // Form-style encoding: spaces as '+'
    let encoded = urlencoding::encode(message).replace("%20", "+");
    Redirect::to(&format!("/dashboard?error={}", encoded)).into_response()
}

fn to_login() -> Response {
    Redirect::to("/login").into_response()
}

fn api_status(err: &BankError) -> StatusCode {
    match err {
        BankError::InvalidAmount | BankError::Validation(_) => StatusCode::BAD_REQUEST,
        BankError::InsufficientFunds => StatusCode::UNPROCESSABLE_ENTITY,
        BankError::DuplicateUsername => StatusCode::CONFLICT,
        BankError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        BankError::AccountNotFound => StatusCode::NOT_FOUND,
        BankError::StoreUnavailable(_) | BankError::Credential(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: &BankError) -> Response {
    if !err.is_user_correctable() {
        tracing::error!(error = %err, "api request failed");
    }
    (api_status(err), Json(ApiResponse::failure(err.user_message()))).into_response()
}

fn api_unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::failure("Not logged in".to_string())),
    )
        .into_response()
}

// ============================================================================
// Page Handlers
// ============================================================================

/// GET / - everything starts at the login page
async fn home() -> Response {
    to_login()
}

/// GET /register
async fn register_form() -> Html<String> {
    Html(render::register_page(None))
}

/// POST /register
async fn register_submit(State(state): State<AppState>, Form(form): Form<Registration>) -> Response {
    let bank = state.bank.clone();
    match blocking(move || bank.register(&form)).await {
        Ok(_) => to_login(),
        Err(e) if e.is_user_correctable() => Html(render::register_page(Some(&e.user_message()))).into_response(),
        Err(e) => database_error(&e),
    }
}

/// GET /login
async fn login_form() -> Html<String> {
    Html(render::login_page(None))
}

/// POST /login
async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let bank = state.bank.clone();
    let LoginForm { username, password } = form;

    match blocking(move || bank.authenticate(&username, &password)).await {
        Ok(account) => match state.sessions.issue(&account.username) {
            Ok(token) => {
                let cookie = session::session_cookie(&token, state.session_ttl_secs);
                ([(header::SET_COOKIE, cookie)], Redirect::to("/dashboard")).into_response()
            }
            Err(e) => database_error(&e),
        },
        Err(e) if e.is_user_correctable() => {
            Html(render::login_page(Some(&BankError::InvalidCredentials.user_message()))).into_response()
        }
        Err(e) => database_error(&e),
    }
}

/// GET /logout
async fn logout() -> Response {
    ([(header::SET_COOKIE, session::clear_cookie())], Redirect::to("/login")).into_response()
}

/// GET /dashboard - profile, balance and deposit/withdraw forms
async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let Some(username) = state.current_user(&headers) else {
        return to_login();
    };

    let bank = state.bank.clone();
    match blocking(move || bank.account(&username)).await {
        Ok(account) => Html(render::dashboard_page(&account, query.error.as_deref())).into_response(),
        Err(BankError::AccountNotFound) => to_login(),
        Err(e) => database_error(&e),
    }
}

async fn mutate_from_form(state: AppState, headers: HeaderMap, amount: String, is_withdrawal: bool) -> Response {
    let Some(username) = state.current_user(&headers) else {
        return to_login();
    };

    let bank = state.bank.clone();
    let result = blocking(move || {
        if is_withdrawal {
            bank.withdraw(&username, amount.as_str())
        } else {
            bank.deposit(&username, amount.as_str())
        }
    })
    .await;

    match result {
        Ok(_) => Redirect::to("/dashboard").into_response(),
        Err(BankError::AccountNotFound) => to_login(),
        Err(e) if e.is_user_correctable() => dashboard_with_error(&e.user_message()),
        Err(e) => database_error(&e),
    }
}

/// POST /deposit
async fn deposit(State(state): State<AppState>, headers: HeaderMap, Form(form): Form<AmountForm>) -> Response {
    mutate_from_form(state, headers, form.amount, false).await
}

/// POST /withdraw
async fn withdraw(State(state): State<AppState>, headers: HeaderMap, Form(form): Form<AmountForm>) -> Response {
    mutate_from_form(state, headers, form.amount, true).await
}

/// GET /history - ledger, most recent first
async fn history(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(username) = state.current_user(&headers) else {
        return to_login();
    };

    let bank = state.bank.clone();
    match blocking(move || bank.statement(&username)).await {
        Ok((account, entries)) => Html(render::history_page(&account, &entries)).into_response(),
        Err(BankError::AccountNotFound) => to_login(),
        Err(e) => database_error(&e),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/me - account of the logged-in user
async fn api_me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(username) = state.current_user(&headers) else {
        return api_unauthorized();
    };

    let bank = state.bank.clone();
    match blocking(move || bank.account(&username)).await {
        Ok(account) => Json(ApiResponse::ok(account)).into_response(),
        Err(e) => api_error(&e),
    }
}

/// GET /api/me/history
async fn api_history(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(username) = state.current_user(&headers) else {
        return api_unauthorized();
    };

    let bank = state.bank.clone();
    match blocking(move || bank.statement(&username)).await {
        Ok((account, entries)) => Json(ApiResponse::ok(StatementResponse { account, entries })).into_response(),
        Err(e) => api_error(&e),
    }
}

/// Accepts `{"amount": "12.50"}` or `{"amount": 12.5}`
fn amount_from_json(value: &serde_json::Value) -> Result<Amount, BankError> {
    match value {
        serde_json::Value::String(raw) => Amount::parse(raw),
        serde_json::Value::Number(n) => Amount::parse(&n.to_string()),
        _ => Err(BankError::InvalidAmount),
    }
}

async fn api_mutate(state: AppState, headers: HeaderMap, request: AmountRequest, is_withdrawal: bool) -> Response {
    let Some(username) = state.current_user(&headers) else {
        return api_unauthorized();
    };

    let amount = match amount_from_json(&request.amount) {
        Ok(amount) => amount,
        Err(e) => return api_error(&e),
    };

    let bank = state.bank.clone();
    let result: Result<Receipt, BankError> = blocking(move || {
        if is_withdrawal {
            bank.withdraw(&username, amount)
        } else {
            bank.deposit(&username, amount)
        }
    })
    .await;

    match result {
        Ok(receipt) => Json(ApiResponse::ok(receipt)).into_response(),
        Err(e) => api_error(&e),
    }
}

/// POST /api/me/deposit
async fn api_deposit(State(state): State<AppState>, headers: HeaderMap, Json(request): Json<AmountRequest>) -> Response {
    api_mutate(state, headers, request, false).await
}

/// POST /api/me/withdraw
async fn api_withdraw(State(state): State<AppState>, headers: HeaderMap, Json(request): Json<AmountRequest>) -> Response {
    api_mutate(state, headers, request, true).await
}

// ============================================================================
// Router & Server
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/me", get(api_me))
        .route("/me/history", get(api_history))
        .route("/me/deposit", post(api_deposit))
        .route("/me/withdraw", post(api_withdraw));

    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/", get(home))
        .route("/register", get(register_form).post(register_submit))
        .route("/login", get(login_form).post(login_submit))
        .route("/logout", get(logout))
        .route("/dashboard", get(dashboard))
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        .route("/history", get(history))
        .nest("/api", api_routes)
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    tracing::info!("shutting down");
}

/// Open the store, build the router and serve until ctrl-c
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let bank = Bank::open(&config.store.db, config.store.store_options())
        .with_context(|| format!("failed to open database {}", config.store.db.display()))?;

    let sessions = match &config.session_secret {
        Some(secret) => SessionKeys::new(secret),
        None => {
            tracing::warn!("no session secret configured, sessions end when the server stops");
            SessionKeys::generate()
        }
    };

    let state = AppState::new(bank, sessions, config.session_ttl_secs, config.static_dir.clone());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!(addr = %config.bind, db = %config.store.db.display(), "server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
