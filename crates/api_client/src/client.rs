//! Tally HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). One method per
//! backend endpoint; every method either returns the decoded resource or a
//! single `ApiError` carrying a human-readable message.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::blocking::RequestBuilder;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use tally_core::{
    Category, CategoryBudget, FixedItem, MonthKey, MonthPlan, NewFixedItem, NewTransaction, Transaction,
    User,
};

use crate::abort::AbortSignal;
use crate::auth::{delete_auth, load_auth, save_auth, AuthCredentials};

/// Tally API client (blocking). Clones share the connection pool and token.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::blocking::Client,
    api_base: String,
    token: Arc<RwLock<Option<String>>>,
    auth_path: Option<PathBuf>,
}

/// Error type for API operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Request never produced a response
    Network(String),
    /// 401; the cached token has already been dropped
    Unauthorized(String),
    /// Any other non-2xx status
    Http(u16, String),
    /// Response body did not match the expected shape
    Parse(String),
    /// Caller raised the abort signal
    Aborted,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Http(code, _) => Some(*code),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "{}", msg),
            ApiError::Http(_, msg) => write!(f, "{}", msg),
            ApiError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ApiError::Aborted => write!(f, "Request aborted"),
        }
    }
}

impl std::error::Error for ApiError {}

// ── Request / response bodies ───────────────────────────────────────

/// Registration payload.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// `/login` and `/register` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(alias = "access_token")]
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordReset {
    pub token: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VerificationStatus {
    #[serde(alias = "email_verified")]
    pub verified: bool,
}

/// One entry of a `PUT /budgets` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetInput {
    pub category: Category,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct MergeResult {
    #[serde(default)]
    pub updated: u64,
}

/// Bare resource or one wrapped in `{"data": ...}` / `{"user": ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Keyed {
        #[serde(alias = "user")]
        data: T,
    },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Keyed { data } => data,
            Envelope::Bare(value) => value,
        }
    }
}

const NO_BODY: Option<&'static ()> = None;

impl ApiClient {
    /// Client with no token. `api_base` is the prefix every path is joined
    /// to, e.g. `http://localhost:8000/api`.
    pub fn new(api_base: impl Into<String>) -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("tally/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
            auth_path: None,
        }
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        *self.token.write() = Some(token.into());
        self
    }

    /// Persist the token at `path`, picking up a saved one for the same
    /// API base.
    pub fn with_auth_file(mut self, path: PathBuf) -> Self {
        if let Some(creds) = load_auth(&path) {
            if creds.api_base == self.api_base {
                *self.token.write() = Some(creds.token);
            } else {
                log::debug!("saved token is for {}, not {}", creds.api_base, self.api_base);
            }
        }
        self.auth_path = Some(path);
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    fn store_token(&self, token: &str, email: Option<&str>) {
        *self.token.write() = Some(token.to_string());
        if let Some(path) = &self.auth_path {
            let mut creds = AuthCredentials::new(token.to_string(), self.api_base.clone());
            creds.email = email.map(String::from);
            if let Err(e) = save_auth(path, &creds) {
                log::warn!("could not save token: {}", e);
            }
        }
    }

    /// Drop the token from memory. The saved file goes too, but only when it
    /// holds the token that was in use.
    pub fn clear_token(&self) {
        let dropped = self.token.write().take();
        let (Some(path), Some(dropped)) = (&self.auth_path, dropped) else {
            return;
        };
        match load_auth(path) {
            Some(saved) if saved.token == dropped => {
                if let Err(e) = delete_auth(path) {
                    log::warn!("could not remove saved token: {}", e);
                }
            }
            Some(_) => log::debug!("keeping {}: it holds a different token", path.display()),
            None => {}
        }
    }

    // ── Auth ────────────────────────────────────────────────────────

    pub fn register(&self, user: &NewUser) -> Result<AuthResponse, ApiError> {
        let auth: AuthResponse = parse(self.call(Method::POST, "/register", &[], Some(user))?)?;
        self.store_token(&auth.token, Some(&auth.user.email));
        Ok(auth)
    }

    /// Log in and cache the returned token.
    pub fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let auth: AuthResponse = parse(self.call(Method::POST, "/login", &[], Some(&body))?)?;
        self.store_token(&auth.token, Some(&auth.user.email));
        Ok(auth)
    }

    /// Log out. The local token is dropped even if the call fails.
    pub fn logout(&self) -> Result<(), ApiError> {
        let result = self.call(Method::POST, "/logout", &[], NO_BODY);
        self.clear_token();
        result.map(|_| ())
    }

    pub fn current_user(&self) -> Result<User, ApiError> {
        parse_enveloped(self.call(Method::GET, "/user", &[], NO_BODY)?)
    }

    /// `current_user`, abandoned if `signal` is raised before the request is
    /// sent or before its result is handed back.
    pub fn current_user_with_abort(&self, signal: &AbortSignal) -> Result<User, ApiError> {
        if signal.is_aborted() {
            return Err(ApiError::Aborted);
        }
        let result = self.current_user();
        if signal.is_aborted() {
            log::debug!("discarding /user response after abort");
            return Err(ApiError::Aborted);
        }
        result
    }

    // ── Email verification / password reset ────────────────────────

    pub fn send_verification_email(&self) -> Result<String, ApiError> {
        let body = self.call(Method::POST, "/email/verification-notification", &[], NO_BODY)?;
        Ok(message_or(body, "Verification email sent"))
    }

    pub fn verification_status(&self) -> Result<VerificationStatus, ApiError> {
        parse(self.call(Method::GET, "/email/verification-status", &[], NO_BODY)?)
    }

    pub fn forgot_password(&self, email: &str) -> Result<String, ApiError> {
        let body = serde_json::json!({ "email": email });
        let resp = self.call(Method::POST, "/forgot-password", &[], Some(&body))?;
        Ok(message_or(resp, "Password reset link sent"))
    }

    pub fn reset_password(&self, reset: &PasswordReset) -> Result<String, ApiError> {
        let resp = self.call(Method::POST, "/reset-password", &[], Some(reset))?;
        Ok(message_or(resp, "Password has been reset"))
    }

    // ── Profile ─────────────────────────────────────────────────────

    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        parse_enveloped(self.call(Method::PUT, "/profile", &[], Some(update))?)
    }

    pub fn update_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        self.call(Method::PUT, "/profile/password", &[], Some(change))?;
        Ok(())
    }

    /// Replace the preference blob. Returns whatever the backend echoes
    /// back, `Null` for an empty response.
    pub fn update_preferences(&self, preferences: &serde_json::Value) -> Result<serde_json::Value, ApiError> {
        let body = serde_json::json!({ "preferences": preferences });
        let resp = self.call(Method::PUT, "/profile/preferences", &[], Some(&body))?;
        match resp {
            Some(_) => parse(resp),
            None => Ok(serde_json::Value::Null),
        }
    }

    /// Delete the account. The local token goes with it.
    pub fn delete_account(&self, password: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "password": password });
        self.call(Method::DELETE, "/profile", &[], Some(&body))?;
        self.clear_token();
        Ok(())
    }

    // ── Transactions ────────────────────────────────────────────────

    pub fn list_transactions(&self) -> Result<Vec<Transaction>, ApiError> {
        parse_enveloped(self.call(Method::GET, "/transactions", &[], NO_BODY)?)
    }

    pub fn create_transaction(&self, tx: &NewTransaction) -> Result<Transaction, ApiError> {
        parse_enveloped(self.call(Method::POST, "/transactions", &[], Some(tx))?)
    }

    pub fn update_transaction(&self, id: i64, tx: &NewTransaction) -> Result<Transaction, ApiError> {
        parse_enveloped(self.call(Method::PUT, &format!("/transactions/{}", id), &[], Some(tx))?)
    }

    pub fn delete_transaction(&self, id: i64) -> Result<(), ApiError> {
        self.call(Method::DELETE, &format!("/transactions/{}", id), &[], NO_BODY)?;
        Ok(())
    }

    // ── Budgets / month plan ────────────────────────────────────────

    pub fn get_budgets(&self, year: i32, month: u32) -> Result<Vec<CategoryBudget>, ApiError> {
        let query = month_query(year, month);
        parse_enveloped(self.call(Method::GET, "/budgets", &query, NO_BODY)?)
    }

    /// Replace the month's budgets with `items`.
    pub fn put_budgets(&self, year: i32, month: u32, items: &[BudgetInput]) -> Result<Vec<CategoryBudget>, ApiError> {
        let body = serde_json::json!({ "year": year, "month": month, "budgets": items });
        let resp = self.call(Method::PUT, "/budgets", &[], Some(&body))?;
        match resp {
            Some(_) => parse_enveloped(resp),
            None => Ok(Vec::new()),
        }
    }

    /// `None` when no plan has been saved for the month.
    pub fn get_month_plan(&self, year: i32, month: u32) -> Result<Option<MonthPlan>, ApiError> {
        let query = month_query(year, month);
        let resp = self.call(Method::GET, "/month-plan", &query, NO_BODY)?;
        if resp.is_none() {
            return Ok(None);
        }
        let plan = match parse::<serde_json::Value>(resp)? {
            serde_json::Value::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or_default()
            }
            other => other,
        };
        if plan.is_null() {
            return Ok(None);
        }
        serde_json::from_value(plan)
            .map(Some)
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    pub fn put_month_plan(&self, plan: &MonthPlan) -> Result<MonthPlan, ApiError> {
        parse_enveloped(self.call(Method::PUT, "/month-plan", &[], Some(plan))?)
    }

    // ── Fixed items ─────────────────────────────────────────────────

    pub fn list_fixed_items(&self) -> Result<Vec<FixedItem>, ApiError> {
        parse_enveloped(self.call(Method::GET, "/fixed-items", &[], NO_BODY)?)
    }

    pub fn create_fixed_item(&self, item: &NewFixedItem) -> Result<FixedItem, ApiError> {
        parse_enveloped(self.call(Method::POST, "/fixed-items", &[], Some(item))?)
    }

    pub fn update_fixed_item(&self, id: i64, item: &NewFixedItem) -> Result<FixedItem, ApiError> {
        parse_enveloped(self.call(Method::PUT, &format!("/fixed-items/{}", id), &[], Some(item))?)
    }

    pub fn delete_fixed_item(&self, id: i64) -> Result<(), ApiError> {
        self.call(Method::DELETE, &format!("/fixed-items/{}", id), &[], NO_BODY)?;
        Ok(())
    }

    /// Create the month's transaction from a fixed item.
    pub fn apply_fixed_item(&self, item: &FixedItem, month: MonthKey) -> Result<Transaction, ApiError> {
        self.create_transaction(&item.apply_to(month))
    }

    // ── Categories ──────────────────────────────────────────────────

    /// Rename every transaction in `from` to `into`.
    pub fn merge_categories(&self, from: &[Category], into: &Category) -> Result<MergeResult, ApiError> {
        let body = serde_json::json!({ "from": from, "to": into });
        let resp = self.call(Method::POST, "/categories/merge", &[], Some(&body))?;
        match resp {
            Some(_) => parse(resp),
            None => Ok(MergeResult::default()),
        }
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.api_base, path);
        let req = self.http.request(method, url).header("Accept", "application/json");
        match self.token.read().as_deref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send one request. `Ok(None)` for 204 or an empty body.
    fn call<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Option<String>, ApiError> {
        let mut req = self.request(method.clone(), path);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        log::debug!("{} {} -> {}", method, path, status);

        let text = response.text().map_err(|e| ApiError::Network(e.to_string()))?;

        if status == 401 {
            self.clear_token();
            return Err(ApiError::Unauthorized(extract_error_message(&text, status)));
        }
        if !(200..300).contains(&status) {
            return Err(ApiError::Http(status, extract_error_message(&text, status)));
        }
        if status == 204 || text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }
}

// ── Free functions ──────────────────────────────────────────────────

/// Human-readable message from an error body: `message`, then `error`,
/// then the JSON itself, then the raw text.
pub fn extract_error_message(body: &str, status: u16) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("Request failed with status {}", status);
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(json) => ["message", "error"]
            .iter()
            .find_map(|key| json.get(key).and_then(|v| v.as_str()).map(String::from))
            .unwrap_or_else(|| json.to_string()),
        Err(_) => trimmed.to_string(),
    }
}

fn parse<T: DeserializeOwned>(body: Option<String>) -> Result<T, ApiError> {
    let text = body.ok_or_else(|| ApiError::Parse("empty response body".into()))?;
    serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
}

fn parse_enveloped<T: DeserializeOwned>(body: Option<String>) -> Result<T, ApiError> {
    parse::<Envelope<T>>(body).map(Envelope::into_inner)
}

fn message_or(body: Option<String>, default: &str) -> String {
    body.and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok())
        .and_then(|json| json.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| default.to_string())
}

fn month_query(year: i32, month: u32) -> Vec<(&'static str, String)> {
    vec![("year", year.to_string()), ("month", month.to_string())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tally_core::TxType;

    fn user_json() -> serde_json::Value {
        serde_json::json!({
            "id": 1,
            "name": "Ana",
            "email": "ana@example.com",
            "email_verified_at": null,
            "preferences": {}
        })
    }

    fn tx_json(id: i64, amount: &str, category: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "type": "expense",
            "amount": amount,
            "date": "2024-01-05",
            "category": category,
            "description": null
        })
    }

    // ── Error message extraction ────────────────────────────────────

    #[test]
    fn test_extract_error_message() {
        assert_eq!(extract_error_message(r#"{"message":"Bad","error":"x"}"#, 422), "Bad");
        assert_eq!(extract_error_message(r#"{"error":"Nope"}"#, 400), "Nope");
        assert_eq!(extract_error_message(r#"{"errors":{"email":["taken"]}}"#, 422), r#"{"errors":{"email":["taken"]}}"#);
        assert_eq!(extract_error_message("<h1>Bad Gateway</h1>", 502), "<h1>Bad Gateway</h1>");
        assert_eq!(extract_error_message("", 500), "Request failed with status 500");
    }

    // ── Auth ────────────────────────────────────────────────────────

    #[test]
    fn test_login_stores_token_and_sends_bearer() {
        let server = MockServer::start();

        let login_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/login")
                .json_body(serde_json::json!({ "email": "ana@example.com", "password": "pw" }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({ "token": "tok-1", "user": user_json() }));
        });

        let user_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/user")
                .header("Authorization", "Bearer tok-1");
            then.status(200).json_body(user_json());
        });

        let dir = tempfile::tempdir().unwrap();
        let auth_path = dir.path().join("auth.json");
        let client = ApiClient::new(server.base_url()).with_auth_file(auth_path.clone());
        assert!(!client.is_authenticated());

        let auth = client.login("ana@example.com", "pw").unwrap();
        assert_eq!(auth.user.email, "ana@example.com");
        assert_eq!(client.token().as_deref(), Some("tok-1"));
        assert_eq!(load_auth(&auth_path).unwrap().token, "tok-1");

        let user = client.current_user().unwrap();
        assert_eq!(user.name, "Ana");

        login_mock.assert();
        user_mock.assert();
    }

    #[test]
    fn test_unauthorized_clears_token() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(GET).path("/user");
            then.status(401)
                .json_body(serde_json::json!({ "message": "Unauthenticated." }));
        });

        let dir = tempfile::tempdir().unwrap();
        let auth_path = dir.path().join("auth.json");
        save_auth(&auth_path, &AuthCredentials::new("stale".into(), server.base_url())).unwrap();

        let client = ApiClient::new(server.base_url()).with_auth_file(auth_path.clone());
        assert_eq!(client.token().as_deref(), Some("stale"));

        let err = client.current_user().unwrap_err();
        assert_eq!(err, ApiError::Unauthorized("Unauthenticated.".into()));
        assert_eq!(err.to_string(), "Unauthenticated.");
        assert!(client.token().is_none());
        assert!(!auth_path.exists());
    }

    #[test]
    fn test_unauthorized_keeps_file_with_other_token() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(GET).path("/user");
            then.status(401)
                .json_body(serde_json::json!({ "message": "Unauthenticated." }));
        });

        let dir = tempfile::tempdir().unwrap();
        let auth_path = dir.path().join("auth.json");
        save_auth(&auth_path, &AuthCredentials::new("saved".into(), server.base_url())).unwrap();

        // An explicit token takes precedence over the saved one.
        let client = ApiClient::new(server.base_url())
            .with_auth_file(auth_path.clone())
            .with_token("from-env");

        let err = client.current_user().unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(client.token().is_none());
        assert_eq!(load_auth(&auth_path).unwrap().token, "saved");
    }

    #[test]
    fn test_saved_token_for_other_base_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let auth_path = dir.path().join("auth.json");
        save_auth(&auth_path, &AuthCredentials::new("tok".into(), "http://elsewhere/api".into())).unwrap();

        let client = ApiClient::new("http://localhost:8000/api/").with_auth_file(auth_path);
        assert_eq!(client.api_base(), "http://localhost:8000/api");
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_logout_clears_token_even_on_error() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(POST).path("/logout");
            then.status(500).body("boom");
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        let err = client.logout().unwrap_err();
        assert_eq!(err, ApiError::Http(500, "boom".into()));
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_current_user_with_abort() {
        let server = MockServer::start();

        let user_mock = server.mock(|when, then| {
            when.method(GET).path("/user");
            then.status(200).json_body(serde_json::json!({ "user": user_json() }));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");

        let signal = AbortSignal::new();
        let user = client.current_user_with_abort(&signal).unwrap();
        assert_eq!(user.id, 1);
        user_mock.assert();

        signal.abort();
        assert_eq!(client.current_user_with_abort(&signal).unwrap_err(), ApiError::Aborted);
    }

    // ── Resources ───────────────────────────────────────────────────

    #[test]
    fn test_list_transactions_accepts_wrapped_list() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(GET).path("/transactions");
            then.status(200).json_body(serde_json::json!({
                "data": [tx_json(1, "12.50", "food"), tx_json(2, "3", "rent")]
            }));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        let txs = client.list_transactions().unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].amount, 12.5);
        assert_eq!(txs[1].category().as_str(), "Rent");
    }

    #[test]
    fn test_create_transaction_posts_payload() {
        let server = MockServer::start();

        let payload = NewTransaction {
            tx_type: TxType::Expense,
            amount: 12.5,
            date: "2024-01-05".into(),
            category: Some("Food".into()),
            description: None,
        };

        let create_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/transactions")
                .json_body(serde_json::to_value(&payload).unwrap());
            then.status(201).json_body(tx_json(7, "12.5", "Food"));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        let tx = client.create_transaction(&payload).unwrap();
        create_mock.assert();
        assert_eq!(tx.id, 7);
    }

    #[test]
    fn test_delete_with_no_content() {
        let server = MockServer::start();

        let delete_mock = server.mock(|when, then| {
            when.method(DELETE).path("/transactions/7");
            then.status(204);
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        client.delete_transaction(7).unwrap();
        delete_mock.assert();
    }

    #[test]
    fn test_validation_error_message() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(PUT).path("/transactions/3");
            then.status(422)
                .json_body(serde_json::json!({ "message": "The amount field is required." }));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        let payload = NewTransaction {
            tx_type: TxType::Income,
            amount: 0.0,
            date: "2024-01-01".into(),
            category: None,
            description: None,
        };
        let err = client.update_transaction(3, &payload).unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.to_string(), "The amount field is required.");
        assert!(client.is_authenticated());
    }

    #[test]
    fn test_budgets_query_by_month() {
        let server = MockServer::start();

        let budgets_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/budgets")
                .query_param("year", "2024")
                .query_param("month", "3");
            then.status(200).json_body(serde_json::json!([
                { "year": 2024, "month": 3, "category": "food", "amount": "200.00" }
            ]));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        let budgets = client.get_budgets(2024, 3).unwrap();
        budgets_mock.assert();
        assert_eq!(budgets[0].category.as_str(), "Food");
        assert_eq!(budgets[0].amount, 200.0);
    }

    #[test]
    fn test_missing_month_plan_is_none() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(GET).path("/month-plan");
            then.status(200).body("null");
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        assert_eq!(client.get_month_plan(2024, 1).unwrap(), None);
    }

    #[test]
    fn test_wrapped_null_month_plan_is_none() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(GET).path("/month-plan");
            then.status(200).json_body(serde_json::json!({ "data": null }));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        assert_eq!(client.get_month_plan(2024, 1).unwrap(), None);
    }

    #[test]
    fn test_wrapped_month_plan() {
        let server = MockServer::start();

        let plan_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/month-plan")
                .query_param("year", "2024")
                .query_param("month", "2");
            then.status(200).json_body(serde_json::json!({
                "data": { "year": 2024, "month": 2, "expected_income": "3100.00" }
            }));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        let plan = client.get_month_plan(2024, 2).unwrap().unwrap();
        plan_mock.assert();
        assert_eq!(plan, MonthPlan { year: 2024, month: 2, expected_income: 3100.0 });
    }

    #[test]
    fn test_malformed_month_plan_is_parse_error() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(GET).path("/month-plan");
            then.status(200).json_body(serde_json::json!({ "data": { "year": 2024 } }));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        assert!(matches!(client.get_month_plan(2024, 1), Err(ApiError::Parse(_))));
    }

    #[test]
    fn test_update_fixed_item_puts_payload() {
        let server = MockServer::start();

        let payload = NewFixedItem {
            description: Some("Rent".into()),
            category: Some("Housing".into()),
            amount: 950.0,
            tx_type: TxType::Expense,
        };

        let update_mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/fixed-items/5")
                .json_body(serde_json::json!({
                    "description": "Rent",
                    "category": "Housing",
                    "amount": 950.0,
                    "type": "expense"
                }));
            then.status(200).json_body(serde_json::json!({
                "data": {
                    "id": 5, "description": "Rent", "category": "Housing",
                    "amount": "950.00", "type": "expense"
                }
            }));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        let item = client.update_fixed_item(5, &payload).unwrap();
        update_mock.assert();
        assert_eq!(item.id, 5);
        assert_eq!(item.amount, 950.0);
    }

    #[test]
    fn test_apply_fixed_item_creates_dated_transaction() {
        let server = MockServer::start();

        let item = FixedItem {
            id: 4,
            description: Some("Rent".into()),
            category: Some("housing".into()),
            amount: 900.0,
            tx_type: TxType::Expense,
        };

        let create_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/transactions")
                .json_body(serde_json::json!({
                    "type": "expense",
                    "amount": 900.0,
                    "date": "2024-06-01",
                    "category": "Housing",
                    "description": "Rent"
                }));
            then.status(201).json_body(serde_json::json!({
                "id": 50, "type": "expense", "amount": 900, "date": "2024-06-01",
                "category": "Housing", "description": "Rent"
            }));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        let month = MonthKey::new(2024, 6).unwrap();
        let tx = client.apply_fixed_item(&item, month).unwrap();
        create_mock.assert();
        assert_eq!(tx.date, "2024-06-01");
    }

    #[test]
    fn test_merge_categories() {
        let server = MockServer::start();

        let merge_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/categories/merge")
                .json_body(serde_json::json!({ "from": ["Groceries", "Supermarket"], "to": "Food" }));
            then.status(200).json_body(serde_json::json!({ "updated": 12 }));
        });

        let client = ApiClient::new(server.base_url()).with_token("tok");
        let result = client
            .merge_categories(&[Category::new("groceries"), Category::new("supermarket")], &Category::new("food"))
            .unwrap();
        merge_mock.assert();
        assert_eq!(result.updated, 12);
    }

    #[test]
    fn test_network_error() {
        // Port 9 (discard) is not listening in test environments.
        let client = ApiClient::new("http://127.0.0.1:9");
        assert!(matches!(client.current_user(), Err(ApiError::Network(_))));
    }
}
