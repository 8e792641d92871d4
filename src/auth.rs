#![cfg(feature = "web")]

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::Engine;
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::{DashboardError, Result};

pub const SESSION_COOKIE: &str = "session";
const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds
const BASIC_REALM: &str = "Basic realm=\"dashboard\"";

/// Login form data
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// The one account allowed into the dashboard
///
/// Only an Argon2 hash of the password is kept in memory.
#[derive(Clone, Debug)]
pub struct Credentials {
    username: String,
    password_hash: String,
}

impl Credentials {
    /// Hash the configured password and keep the result
    ///
    /// # Errors
    /// * Returns an `Auth` error if the username is empty or hashing fails
    pub fn new(username: &str, password: &str) -> Result<Self> {
        if username.is_empty() || password.is_empty() {
            return Err(DashboardError::Auth(
                "username and password cannot be empty".to_string(),
            ));
        }
        Ok(Credentials {
            username: username.to_string(),
            password_hash: hash_password(password)?,
        })
    }

    /// Check a username/password pair against the configured account
    pub fn verify(&self, username: &str, password: &str) -> bool {
        if username != self.username {
            return false;
        }
        verify_password(password, &self.password_hash)
    }
}

/// Hash a password using Argon2
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DashboardError::Auth(format!("password hashing failed: {}", e)))
}

/// Verify a password against a stored hash; malformed hashes never match
fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// User session data
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub expires_at: SystemTime,
}

/// Active sessions keyed by session id
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::with_ttl(Duration::from_secs(SESSION_DURATION))
    }
}

impl SessionStore {
    pub fn with_ttl(ttl: Duration) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Create and store a new session, returning its id
    pub fn create(&self, username: &str) -> String {
        let session_id = Uuid::new_v4().to_string();
        let session = Session {
            user_id: username.to_string(),
            expires_at: SystemTime::now() + self.ttl,
        };

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|_, s| s.expires_at > SystemTime::now());
        sessions.insert(session_id.clone(), session);
        session_id
    }

    /// The username for a live session, or `None` if unknown or expired
    pub fn validate(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(session_id)
            .filter(|s| s.expires_at > SystemTime::now())
            .map(|s| s.user_id.clone())
    }

    pub fn remove(&self, session_id: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id);
    }
}

/// Decode an `Authorization: Basic ...` header into username and password
pub fn parse_basic_auth(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Serve the login page HTML
pub async fn serve_login_page() -> Html<&'static str> {
    Html(include_str!("./static/login.html"))
}

/// Handle login form submissions
///
/// Valid credentials get a session cookie and a redirect to the dashboard.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if state.credentials.verify(&form.username, &form.password) {
        let session_id = state.sessions.create(&form.username);
        info!("User {} logged in", form.username);
        let cookie = Cookie::build((SESSION_COOKIE, session_id))
            .path("/")
            .http_only(true);
        (jar.add(cookie), Redirect::to("/")).into_response()
    } else {
        warn!("Failed login attempt for {:?}", form.username);
        (StatusCode::UNAUTHORIZED, "Invalid username or password").into_response()
    }
}

/// Drop the session and clear the cookie
pub async fn handle_logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/login"),
    )
}

/// Authentication middleware
///
/// Accepts either a live session cookie or HTTP Basic credentials. Data and
/// chart endpoints answer 401 with a Basic challenge; pages redirect to the
/// login form.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.sessions.validate(cookie.value()).is_some() {
            return next.run(request).await;
        }
    }

    if let Some((username, password)) = parse_basic_auth(request.headers()) {
        if state.credentials.verify(&username, &password) {
            return next.run(request).await;
        }
    }

    let path = request.uri().path();
    if path.starts_with("/api/") || path.starts_with("/charts/") {
        let mut response = (StatusCode::UNAUTHORIZED, "Authentication required").into_response();
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_REALM));
        return response;
    }

    Redirect::to("/login").into_response()
}
