use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

use axum::{
    Form, Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use lazy_static::lazy_static;
use log::info;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::GateError;
use crate::ratelimit::LOGIN_LIMIT;

/// An authenticated coordinator session
///
/// Created on login and removed again after one successful record update:
/// one scan per authentication is the deliberate policy, not a bug.
#[derive(Debug, Clone)]
pub struct Session {
    pub coordinator_name: String,
    pub coordinator_id: String,
    pub expires_at: SystemTime,
}

/// Global session storage, keyed by the cookie value.
lazy_static! {
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());
}

const SESSION_COOKIE: &str = "session";
const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// Static coordinator credential table (name -> coordinator id).
const COORDINATORS: [(&str, &str); 4] = [
    ("Soumya", "PCE001"),
    ("Ankit", "PCE002"),
    ("Riya", "PCE003"),
    ("Devraj", "PCE004"),
];

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub name: String,
    pub coordinator_id: String,
}

/// Check a name/id pair against the credential table.
pub fn verify_coordinator(name: &str, coordinator_id: &str) -> bool {
    COORDINATORS
        .iter()
        .any(|(n, id)| *n == name && *id == coordinator_id)
}

/// Create a session for an authenticated coordinator
///
/// # Returns
/// * `String` - A unique session ID for the cookie
pub fn create_session(name: &str, coordinator_id: &str) -> String {
    let session_id = Uuid::new_v4().to_string();
    let session = Session {
        coordinator_name: name.to_string(),
        coordinator_id: coordinator_id.to_string(),
        expires_at: SystemTime::now() + Duration::from_secs(SESSION_DURATION),
    };

    let mut sessions = SESSIONS.write().unwrap();
    sessions.insert(session_id.clone(), session);

    session_id
}

/// Validate a session cookie value
///
/// # Returns
/// * `Option<Session>` - The session if present and not expired
pub fn validate_session(session_id: &str) -> Option<Session> {
    let sessions = SESSIONS.read().unwrap();

    sessions
        .get(session_id)
        .filter(|s| s.expires_at > SystemTime::now())
        .cloned()
}

/// Remove a session, forcing a fresh login before the next scan.
pub fn clear_session(session_id: &str) {
    let mut sessions = SESSIONS.write().unwrap();
    sessions.remove(session_id);
}

// Web handlers below.

/// Serve the login page
pub async fn serve_login_page() -> Html<&'static str> {
    Html(include_str!("./static/login.html"))
}

/// Whether the client is a browser-style caller that wants a page back.
/// No Accept header at all is treated as a browser.
fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html") || v.contains("*/*"))
        .unwrap_or(true)
}

/// Handle a coordinator login form submission
///
/// Validates the name/id pair against the credential table; success sets the
/// session cookie and redirects to the scan page. On failure, browser
/// clients are redirected back to the login page with an error flag while
/// API-style clients get a plain 401.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if !state
        .limiter
        .allow(&addr.ip().to_string(), "login", LOGIN_LIMIT)
    {
        return GateError::RateLimited.into_response();
    }

    let name = form.name.trim();
    let coordinator_id = form.coordinator_id.trim();

    if verify_coordinator(name, coordinator_id) {
        let session_id = create_session(name, coordinator_id);
        let cookie = Cookie::new(SESSION_COOKIE, session_id);
        info!("Coordinator {} logged in", name);
        (jar.add(cookie), Redirect::to("/scan")).into_response()
    } else {
        info!("Failed login attempt for '{}'", name);
        if accepts_html(&headers) {
            Redirect::to("/login?error=invalid").into_response()
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "Invalid Name or ID" })),
            )
                .into_response()
        }
    }
}

/// Handle logout: drop the session and its cookie, back to login.
pub async fn handle_logout(jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        clear_session(cookie.value());
    }

    (
        jar.remove(Cookie::from(SESSION_COOKIE)),
        Redirect::to("/login"),
    )
}

/// Authentication middleware
///
/// A valid session cookie lets the request through with the session (and its
/// cookie value) attached as extensions. Without one, JSON endpoints get a
/// 401 and page requests a redirect to the login page.
pub async fn require_auth(
    jar: CookieJar,
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        if let Some(session) = validate_session(session_cookie.value()) {
            let session_id = session_cookie.value().to_string();
            request.extensions_mut().insert(session);
            request.extensions_mut().insert(SessionId(session_id));
            return next.run(request).await;
        }
    }

    match request.uri().path() {
        "/fetch" | "/update" => GateError::AuthenticationRequired.into_response(),
        _ => Redirect::to("/login").into_response(),
    }
}

/// Cookie value of the current session, carried alongside the session so the
/// update handler can clear exactly the session it served.
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_known_and_unknown_coordinators() {
        assert!(verify_coordinator("Soumya", "PCE001"));
        assert!(verify_coordinator("Riya", "PCE003"));
        assert!(!verify_coordinator("Soumya", "PCE002"));
        assert!(!verify_coordinator("Mallory", "PCE001"));
    }

    #[test]
    fn session_roundtrip_and_clear() {
        let id = create_session("Ankit", "PCE002");

        let session = validate_session(&id).expect("fresh session should validate");
        assert_eq!(session.coordinator_name, "Ankit");
        assert_eq!(session.coordinator_id, "PCE002");

        clear_session(&id);
        assert!(validate_session(&id).is_none());
    }

    #[test]
    fn unknown_session_id_is_rejected() {
        assert!(validate_session("not-a-session").is_none());
    }

    #[test]
    fn accept_header_distinguishes_browsers_from_api_clients() {
        let mut headers = HeaderMap::new();
        assert!(accepts_html(&headers), "no Accept header means browser");

        headers.insert(header::ACCEPT, "text/html,application/xhtml+xml".parse().unwrap());
        assert!(accepts_html(&headers));

        headers.insert(header::ACCEPT, "*/*".parse().unwrap());
        assert!(accepts_html(&headers));

        headers.insert(header::ACCEPT, "application/json".parse().unwrap());
        assert!(!accepts_html(&headers), "JSON-only clients should get a 401");
    }
}
