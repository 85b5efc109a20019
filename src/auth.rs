//! Sign-in state.
//!
//! A request carries at most one session cookie. It resolves once per
//! request into a [`SessionState`]; screens take [`AuthUser`] and an absent
//! session becomes a 401, which the single catcher mounted in `main` turns
//! into a redirect to the login page.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Local;
use password_hash::SaltString;
use rand_core::OsRng;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::models::User;

pub const SESSION_COOKIE: &str = "session";
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Issues a new token for `user_id`, keeping only the newest `keep` sessions.
pub fn start_session(conn: &Connection, user_id: i64, keep: i64) -> rusqlite::Result<String> {
    let token = Uuid::new_v4().to_string();
    let created_at = Local::now().to_rfc3339();
    db::create_session(conn, user_id, &token, &created_at)?;
    db::prune_sessions(conn, user_id, keep)?;
    Ok(token)
}

pub fn set_session_cookie(cookies: &CookieJar<'_>, token: String) {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookies.add(cookie);
}

pub fn clear_session_cookie(cookies: &CookieJar<'_>) {
    cookies.remove(Cookie::build(SESSION_COOKIE).path("/"));
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Present(User),
    Absent,
}

impl SessionState {
    pub fn resolve(pool: &DbPool, cookies: &CookieJar<'_>) -> SessionState {
        let Some(cookie) = cookies.get(SESSION_COOKIE) else {
            return SessionState::Absent;
        };
        let conn = match pool.get() {
            Ok(conn) => conn,
            Err(err) => {
                log::warn!("session lookup skipped: {err}");
                return SessionState::Absent;
            }
        };
        match db::user_by_session(&conn, cookie.value()) {
            Ok(Some(user)) => SessionState::Present(user),
            Ok(None) => SessionState::Absent,
            Err(err) => {
                log::warn!("session lookup failed: {err}");
                SessionState::Absent
            }
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Present(user) => Some(user),
            SessionState::Absent => None,
        }
    }
}

/// Guard for every signed-in screen.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let state = request.local_cache(|| match request.rocket().state::<DbPool>() {
            Some(pool) => SessionState::resolve(pool, request.cookies()),
            None => SessionState::Absent,
        });
        match state.user() {
            Some(user) => Outcome::Success(AuthUser(user.clone())),
            None => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}
