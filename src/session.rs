//! Visitor session identity carried in cookies.
//!
//! `session_id` holds a UUID v4 that correlates anonymous carts, orders and
//! customer profiles. `customer_auth` marks a session that completed login or
//! registration. Both share the same lifetime and flags.

use std::{convert::Infallible, sync::LazyLock};

use axum::{
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponseParts, ResponseParts},
};
use cookie::{Cookie, SameSite, time::Duration};
use regex::Regex;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session_id";
pub const AUTH_COOKIE: &str = "customer_auth";
pub const SESSION_MAX_AGE_DAYS: i64 = 30;

static SESSION_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("Invalid regex")
});

/// Raw value of a named cookie from the request headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw.to_owned()))
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

/// Raw `session_id` cookie value, unvalidated.
pub fn read(headers: &HeaderMap) -> Option<String> {
    read_cookie(headers, SESSION_COOKIE)
}

/// Strict 8-4-4-4-12 hex check. Braced, URN and hyphenless forms are rejected.
pub fn is_valid_session_id(value: &str) -> bool {
    SESSION_ID_RE.is_match(value)
}

pub fn parse_session_id(value: &str) -> Option<Uuid> {
    if !is_valid_session_id(value) {
        return None;
    }
    Uuid::parse_str(value).ok()
}

pub fn new_session_id() -> Uuid {
    Uuid::new_v4()
}

/// Cookies to append to a response as `Set-Cookie` headers.
#[derive(Debug, Default, Clone)]
pub struct CookieUpdates(Vec<Cookie<'static>>);

impl CookieUpdates {
    pub fn cookies(&self) -> &[Cookie<'static>] {
        &self.0
    }

    pub fn push(&mut self, cookie: Cookie<'static>) {
        self.0.push(cookie);
    }
}

impl IntoResponseParts for CookieUpdates {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        for cookie in self.0 {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    res.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(err) => tracing::warn!(error = %err, cookie = cookie.name(), "unencodable cookie"),
            }
        }
        Ok(res)
    }
}

fn durable_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::days(SESSION_MAX_AGE_DAYS))
        .build()
}

pub fn session_id_cookie(session_id: Uuid, secure: bool) -> Cookie<'static> {
    durable_cookie(SESSION_COOKIE, session_id.to_string(), secure)
}

/// `session_id` plus the `customer_auth` marker.
pub fn session_cookies(session_id: Uuid, secure: bool) -> CookieUpdates {
    CookieUpdates(vec![
        session_id_cookie(session_id, secure),
        durable_cookie(AUTH_COOKIE, "true".to_string(), secure),
    ])
}

/// Removes `customer_auth`; `session_id` is left alone.
pub fn clear_auth_cookie(secure: bool) -> CookieUpdates {
    let mut cookie = durable_cookie(AUTH_COOKIE, String::new(), secure);
    cookie.make_removal();
    CookieUpdates(vec![cookie])
}
