use std::sync::LazyLock;

use axum::http::HeaderValue;
use regex::Regex;

pub const DEFAULT_REDIRECT: &str = "/account";
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("Invalid regex"));

/// Conservative `local@domain.tld` shape check.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// Trimmed value, `None` when absent or blank.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Post-auth redirect target.
///
/// Only same-origin relative paths are kept; protocol-relative targets, the
/// auth pages themselves and anything unusable as a `Location` header fall
/// back to `/account`.
pub fn normalize_redirect_path(next: Option<&str>) -> String {
    let Some(next) = non_empty(next) else {
        return DEFAULT_REDIRECT.to_string();
    };
    if !next.starts_with('/') || next.starts_with("//") || next.starts_with("/\\") {
        return DEFAULT_REDIRECT.to_string();
    }
    if next.chars().any(char::is_control) || HeaderValue::from_str(next).is_err() {
        return DEFAULT_REDIRECT.to_string();
    }

    let path = next
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    let loops_back = ["/login", "/register"]
        .iter()
        .any(|auth| path == *auth || path.starts_with(&format!("{auth}/")));
    if loops_back {
        return DEFAULT_REDIRECT.to_string();
    }

    next.to_string()
}
