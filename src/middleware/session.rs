use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cookie::Cookie;
use std::convert::Infallible;

use crate::{
    session::{self, AUTH_COOKIE, CookieUpdates, SESSION_COOKIE},
    state::AppState,
};

/// Cookie view of the visitor. Never rejects; workflows decide what a missing
/// or malformed session means for them.
#[derive(Debug, Clone, Default)]
pub struct CustomerSession {
    /// Raw `session_id` cookie value, not yet validated.
    pub raw_id: Option<String>,
    pub authenticated: bool,
}

impl<S> FromRequestParts<S> for CustomerSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = session::read(&parts.headers);
        let authenticated = session::read_cookie(&parts.headers, AUTH_COOKIE)
            .is_some_and(|value| value == "true");
        Ok(Self {
            raw_id,
            authenticated,
        })
    }
}

/// Gives visitors without a valid `session_id` a fresh one. The new id is
/// visible to the handler of the same request and sent back as a cookie.
pub async fn issue_session(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let has_valid = session::read(req.headers()).is_some_and(|raw| session::is_valid_session_id(&raw));
    if has_valid {
        return next.run(req).await;
    }

    let session_id = session::new_session_id();
    let mut pairs: Vec<String> = req
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw.to_owned()))
        .filter_map(Result::ok)
        .filter(|c| c.name() != SESSION_COOKIE)
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect();
    pairs.push(format!("{SESSION_COOKIE}={session_id}"));
    if let Ok(value) = HeaderValue::from_str(&pairs.join("; ")) {
        req.headers_mut().insert(header::COOKIE, value);
    }
    tracing::debug!(%session_id, "issued visitor session");

    let mut cookies = CookieUpdates::default();
    cookies.push(session::session_id_cookie(
        session_id,
        state.config.secure_cookies,
    ));
    (cookies, next.run(req).await).into_response()
}
