use axum::{
    Form, Router,
    extract::{State, rejection::FormRejection},
    response::Redirect,
    routing::post,
};

use crate::{
    dto::auth::{LoginRequest, RegisterRequest},
    error::{AppError, AppResult},
    middleware::session::CustomerSession,
    services::auth_service::{self, AuthOutcome},
    session::{self, CookieUpdates},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

fn form_error(rejection: FormRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

fn signed_in(state: &AppState, outcome: AuthOutcome) -> (CookieUpdates, Redirect) {
    (
        session::session_cookies(outcome.session_id, state.config.secure_cookies),
        Redirect::to(&outcome.redirect_to),
    )
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body(content = RegisterRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Registered; cookies set and redirected to `next`"),
        (status = 400, description = "Invalid form"),
        (status = 409, description = "Email already used"),
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    visitor: CustomerSession,
    payload: Result<Form<RegisterRequest>, FormRejection>,
) -> AppResult<(CookieUpdates, Redirect)> {
    let Form(payload) = payload.map_err(form_error)?;
    let outcome =
        auth_service::register_customer(&state, visitor.raw_id.as_deref(), payload).await?;
    Ok(signed_in(&state, outcome))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body(content = LoginRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Logged in; cookies set and redirected to `next`"),
        (status = 400, description = "Invalid form"),
        (status = 401, description = "Unknown account or wrong password"),
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Form<LoginRequest>, FormRejection>,
) -> AppResult<(CookieUpdates, Redirect)> {
    let Form(payload) = payload.map_err(form_error)?;
    let outcome = auth_service::login_customer(&state, payload).await?;
    Ok(signed_in(&state, outcome))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 303, description = "Auth marker cleared, redirected to /login"),
    ),
    tag = "Auth"
)]
pub async fn logout(State(state): State<AppState>) -> (CookieUpdates, Redirect) {
    tracing::debug!("customer logged out");
    (
        session::clear_auth_cookie(state.config.secure_cookies),
        Redirect::to("/login"),
    )
}
