use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    middleware,
    routing::get,
};

use crate::{
    middleware::session::issue_session,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub mod account;
pub mod admin;
pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod doc;
pub mod health;
pub mod params;

/// API routes. Takes the state up front because the session-issuing layer
/// needs it to know whether cookies are marked `Secure`.
pub fn create_api_router(state: &AppState) -> Router<AppState> {
    let browsing = Router::new()
        .nest("/catalog", catalog::router())
        .route("/settings", get(catalog::get_settings))
        .layer(middleware::from_fn_with_state(state.clone(), issue_session));

    Router::new()
        .merge(browsing)
        .nest("/auth", auth::router())
        .nest("/account", account::router())
        .nest("/checkout", checkout::router())
        .nest("/admin", admin::router())
}

/// Full application router with state bound. Transport layers (tracing,
/// request ids, limits) are added by the binary.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router(&state))
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
