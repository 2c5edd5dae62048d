use axum::{
    Form, Json, Router,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    routing::post,
};

use crate::{
    dto::checkout::{CheckoutForm, PlacedOrder},
    error::{AppError, AppResult},
    middleware::session::CustomerSession,
    response::ApiResponse,
    services::checkout_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(place_order))
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body(content = CheckoutForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<PlacedOrder>),
        (status = 400, description = "Missing information, invalid cart or totals"),
        (status = 401, description = "Missing or invalid session"),
    ),
    security(("session_cookie" = [])),
    tag = "Checkout"
)]
pub async fn place_order(
    State(state): State<AppState>,
    visitor: CustomerSession,
    form: Result<Form<CheckoutForm>, FormRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<PlacedOrder>>)> {
    let Form(form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let resp = checkout_service::place_order(&state, visitor.raw_id.as_deref(), form).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
