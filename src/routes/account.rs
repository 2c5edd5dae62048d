use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::{
        auth::UpdateProfileRequest,
        orders::{OrderList, OrderWithItems},
    },
    error::AppResult,
    middleware::session::CustomerSession,
    models::CustomerProfile,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{auth_service, checkout_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
}

#[utoipa::path(
    get,
    path = "/api/account/profile",
    responses(
        (status = 200, description = "Profile of the logged-in customer", body = ApiResponse<CustomerProfile>),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_cookie" = [])),
    tag = "Account"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    visitor: CustomerSession,
) -> AppResult<Json<ApiResponse<CustomerProfile>>> {
    let session_id =
        auth_service::authenticated_session(visitor.raw_id.as_deref(), visitor.authenticated)?;
    let resp = auth_service::get_profile(&state, session_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/account/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<CustomerProfile>),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_cookie" = [])),
    tag = "Account"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    visitor: CustomerSession,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<CustomerProfile>>> {
    let session_id =
        auth_service::authenticated_session(visitor.raw_id.as_deref(), visitor.authenticated)?;
    let resp = auth_service::update_profile(&state, session_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/account/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders placed from this session", body = ApiResponse<OrderList>),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_cookie" = [])),
    tag = "Account"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    visitor: CustomerSession,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let session_id =
        auth_service::authenticated_session(visitor.raw_id.as_deref(), visitor.authenticated)?;
    let resp = checkout_service::list_session_orders(&state, session_id, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/account/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Not Found"),
    ),
    security(("session_cookie" = [])),
    tag = "Account"
)]
pub async fn get_order(
    State(state): State<AppState>,
    visitor: CustomerSession,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let session_id =
        auth_service::authenticated_session(visitor.raw_id.as_deref(), visitor.authenticated)?;
    let resp = checkout_service::get_session_order(&state, session_id, id).await?;
    Ok(Json(resp))
}
