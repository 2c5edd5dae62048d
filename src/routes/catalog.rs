use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::{categories::CategoryTree, products::ProductList},
    error::AppResult,
    models::{Product, StoreSettings},
    response::ApiResponse,
    routes::params::ProductQuery,
    services::{category_service, product_service, settings_service},
    state::AppState,
};

/// Storefront browsing. Mounted behind the session-issuing middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(category_tree))
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
}

#[utoipa::path(
    get,
    path = "/api/catalog/categories",
    responses(
        (status = 200, description = "Active category tree", body = ApiResponse<CategoryTree>),
    ),
    tag = "Catalog"
)]
pub async fn category_tree(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryTree>>> {
    let resp = category_service::category_tree(&state, true).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/catalog/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Active products, newest first", body = ApiResponse<ProductList>),
        (status = 404, description = "Unknown category"),
    ),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_catalog(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/catalog/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = ApiResponse<Product>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_catalog_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Public store settings", body = ApiResponse<StoreSettings>),
    ),
    tag = "Catalog"
)]
pub async fn get_settings(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<StoreSettings>>> {
    let resp = settings_service::get_settings(&state).await?;
    Ok(Json(resp))
}
