use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        auth::{StaffLoginRequest, StaffLoginResponse},
        categories::{CanDelete, CategoryTree, CreateCategoryRequest, UpdateCategoryRequest},
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products::{ProductList, ProductRequest},
    },
    error::AppResult,
    middleware::auth::AdminUser,
    models::{Category, Order, Product, StoreSettings},
    response::ApiResponse,
    routes::params::{OrderListQuery, ProductQuery},
    services::{
        auth_service,
        category_service::{self, MoveDirection},
        order_admin_service, product_service, settings_service,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(staff_login))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/categories", get(category_tree).post(create_category))
        .route(
            "/categories/{id}",
            put(update_category).delete(delete_category),
        )
        .route("/categories/{id}/can-delete", get(can_delete_category))
        .route("/categories/{id}/move-up", post(move_category_up))
        .route("/categories/{id}/move-down", post(move_category_down))
        .route("/categories/{id}/toggle-active", post(toggle_category))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            put(update_product).delete(delete_product),
        )
        .route("/products/{id}/toggle-active", post(toggle_product))
        .route("/settings", put(save_settings))
}

#[utoipa::path(
    post,
    path = "/api/admin/auth/login",
    request_body = StaffLoginRequest,
    responses(
        (status = 200, description = "Staff token", body = ApiResponse<StaffLoginResponse>),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "Admin"
)]
pub async fn staff_login(
    State(state): State<AppState>,
    Json(payload): Json<StaffLoginRequest>,
) -> AppResult<Json<ApiResponse<StaffLoginResponse>>> {
    let resp = auth_service::login_staff(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "All orders", body = ApiResponse<OrderList>),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _user: AdminUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_admin_service::list_orders(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order(
    State(state): State<AppState>,
    _user: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_admin_service::get_order(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Order>),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Changed concurrently"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_admin_service::update_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/categories",
    responses(
        (status = 200, description = "Full category tree, inactive included", body = ApiResponse<CategoryTree>),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn category_tree(
    State(state): State<AppState>,
    _user: AdminUser,
) -> AppResult<Json<ApiResponse<CategoryTree>>> {
    let resp = category_service::category_tree(&state, false).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Category created", body = ApiResponse<Category>),
        (status = 400, description = "Invalid input or 4th level"),
        (status = 409, description = "Slug already used in the department"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AdminUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = category_service::create_category(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<Category>),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Slug already used in the department"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_category(
    State(state): State<AppState>,
    user: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = category_service::update_category(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/categories/{id}/can-delete",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Whether the category may be deleted", body = ApiResponse<CanDelete>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn can_delete_category(
    State(state): State<AppState>,
    _user: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CanDelete>>> {
    let resp = category_service::can_delete(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Category has subcategories or products"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    user: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = category_service::delete_category(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories/{id}/move-up",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Siblings in their new order", body = ApiResponse<Vec<Category>>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn move_category_up(
    State(state): State<AppState>,
    user: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Category>>>> {
    let resp = category_service::move_category(&state, &user, id, MoveDirection::Up).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories/{id}/move-down",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Siblings in their new order", body = ApiResponse<Vec<Category>>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn move_category_down(
    State(state): State<AppState>,
    user: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Category>>>> {
    let resp = category_service::move_category(&state, &user, id, MoveDirection::Down).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories/{id}/toggle-active",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category with flipped visibility", body = ApiResponse<Category>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn toggle_category(
    State(state): State<AppState>,
    user: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = category_service::toggle_active(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "All products, inactive included", body = ApiResponse<ProductList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_products(
    State(state): State<AppState>,
    _user: AdminUser,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product created", body = ApiResponse<Product>),
        (status = 400, description = "Invalid input or category path"),
        (status = 409, description = "Slug already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AdminUser,
    Json(payload): Json<ProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<Product>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Product appears in orders"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/products/{id}/toggle-active",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with flipped visibility", body = ApiResponse<Product>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn toggle_product(
    State(state): State<AppState>,
    user: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::toggle_active(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = StoreSettings,
    responses(
        (status = 200, description = "Settings saved", body = ApiResponse<StoreSettings>),
        (status = 400, description = "Invalid settings"),
        (status = 403, description = "Admin role required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn save_settings(
    State(state): State<AppState>,
    user: AdminUser,
    Json(payload): Json<StoreSettings>,
) -> AppResult<Json<ApiResponse<StoreSettings>>> {
    let resp = settings_service::save_settings(&state, &user, payload).await?;
    Ok(Json(resp))
}
