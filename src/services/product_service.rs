use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    audit::log_audit,
    category_path::CategoryPath,
    dto::products::{ProductList, ProductRequest},
    entity::{categories, products},
    error::{AppError, AppResult},
    middleware::auth::AdminUser,
    models::Product,
    repository::{ProductFields, ProductFilter},
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    services::category_service::subtree_ids,
    state::AppState,
    validation::{is_valid_slug, non_empty},
};

type CategoryIndex = HashMap<Uuid, categories::Model>;

async fn category_index(state: &AppState) -> AppResult<CategoryIndex> {
    Ok(state
        .repos
        .categories
        .all()
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect())
}

fn to_product(model: products::Model, index: &CategoryIndex) -> Product {
    let path = model
        .category_id
        .and_then(|leaf| CategoryPath::resolve(leaf, index).ok())
        .map(Vec::from)
        .unwrap_or_default();
    Product::from_entity(model, path)
}

async fn list_with(
    state: &AppState,
    query: ProductQuery,
    active_only: bool,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let index = category_index(state).await?;

    let category_ids = match query.category {
        None => None,
        Some(id) => {
            let root = index.get(&id).ok_or(AppError::NotFound)?;
            if active_only && !root.is_active {
                return Err(AppError::NotFound);
            }
            let rows: Vec<categories::Model> = index
                .values()
                .filter(|c| !active_only || c.is_active)
                .cloned()
                .collect();
            Some(subtree_ids(&rows, id))
        }
    };

    let filter = ProductFilter {
        category_ids,
        active_only,
        limit: limit as u64,
        offset: offset as u64,
    };
    let (rows, total) = state.repos.products.list(filter).await?;
    let items = rows.into_iter().map(|p| to_product(p, &index)).collect();

    Ok(ApiResponse::success(
        "Ok",
        ProductList { items },
        Some(Meta::new(page, limit, total as i64)),
    ))
}

pub async fn list_catalog(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    list_with(state, query, true).await
}

pub async fn get_catalog_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = state
        .repos
        .products
        .find_by_id(id)
        .await?
        .filter(|p| p.is_active)
        .ok_or(AppError::NotFound)?;
    let index = category_index(state).await?;
    Ok(ApiResponse::ok("Ok", to_product(product, &index)))
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    list_with(state, query, false).await
}

async fn validate_request(
    state: &AppState,
    payload: ProductRequest,
    current: Option<&products::Model>,
) -> AppResult<(ProductFields, CategoryIndex)> {
    let (Some(name_fr), Some(name_ar), Some(slug)) = (
        non_empty(Some(&payload.name_fr)),
        non_empty(Some(&payload.name_ar)),
        non_empty(Some(&payload.slug)),
    ) else {
        return Err(AppError::BadRequest(
            "french name, arabic name and slug are required".into(),
        ));
    };
    if !is_valid_slug(slug) {
        return Err(AppError::BadRequest(
            "slug may only contain lower-case letters, digits and dashes".into(),
        ));
    }
    if payload.price_dzd < 0 || payload.stock < 0 {
        return Err(AppError::BadRequest(
            "price and stock cannot be negative".into(),
        ));
    }

    if let Some(other) = state.repos.products.find_by_slug(slug).await? {
        if current.is_none_or(|c| c.id != other.id) {
            return Err(AppError::Conflict(format!("slug '{slug}' is already used")));
        }
    }

    let index = category_index(state).await?;
    let category_id = match &payload.category_path {
        Some(path) => {
            path.check_against(&index)
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            Some(path.leaf())
        }
        None => None,
    };

    let fields = ProductFields {
        name_fr: name_fr.to_string(),
        name_ar: name_ar.to_string(),
        slug: slug.to_string(),
        description: non_empty(payload.description.as_deref()).map(str::to_string),
        price_dzd: payload.price_dzd,
        stock: payload.stock,
        category_id,
        is_active: payload
            .is_active
            .unwrap_or_else(|| current.is_none_or(|c| c.is_active)),
    };
    Ok((fields, index))
}

pub async fn create_product(
    state: &AppState,
    user: &AdminUser,
    payload: ProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let (fields, index) = validate_request(state, payload, None).await?;
    let created = state.repos.products.insert(fields).await?;

    log_audit(
        state,
        Some(user.email.clone()),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": created.id })),
    )
    .await;

    Ok(ApiResponse::ok("Product created", to_product(created, &index)))
}

pub async fn update_product(
    state: &AppState,
    user: &AdminUser,
    id: Uuid,
    payload: ProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing = state
        .repos
        .products
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;
    let (fields, index) = validate_request(state, payload, Some(&existing)).await?;

    let updated = state
        .repos
        .products
        .update(id, fields)
        .await?
        .ok_or(AppError::NotFound)?;

    log_audit(
        state,
        Some(user.email.clone()),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await;

    Ok(ApiResponse::ok("Product updated", to_product(updated, &index)))
}

pub async fn delete_product(
    state: &AppState,
    user: &AdminUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if state.repos.products.has_order_items(id).await? {
        return Err(AppError::Conflict(
            "product appears in orders, deactivate it instead".into(),
        ));
    }
    if !state.repos.products.delete(id).await? {
        return Err(AppError::NotFound);
    }

    log_audit(
        state,
        Some(user.email.clone()),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await;

    Ok(ApiResponse::ok(
        "Product deleted",
        serde_json::json!({ "deleted": true }),
    ))
}

pub async fn toggle_active(
    state: &AppState,
    user: &AdminUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    let existing = state
        .repos
        .products
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;

    let fields = ProductFields {
        name_fr: existing.name_fr.clone(),
        name_ar: existing.name_ar.clone(),
        slug: existing.slug.clone(),
        description: existing.description.clone(),
        price_dzd: existing.price_dzd,
        stock: existing.stock,
        category_id: existing.category_id,
        is_active: !existing.is_active,
    };
    let updated = state
        .repos
        .products
        .update(id, fields)
        .await?
        .ok_or(AppError::NotFound)?;

    log_audit(
        state,
        Some(user.email.clone()),
        "product_toggle_active",
        Some("products"),
        Some(serde_json::json!({ "product_id": id, "is_active": updated.is_active })),
    )
    .await;

    let index = category_index(state).await?;
    Ok(ApiResponse::ok("Product updated", to_product(updated, &index)))
}
