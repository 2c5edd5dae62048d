use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{category_path::CategoryPath, models::Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductRequest {
    pub name_fr: String,
    pub name_ar: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_dzd: i64,
    pub stock: i32,
    /// Department → category → subcategory ids; the last one files the product.
    pub category_path: Option<CategoryPath>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}
