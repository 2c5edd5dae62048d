use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::CategoryNode;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    /// Omit to create a department.
    pub parent_id: Option<Uuid>,
    pub name_fr: String,
    pub name_ar: String,
    pub slug: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub name_fr: String,
    pub name_ar: String,
    pub slug: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct CanDelete {
    pub can: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryTree {
    pub items: Vec<CategoryNode>,
}
