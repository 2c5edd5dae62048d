use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    audit::log_audit,
    category_path::MAX_DEPTH,
    dto::categories::{CanDelete, CategoryTree, CreateCategoryRequest, UpdateCategoryRequest},
    entity::categories,
    error::{AppError, AppResult},
    middleware::auth::AdminUser,
    models::{Category, CategoryNode},
    repository::{CategoryChanges, NewCategory},
    response::ApiResponse,
    state::AppState,
    validation::{is_valid_slug, non_empty},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Nests a flat category list under its parents, siblings by `sort_order`.
/// With `active_only`, an inactive node hides its whole subtree.
pub fn build_tree(rows: Vec<categories::Model>, active_only: bool) -> Vec<CategoryNode> {
    let mut by_parent: HashMap<Option<Uuid>, Vec<categories::Model>> = HashMap::new();
    for row in rows {
        if active_only && !row.is_active {
            continue;
        }
        by_parent.entry(row.parent_id).or_default().push(row);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.name_fr.cmp(&b.name_fr)));
    }

    fn attach(
        parent: Option<Uuid>,
        by_parent: &mut HashMap<Option<Uuid>, Vec<categories::Model>>,
    ) -> Vec<CategoryNode> {
        let Some(children) = by_parent.remove(&parent) else {
            return Vec::new();
        };
        children
            .into_iter()
            .map(|child| {
                let id = child.id;
                CategoryNode {
                    category: Category::from(child),
                    children: attach(Some(id), by_parent),
                }
            })
            .collect()
    }

    attach(None, &mut by_parent)
}

/// `root` and every category below it.
pub fn subtree_ids(rows: &[categories::Model], root: Uuid) -> Vec<Uuid> {
    let mut ids = vec![root];
    let mut cursor = 0;
    while cursor < ids.len() {
        let parent = ids[cursor];
        ids.extend(
            rows.iter()
                .filter(|row| row.parent_id == Some(parent))
                .map(|row| row.id),
        );
        cursor += 1;
    }
    ids
}

pub async fn category_tree(
    state: &AppState,
    active_only: bool,
) -> AppResult<ApiResponse<CategoryTree>> {
    let rows = state.repos.categories.all().await?;
    Ok(ApiResponse::ok(
        "Ok",
        CategoryTree {
            items: build_tree(rows, active_only),
        },
    ))
}

struct CategoryInput {
    name_fr: String,
    name_ar: String,
    slug: String,
}

fn validate_input(name_fr: &str, name_ar: &str, slug: &str) -> AppResult<CategoryInput> {
    let (Some(name_fr), Some(name_ar), Some(slug)) = (
        non_empty(Some(name_fr)),
        non_empty(Some(name_ar)),
        non_empty(Some(slug)),
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
    Ok(CategoryInput {
        name_fr: name_fr.to_string(),
        name_ar: name_ar.to_string(),
        slug: slug.to_string(),
    })
}

async fn find_category(state: &AppState, id: Uuid) -> AppResult<categories::Model> {
    state
        .repos
        .categories
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)
}

fn slug_conflict(slug: &str) -> AppError {
    AppError::Conflict(format!("slug '{slug}' is already used in this department"))
}

pub async fn create_category(
    state: &AppState,
    user: &AdminUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    let input = validate_input(&payload.name_fr, &payload.name_ar, &payload.slug)?;

    let (depth, department_id) = match payload.parent_id {
        None => (1, None),
        Some(parent_id) => {
            let parent = find_category(state, parent_id).await?;
            if parent.depth as usize >= MAX_DEPTH {
                return Err(AppError::BadRequest("cannot create a 4th level".into()));
            }
            (parent.depth + 1, Some(parent.department_id.unwrap_or(parent.id)))
        }
    };

    if state
        .repos
        .categories
        .slug_taken(&input.slug, department_id, None)
        .await?
    {
        return Err(slug_conflict(&input.slug));
    }

    let siblings = state.repos.categories.children_of(payload.parent_id).await?;
    let sort_order = siblings
        .iter()
        .map(|s| s.sort_order)
        .max()
        .map_or(0, |max| max + 1);

    let created = state
        .repos
        .categories
        .insert(NewCategory {
            parent_id: payload.parent_id,
            department_id,
            depth,
            name_fr: input.name_fr,
            name_ar: input.name_ar,
            slug: input.slug.clone(),
            sort_order,
        })
        .await
        .map_err(|err| {
            if err.is_unique_violation() {
                slug_conflict(&input.slug)
            } else {
                err
            }
        })?;

    log_audit(
        state,
        Some(user.email.clone()),
        "category_create",
        Some("categories"),
        Some(serde_json::json!({ "category_id": created.id, "depth": created.depth })),
    )
    .await;

    Ok(ApiResponse::ok("Category created", Category::from(created)))
}

pub async fn update_category(
    state: &AppState,
    user: &AdminUser,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    let input = validate_input(&payload.name_fr, &payload.name_ar, &payload.slug)?;
    let existing = find_category(state, id).await?;

    if existing.slug != input.slug
        && state
            .repos
            .categories
            .slug_taken(&input.slug, existing.department_id, Some(id))
            .await?
    {
        return Err(slug_conflict(&input.slug));
    }

    let slug = input.slug.clone();
    let updated = state
        .repos
        .categories
        .update(
            id,
            CategoryChanges {
                name_fr: input.name_fr,
                name_ar: input.name_ar,
                slug: input.slug,
            },
        )
        .await
        .map_err(|err| {
            if err.is_unique_violation() {
                slug_conflict(&slug)
            } else {
                err
            }
        })?
        .ok_or(AppError::NotFound)?;

    log_audit(
        state,
        Some(user.email.clone()),
        "category_update",
        Some("categories"),
        Some(serde_json::json!({ "category_id": id })),
    )
    .await;

    Ok(ApiResponse::ok("Category updated", Category::from(updated)))
}

async fn deletion_check(state: &AppState, id: Uuid) -> AppResult<CanDelete> {
    let children = state.repos.categories.children_of(Some(id)).await?;
    if !children.is_empty() {
        return Ok(CanDelete {
            can: false,
            reason: Some(format!("category has {} subcategories", children.len())),
        });
    }
    let products = state.repos.products.count_in_category(id).await?;
    if products > 0 {
        return Ok(CanDelete {
            can: false,
            reason: Some(format!("category has {products} products")),
        });
    }
    Ok(CanDelete {
        can: true,
        reason: None,
    })
}

pub async fn can_delete(state: &AppState, id: Uuid) -> AppResult<ApiResponse<CanDelete>> {
    find_category(state, id).await?;
    Ok(ApiResponse::ok("Ok", deletion_check(state, id).await?))
}

pub async fn delete_category(
    state: &AppState,
    user: &AdminUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    find_category(state, id).await?;

    let check = deletion_check(state, id).await?;
    if !check.can {
        return Err(AppError::Conflict(
            check.reason.unwrap_or_else(|| "category is in use".into()),
        ));
    }

    if !state.repos.categories.delete(id).await? {
        return Err(AppError::NotFound);
    }

    log_audit(
        state,
        Some(user.email.clone()),
        "category_delete",
        Some("categories"),
        Some(serde_json::json!({ "category_id": id })),
    )
    .await;

    Ok(ApiResponse::ok(
        "Category deleted",
        serde_json::json!({ "deleted": true }),
    ))
}

/// Swaps the category with its neighbour in the given direction. The first
/// sibling cannot move up and the last cannot move down; both are no-ops.
pub async fn move_category(
    state: &AppState,
    user: &AdminUser,
    id: Uuid,
    direction: MoveDirection,
) -> AppResult<ApiResponse<Vec<Category>>> {
    let node = find_category(state, id).await?;
    let siblings = state.repos.categories.children_of(node.parent_id).await?;
    let position = siblings
        .iter()
        .position(|s| s.id == id)
        .ok_or(AppError::NotFound)?;

    let neighbour = match direction {
        MoveDirection::Up => position.checked_sub(1),
        MoveDirection::Down => Some(position + 1).filter(|&i| i < siblings.len()),
    };

    let Some(neighbour) = neighbour else {
        let unchanged = siblings.into_iter().map(Category::from).collect();
        return Ok(ApiResponse::ok("Already at the edge", unchanged));
    };

    state
        .repos
        .categories
        .swap_sort_order(id, siblings[neighbour].id)
        .await?;

    log_audit(
        state,
        Some(user.email.clone()),
        "category_move",
        Some("categories"),
        Some(serde_json::json!({
            "category_id": id,
            "direction": if direction == MoveDirection::Up { "up" } else { "down" },
        })),
    )
    .await;

    let reordered = state
        .repos
        .categories
        .children_of(node.parent_id)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();
    Ok(ApiResponse::ok("Category moved", reordered))
}

pub async fn toggle_active(
    state: &AppState,
    user: &AdminUser,
    id: Uuid,
) -> AppResult<ApiResponse<Category>> {
    let node = find_category(state, id).await?;
    let updated = state
        .repos
        .categories
        .set_active(id, !node.is_active)
        .await?
        .ok_or(AppError::NotFound)?;

    log_audit(
        state,
        Some(user.email.clone()),
        "category_toggle_active",
        Some("categories"),
        Some(serde_json::json!({ "category_id": id, "is_active": updated.is_active })),
    )
    .await;

    Ok(ApiResponse::ok("Category updated", Category::from(updated)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(id: Uuid, parent: Option<Uuid>, sort_order: i32, active: bool) -> categories::Model {
        let now = Utc::now().fixed_offset();
        categories::Model {
            id,
            parent_id: parent,
            department_id: None,
            depth: 1,
            name_fr: format!("c{sort_order}"),
            name_ar: "ف".into(),
            slug: format!("c{sort_order}"),
            sort_order,
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tree_nests_and_orders_siblings() {
        let (dep, a, b, leaf) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rows = vec![
            row(b, Some(dep), 2, true),
            row(leaf, Some(a), 0, true),
            row(a, Some(dep), 1, true),
            row(dep, None, 0, true),
        ];
        let tree = build_tree(rows, false);
        assert_eq!(tree.len(), 1);
        let children: Vec<Uuid> = tree[0].children.iter().map(|c| c.category.id).collect();
        assert_eq!(children, vec![a, b]);
        assert_eq!(tree[0].children[0].children[0].category.id, leaf);
    }

    #[test]
    fn inactive_node_hides_subtree() {
        let (dep, a, leaf) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rows = vec![
            row(dep, None, 0, true),
            row(a, Some(dep), 0, false),
            row(leaf, Some(a), 0, true),
        ];
        let tree = build_tree(rows.clone(), true);
        assert!(tree[0].children.is_empty());
        assert_eq!(build_tree(rows, false)[0].children.len(), 1);
    }

    #[test]
    fn subtree_includes_descendants_only() {
        let (dep, a, leaf, other) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rows = vec![
            row(dep, None, 0, true),
            row(a, Some(dep), 0, true),
            row(leaf, Some(a), 0, true),
            row(other, None, 1, true),
        ];
        let mut ids = subtree_ids(&rows, a);
        ids.sort();
        let mut expected = vec![a, leaf];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn input_requires_names_and_slug_shape() {
        assert!(validate_input("Portables", "حواسيب", "portables").is_ok());
        assert!(validate_input(" ", "حواسيب", "portables").is_err());
        assert!(validate_input("Portables", "حواسيب", "Portables PC").is_err());
    }
}
