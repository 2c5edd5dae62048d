//! Ordered department → category → subcategory selection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::categories;

pub const MAX_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "Vec<Uuid>", into = "Vec<Uuid>")]
#[schema(value_type = Vec<Uuid>)]
pub struct CategoryPath(Vec<Uuid>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    Empty,
    TooDeep,
    UnknownCategory(Uuid),
    BrokenChain(Uuid),
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::Empty => f.write_str("category path is empty"),
            PathError::TooDeep => write!(f, "category path is deeper than {MAX_DEPTH} levels"),
            PathError::UnknownCategory(id) => write!(f, "unknown category {id}"),
            PathError::BrokenChain(id) => {
                write!(f, "category {id} is not a child of the previous path entry")
            }
        }
    }
}

impl CategoryPath {
    pub fn new(ids: Vec<Uuid>) -> Result<Self, PathError> {
        if ids.is_empty() {
            return Err(PathError::Empty);
        }
        if ids.len() > MAX_DEPTH {
            return Err(PathError::TooDeep);
        }
        Ok(Self(ids))
    }

    /// Deepest selected category; the one a product is filed under.
    pub fn leaf(&self) -> Uuid {
        self.0[self.0.len() - 1]
    }

    pub fn ids(&self) -> &[Uuid] {
        &self.0
    }

    /// Checks that the path starts at a department and each entry is the
    /// parent of the next one.
    pub fn check_against(&self, tree: &HashMap<Uuid, categories::Model>) -> Result<(), PathError> {
        let mut expected_parent: Option<Uuid> = None;
        for id in &self.0 {
            let node = tree.get(id).ok_or(PathError::UnknownCategory(*id))?;
            if node.parent_id != expected_parent {
                return Err(PathError::BrokenChain(*id));
            }
            expected_parent = Some(*id);
        }
        Ok(())
    }

    /// Walks parent links upward from `leaf`.
    pub fn resolve(leaf: Uuid, tree: &HashMap<Uuid, categories::Model>) -> Result<Self, PathError> {
        let mut ids = Vec::with_capacity(MAX_DEPTH);
        let mut cursor = Some(leaf);
        while let Some(id) = cursor {
            if ids.len() == MAX_DEPTH {
                return Err(PathError::TooDeep);
            }
            let node = tree.get(&id).ok_or(PathError::UnknownCategory(id))?;
            ids.push(id);
            cursor = node.parent_id;
        }
        ids.reverse();
        Ok(Self(ids))
    }
}

impl TryFrom<Vec<Uuid>> for CategoryPath {
    type Error = String;

    fn try_from(ids: Vec<Uuid>) -> Result<Self, Self::Error> {
        CategoryPath::new(ids).map_err(|e| e.to_string())
    }
}

impl From<CategoryPath> for Vec<Uuid> {
    fn from(path: CategoryPath) -> Self {
        path.0
    }
}
