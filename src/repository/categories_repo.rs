use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::LockType, QuerySelect,
};
use uuid::Uuid;

use super::{CategoryChanges, CategoryRepository, NewCategory, SeaOrmStore};
use crate::{
    entity::categories::{ActiveModel, Column, Entity as Categories, Model},
    error::{AppError, AppResult},
};

#[async_trait]
impl CategoryRepository for SeaOrmStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Model>> {
        Ok(Categories::find_by_id(id).one(&self.orm).await?)
    }

    async fn all(&self) -> AppResult<Vec<Model>> {
        let rows = Categories::find()
            .order_by_asc(Column::Depth)
            .order_by_asc(Column::SortOrder)
            .all(&self.orm)
            .await?;
        Ok(rows)
    }

    async fn children_of(&self, parent_id: Option<Uuid>) -> AppResult<Vec<Model>> {
        let finder = match parent_id {
            Some(id) => Categories::find().filter(Column::ParentId.eq(id)),
            None => Categories::find().filter(Column::ParentId.is_null()),
        };
        let rows = finder
            .order_by_asc(Column::SortOrder)
            .order_by_asc(Column::CreatedAt)
            .all(&self.orm)
            .await?;
        Ok(rows)
    }

    async fn slug_taken(
        &self,
        slug: &str,
        department_id: Option<Uuid>,
        exclude: Option<Uuid>,
    ) -> AppResult<bool> {
        let mut finder = Categories::find().filter(Column::Slug.eq(slug));
        finder = match department_id {
            Some(id) => finder.filter(Column::DepartmentId.eq(id)),
            None => finder.filter(Column::DepartmentId.is_null()),
        };
        if let Some(id) = exclude {
            finder = finder.filter(Column::Id.ne(id));
        }
        Ok(finder.count(&self.orm).await? > 0)
    }

    async fn insert(&self, category: NewCategory) -> AppResult<Model> {
        let row = ActiveModel {
            id: Set(Uuid::new_v4()),
            parent_id: Set(category.parent_id),
            department_id: Set(category.department_id),
            depth: Set(category.depth),
            name_fr: Set(category.name_fr),
            name_ar: Set(category.name_ar),
            slug: Set(category.slug),
            sort_order: Set(category.sort_order),
            is_active: Set(true),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, changes: CategoryChanges) -> AppResult<Option<Model>> {
        let Some(existing) = Categories::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut active: ActiveModel = existing.into();
        active.name_fr = Set(changes.name_fr);
        active.name_ar = Set(changes.name_ar);
        active.slug = Set(changes.slug);
        active.updated_at = Set(Utc::now().fixed_offset());
        Ok(Some(active.update(&self.orm).await?))
    }

    async fn swap_sort_order(&self, a: Uuid, b: Uuid) -> AppResult<()> {
        let txn = self.orm.begin().await?;
        let first = Categories::find_by_id(a)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        let second = Categories::find_by_id(b)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let now = Utc::now().fixed_offset();
        let (first_order, second_order) = (first.sort_order, second.sort_order);

        let mut first: ActiveModel = first.into();
        first.sort_order = Set(second_order);
        first.updated_at = Set(now);
        first.update(&txn).await?;

        let mut second: ActiveModel = second.into();
        second.sort_order = Set(first_order);
        second.updated_at = Set(now);
        second.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Option<Model>> {
        let Some(existing) = Categories::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut model: ActiveModel = existing.into();
        model.is_active = Set(active);
        model.updated_at = Set(Utc::now().fixed_offset());
        Ok(Some(model.update(&self.orm).await?))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = Categories::delete_by_id(id).exec(&self.orm).await?;
        Ok(result.rows_affected > 0)
    }
}
