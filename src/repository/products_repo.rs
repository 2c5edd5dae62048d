use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::{ProductFields, ProductFilter, ProductRepository, SeaOrmStore};
use crate::{
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        products::{ActiveModel, Column, Entity as Products, Model},
    },
    error::AppResult,
};

fn apply_fields(active: &mut ActiveModel, fields: ProductFields) {
    active.name_fr = Set(fields.name_fr);
    active.name_ar = Set(fields.name_ar);
    active.slug = Set(fields.slug);
    active.description = Set(fields.description);
    active.price_dzd = Set(fields.price_dzd);
    active.stock = Set(fields.stock);
    active.category_id = Set(fields.category_id);
    active.is_active = Set(fields.is_active);
}

#[async_trait]
impl ProductRepository for SeaOrmStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Model>> {
        Ok(Products::find_by_id(id).one(&self.orm).await?)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let products = Products::find()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .all(&self.orm)
            .await?;
        Ok(products)
    }

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Model>> {
        Ok(Products::find().filter(Column::Slug.eq(slug)).one(&self.orm).await?)
    }

    async fn list(&self, filter: ProductFilter) -> AppResult<(Vec<Model>, u64)> {
        let mut condition = Condition::all();
        if filter.active_only {
            condition = condition.add(Column::IsActive.eq(true));
        }
        if let Some(ids) = filter.category_ids {
            condition = condition.add(Column::CategoryId.is_in(ids));
        }

        let finder = Products::find()
            .filter(condition)
            .order_by_desc(Column::CreatedAt);
        let total = finder.clone().count(&self.orm).await?;
        let items = finder
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.orm)
            .await?;
        Ok((items, total))
    }

    async fn insert(&self, fields: ProductFields) -> AppResult<Model> {
        let mut active = ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: NotSet,
            ..Default::default()
        };
        apply_fields(&mut active, fields);
        Ok(active.insert(&self.orm).await?)
    }

    async fn update(&self, id: Uuid, fields: ProductFields) -> AppResult<Option<Model>> {
        let Some(existing) = Products::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut active: ActiveModel = existing.into();
        apply_fields(&mut active, fields);
        Ok(Some(active.update(&self.orm).await?))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = Products::delete_by_id(id).exec(&self.orm).await?;
        Ok(result.rows_affected > 0)
    }

    async fn count_in_category(&self, category_id: Uuid) -> AppResult<u64> {
        let count = Products::find()
            .filter(Column::CategoryId.eq(category_id))
            .count(&self.orm)
            .await?;
        Ok(count)
    }

    async fn has_order_items(&self, id: Uuid) -> AppResult<bool> {
        let count = OrderItems::find()
            .filter(OrderItemCol::ProductId.eq(id))
            .count(&self.orm)
            .await?;
        Ok(count > 0)
    }
}
