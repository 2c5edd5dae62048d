use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use super::{SeaOrmStore, StaffRepository};
use crate::{
    entity::staff_users::{Column, Entity as StaffUsers, Model},
    error::AppResult,
};

#[async_trait]
impl StaffRepository for SeaOrmStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Model>> {
        Ok(StaffUsers::find()
            .filter(Column::Email.eq(email))
            .one(&self.orm)
            .await?)
    }
}
