use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, sea_query::OnConflict,
};
use uuid::Uuid;

use super::{CustomerRepository, ProfileFields, SeaOrmStore};
use crate::{
    entity::customer_profiles::{ActiveModel, Column, Entity as CustomerProfiles, Model},
    error::AppResult,
};

#[async_trait]
impl CustomerRepository for SeaOrmStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Model>> {
        // A credentialed profile owns the email; guests may share it.
        let registered = CustomerProfiles::find()
            .filter(Column::Email.eq(email))
            .filter(Column::PasswordHash.is_not_null())
            .one(&self.orm)
            .await?;
        if registered.is_some() {
            return Ok(registered);
        }

        let guest = CustomerProfiles::find()
            .filter(Column::Email.eq(email))
            .order_by_desc(Column::UpdatedAt)
            .one(&self.orm)
            .await?;
        Ok(guest)
    }

    async fn find_by_session(&self, session_id: Uuid) -> AppResult<Option<Model>> {
        let profile = CustomerProfiles::find()
            .filter(Column::SessionId.eq(session_id))
            .one(&self.orm)
            .await?;
        Ok(profile)
    }

    async fn upsert_by_session(&self, session_id: Uuid, fields: ProfileFields) -> AppResult<Model> {
        let now = Utc::now().fixed_offset();

        let mut update_columns = vec![Column::FirstName, Column::LastName, Column::UpdatedAt];
        if fields.email.is_some() {
            update_columns.push(Column::Email);
        }
        if fields.phone.is_some() {
            update_columns.push(Column::Phone);
        }
        let (password_hash, password_salt) = match fields.credentials {
            Some(creds) => {
                update_columns.extend([Column::PasswordHash, Column::PasswordSalt]);
                (Some(creds.hash), Some(creds.salt))
            }
            None => (None, None),
        };

        let active = ActiveModel {
            id: Set(Uuid::new_v4()),
            session_id: Set(session_id),
            first_name: Set(fields.first_name),
            last_name: Set(fields.last_name),
            email: Set(fields.email),
            phone: Set(fields.phone),
            password_hash: Set(password_hash),
            password_salt: Set(password_salt),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let profile = CustomerProfiles::insert(active)
            .on_conflict(
                OnConflict::column(Column::SessionId)
                    .update_columns(update_columns)
                    .to_owned(),
            )
            .exec_with_returning(&self.orm)
            .await?;
        Ok(profile)
    }
}
