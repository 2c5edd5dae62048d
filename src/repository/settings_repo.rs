use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveValue::Set, EntityTrait, sea_query::OnConflict};

use super::{SeaOrmStore, StoreSettingsRepository};
use crate::{
    entity::store_settings::{ActiveModel, Column, Entity as StoreSettingsRow, Model},
    error::AppResult,
    models::StoreSettings,
};

const SETTINGS_ROW: i16 = 1;

#[async_trait]
impl StoreSettingsRepository for SeaOrmStore {
    async fn load(&self) -> AppResult<Option<Model>> {
        Ok(StoreSettingsRow::find_by_id(SETTINGS_ROW).one(&self.orm).await?)
    }

    async fn save(&self, settings: StoreSettings) -> AppResult<Model> {
        let active = ActiveModel {
            id: Set(SETTINGS_ROW),
            store_name: Set(settings.store_name),
            contact_phone: Set(settings.contact_phone),
            contact_email: Set(settings.contact_email),
            address: Set(settings.address),
            facebook_url: Set(settings.facebook_url),
            instagram_url: Set(settings.instagram_url),
            updated_at: Set(Utc::now().fixed_offset()),
        };
        let row = StoreSettingsRow::insert(active)
            .on_conflict(
                OnConflict::column(Column::Id)
                    .update_columns([
                        Column::StoreName,
                        Column::ContactPhone,
                        Column::ContactEmail,
                        Column::Address,
                        Column::FacebookUrl,
                        Column::InstagramUrl,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_with_returning(&self.orm)
            .await?;
        Ok(row)
    }
}
