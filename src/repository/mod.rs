//! Storage seams used by the services.
//!
//! Each trait has a SeaORM implementation on [`SeaOrmStore`]; the services
//! only ever see `Arc<dyn ...Repository>`.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    entity::{
        categories, customer_profiles, order_items, orders, products, staff_users,
        store_settings,
    },
    error::AppResult,
    models::{AddressSnapshot, DeliveryMethod, OrderStatus, PaymentMethod, StoreSettings},
    password::PasswordCredentials,
};

mod categories_repo;
mod customers_repo;
mod orders_repo;
mod products_repo;
mod settings_repo;
mod staff_repo;

#[derive(Clone)]
pub struct SeaOrmStore {
    orm: sea_orm::DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(orm: sea_orm::DatabaseConnection) -> Self {
        Self { orm }
    }
}

/// Fields written by a profile upsert. `None` email or credentials keep the
/// stored values.
#[derive(Debug, Clone)]
pub struct ProfileFields {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub credentials: Option<PasswordCredentials>,
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<customer_profiles::Model>>;
    async fn find_by_session(&self, session_id: Uuid)
    -> AppResult<Option<customer_profiles::Model>>;
    async fn upsert_by_session(
        &self,
        session_id: Uuid,
        fields: ProfileFields,
    ) -> AppResult<customer_profiles::Model>;
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub session_id: Uuid,
    pub payment_method: PaymentMethod,
    pub delivery_method: DeliveryMethod,
    pub wilaya_code: i32,
    pub subtotal_dzd: i64,
    pub shipping_dzd: i64,
    pub total_dzd: i64,
    pub address_snapshot: AddressSnapshot,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub title_snapshot: String,
    pub unit_price_dzd: i64,
    pub qty: i32,
    /// `unit_price_dzd * qty`, computed with overflow checks when the line is priced.
    pub line_total_dzd: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderFilter {
    pub session_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub newest_first: bool,
    pub limit: u64,
    pub offset: u64,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Header and items in one transaction; nothing is kept if any insert fails.
    async fn create_order_with_items(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> AppResult<(orders::Model, Vec<order_items::Model>)>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<orders::Model>>;
    async fn items_for(&self, order_id: Uuid) -> AppResult<Vec<order_items::Model>>;
    /// Matching page plus the total count ignoring limit/offset.
    async fn list(&self, filter: OrderFilter) -> AppResult<(Vec<orders::Model>, u64)>;
    /// Compare-and-set: only applies when the stored status is still `from`.
    async fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> AppResult<Option<orders::Model>>;
}

#[derive(Debug, Clone)]
pub struct ProductFields {
    pub name_fr: String,
    pub name_ar: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_dzd: i64,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_ids: Option<Vec<Uuid>>,
    pub active_only: bool,
    pub limit: u64,
    pub offset: u64,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<products::Model>>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<products::Model>>;
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<products::Model>>;
    async fn list(&self, filter: ProductFilter) -> AppResult<(Vec<products::Model>, u64)>;
    async fn insert(&self, fields: ProductFields) -> AppResult<products::Model>;
    async fn update(&self, id: Uuid, fields: ProductFields) -> AppResult<Option<products::Model>>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
    async fn count_in_category(&self, category_id: Uuid) -> AppResult<u64>;
    async fn has_order_items(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub parent_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub depth: i16,
    pub name_fr: String,
    pub name_ar: String,
    pub slug: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct CategoryChanges {
    pub name_fr: String,
    pub name_ar: String,
    pub slug: String,
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<categories::Model>>;
    async fn all(&self) -> AppResult<Vec<categories::Model>>;
    /// Direct children ordered by `sort_order`; `None` lists departments.
    async fn children_of(&self, parent_id: Option<Uuid>) -> AppResult<Vec<categories::Model>>;
    /// Slug already used within the department scope (`None` = departments).
    async fn slug_taken(
        &self,
        slug: &str,
        department_id: Option<Uuid>,
        exclude: Option<Uuid>,
    ) -> AppResult<bool>;
    async fn insert(&self, category: NewCategory) -> AppResult<categories::Model>;
    async fn update(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> AppResult<Option<categories::Model>>;
    /// Exchanges the `sort_order` of two siblings atomically.
    async fn swap_sort_order(&self, a: Uuid, b: Uuid) -> AppResult<()>;
    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Option<categories::Model>>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait StaffRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<staff_users::Model>>;
}

#[async_trait]
pub trait StoreSettingsRepository: Send + Sync {
    async fn load(&self) -> AppResult<Option<store_settings::Model>>;
    async fn save(&self, settings: StoreSettings) -> AppResult<store_settings::Model>;
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor: Option<String>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<Value>,
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> AppResult<()>;
}
