//! In-memory repositories and helpers shared by the integration tests.
#![allow(dead_code)]

use std::{
    borrow::Cow,
    error::Error as StdError,
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use chrono::Utc;
use dz_storefront_api::{
    config::AppConfig,
    entity::{
        categories, customer_profiles, order_items, orders, products, staff_users, store_settings,
    },
    error::{AppError, AppResult},
    middleware::auth::AdminUser,
    models::{OrderStatus, StoreSettings},
    password,
    repository::{
        AuditEntry, AuditRepository, CategoryChanges, CategoryRepository, CustomerRepository,
        NewCategory, NewOrder, NewOrderItem, OrderFilter, OrderRepository, ProductFields,
        ProductFilter, ProductRepository, ProfileFields, StaffRepository, StoreSettingsRepository,
    },
    routes::create_app,
    state::{AppState, Repositories},
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

fn now() -> DateTimeWithTimeZone {
    Utc::now().fixed_offset()
}

#[derive(Default)]
pub struct MemoryStore {
    pub profiles: Mutex<Vec<customer_profiles::Model>>,
    pub orders: Mutex<Vec<orders::Model>>,
    pub order_items: Mutex<Vec<order_items::Model>>,
    pub products: Mutex<Vec<products::Model>>,
    pub categories: Mutex<Vec<categories::Model>>,
    pub staff: Mutex<Vec<staff_users::Model>>,
    pub settings: Mutex<Option<store_settings::Model>>,
    pub audit: Mutex<Vec<AuditEntry>>,
    /// Every repository call except audit writes.
    pub calls: AtomicUsize,
    pub order_list_calls: AtomicUsize,
    /// `slug_taken` answers `false`, as if another writer took the slug
    /// right after the check. The unique index still applies on write.
    pub skip_slug_check: AtomicBool,
}

/// What PostgreSQL reports when a write hits a unique index.
#[derive(Debug)]
struct UniqueViolation(&'static str);

impl fmt::Display for UniqueViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate key value violates unique constraint \"{}\"", self.0)
    }
}

impl StdError for UniqueViolation {}

impl sqlx::error::DatabaseError for UniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed("23505"))
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn constraint(&self) -> Option<&str> {
        Some(self.0)
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        sqlx::error::ErrorKind::UniqueViolation
    }
}

fn unique_violation(constraint: &'static str) -> AppError {
    AppError::DbError(sqlx::Error::Database(Box::new(UniqueViolation(constraint))))
}

fn slug_in_use(
    categories: &[categories::Model],
    slug: &str,
    department_id: Option<Uuid>,
    exclude: Option<Uuid>,
) -> bool {
    categories
        .iter()
        .any(|c| c.slug == slug && c.department_id == department_id && Some(c.id) != exclude)
}

impl MemoryStore {
    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn audit_actions(&self) -> Vec<String> {
        self.audit
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.action.clone())
            .collect()
    }

    pub fn add_category(&self, parent: Option<&categories::Model>, slug: &str) -> categories::Model {
        let siblings = self
            .categories
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.parent_id == parent.map(|p| p.id))
            .count();
        let model = categories::Model {
            id: Uuid::new_v4(),
            parent_id: parent.map(|p| p.id),
            department_id: parent.map(|p| p.department_id.unwrap_or(p.id)),
            depth: parent.map_or(1, |p| p.depth + 1),
            name_fr: slug.to_string(),
            name_ar: slug.to_string(),
            slug: slug.to_string(),
            sort_order: siblings as i32,
            is_active: true,
            created_at: now(),
            updated_at: now(),
        };
        self.categories.lock().unwrap().push(model.clone());
        model
    }

    pub fn add_product(&self, name: &str, price_dzd: i64, category_id: Option<Uuid>) -> products::Model {
        let model = products::Model {
            id: Uuid::new_v4(),
            name_fr: name.to_string(),
            name_ar: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            description: None,
            price_dzd,
            stock: 10,
            category_id,
            is_active: true,
            created_at: now(),
        };
        self.products.lock().unwrap().push(model.clone());
        model
    }

    pub fn add_staff(&self, email: &str, password: &str, role: &str) -> staff_users::Model {
        let credentials = password::derive(password, None);
        let model = staff_users::Model {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: credentials.hash,
            password_salt: credentials.salt,
            role: role.to_string(),
            created_at: now(),
        };
        self.staff.lock().unwrap().push(model.clone());
        model
    }

    pub fn add_guest_profile(&self, session_id: Uuid, email: &str) -> customer_profiles::Model {
        let model = customer_profiles::Model {
            id: Uuid::new_v4(),
            session_id,
            first_name: "Guest".into(),
            last_name: "Visitor".into(),
            email: Some(email.to_string()),
            phone: None,
            password_hash: None,
            password_salt: None,
            created_at: now(),
            updated_at: now(),
        };
        self.profiles.lock().unwrap().push(model.clone());
        model
    }
}

#[async_trait]
impl CustomerRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<customer_profiles::Model>> {
        self.touch();
        let profiles = self.profiles.lock().unwrap();
        let matching: Vec<&customer_profiles::Model> = profiles
            .iter()
            .filter(|p| p.email.as_deref() == Some(email))
            .collect();
        Ok(matching
            .iter()
            .find(|p| p.credentials().is_some())
            .or_else(|| matching.first())
            .map(|p| (*p).clone()))
    }

    async fn find_by_session(&self, session_id: Uuid) -> AppResult<Option<customer_profiles::Model>> {
        self.touch();
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles.iter().find(|p| p.session_id == session_id).cloned())
    }

    async fn upsert_by_session(
        &self,
        session_id: Uuid,
        fields: ProfileFields,
    ) -> AppResult<customer_profiles::Model> {
        self.touch();
        let mut profiles = self.profiles.lock().unwrap();
        if fields.credentials.is_some() {
            let taken = profiles.iter().any(|p| {
                p.session_id != session_id
                    && p.credentials().is_some()
                    && p.email == fields.email
            });
            if taken {
                return Err(AppError::Conflict("duplicate email".into()));
            }
        }

        let position = profiles.iter().position(|p| p.session_id == session_id);
        let profile = match position {
            Some(i) => &mut profiles[i],
            None => {
                profiles.push(customer_profiles::Model {
                    id: Uuid::new_v4(),
                    session_id,
                    first_name: String::new(),
                    last_name: String::new(),
                    email: None,
                    phone: None,
                    password_hash: None,
                    password_salt: None,
                    created_at: now(),
                    updated_at: now(),
                });
                profiles.last_mut().unwrap()
            }
        };
        profile.first_name = fields.first_name;
        profile.last_name = fields.last_name;
        if fields.email.is_some() {
            profile.email = fields.email;
        }
        if fields.phone.is_some() {
            profile.phone = fields.phone;
        }
        if let Some(creds) = fields.credentials {
            profile.password_hash = Some(creds.hash);
            profile.password_salt = Some(creds.salt);
        }
        profile.updated_at = now();
        Ok(profile.clone())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create_order_with_items(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> AppResult<(orders::Model, Vec<order_items::Model>)> {
        self.touch();
        let header = orders::Model {
            id: Uuid::new_v4(),
            order_number: order.order_number,
            session_id: order.session_id,
            status: OrderStatus::Pending.as_str().to_string(),
            payment_method: order.payment_method.as_str().to_string(),
            delivery_method: order.delivery_method.as_str().to_string(),
            wilaya_code: order.wilaya_code,
            subtotal_dzd: order.subtotal_dzd,
            shipping_dzd: order.shipping_dzd,
            total_dzd: order.total_dzd,
            address_snapshot: serde_json::to_value(&order.address_snapshot)
                .map_err(|e| AppError::Internal(e.into()))?,
            created_at: now(),
            updated_at: now(),
        };
        let rows: Vec<order_items::Model> = items
            .iter()
            .zip(0i32..)
            .map(|(item, line_no)| order_items::Model {
                id: Uuid::new_v4(),
                order_id: header.id,
                line_no,
                product_id: item.product_id,
                variant_id: item.variant_id,
                title_snapshot: item.title_snapshot.clone(),
                unit_price_dzd: item.unit_price_dzd,
                qty: item.qty,
                line_total_dzd: item.line_total_dzd,
                created_at: now(),
            })
            .collect();
        self.orders.lock().unwrap().push(header.clone());
        self.order_items.lock().unwrap().extend(rows.iter().cloned());
        Ok((header, rows))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<orders::Model>> {
        self.touch();
        Ok(self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned())
    }

    async fn items_for(&self, order_id: Uuid) -> AppResult<Vec<order_items::Model>> {
        self.touch();
        let items = self.order_items.lock().unwrap();
        let mut rows: Vec<order_items::Model> =
            items.iter().filter(|i| i.order_id == order_id).cloned().collect();
        rows.sort_by_key(|i| i.line_no);
        Ok(rows)
    }

    async fn list(&self, filter: OrderFilter) -> AppResult<(Vec<orders::Model>, u64)> {
        self.touch();
        self.order_list_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows: Vec<orders::Model> = self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| filter.session_id.is_none_or(|s| o.session_id == s))
            .filter(|o| filter.status.is_none_or(|s| o.status == s.as_str()))
            .cloned()
            .collect();
        // Insertion order stands in for creation time.
        if filter.newest_first {
            rows.reverse();
        }
        let total = rows.len() as u64;
        let page = rows
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> AppResult<Option<orders::Model>> {
        self.touch();
        let mut orders = self.orders.lock().unwrap();
        let Some(order) = orders
            .iter_mut()
            .find(|o| o.id == id && o.status == from.as_str())
        else {
            return Ok(None);
        };
        order.status = to.as_str().to_string();
        order.updated_at = now();
        Ok(Some(order.clone()))
    }
}

fn apply_product_fields(model: &mut products::Model, fields: ProductFields) {
    model.name_fr = fields.name_fr;
    model.name_ar = fields.name_ar;
    model.slug = fields.slug;
    model.description = fields.description;
    model.price_dzd = fields.price_dzd;
    model.stock = fields.stock;
    model.category_id = fields.category_id;
    model.is_active = fields.is_active;
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<products::Model>> {
        self.touch();
        Ok(self.products.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<products::Model>> {
        self.touch();
        let products = self.products.lock().unwrap();
        Ok(products.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
    }

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<products::Model>> {
        self.touch();
        Ok(self.products.lock().unwrap().iter().find(|p| p.slug == slug).cloned())
    }

    async fn list(&self, filter: ProductFilter) -> AppResult<(Vec<products::Model>, u64)> {
        self.touch();
        let mut rows: Vec<products::Model> = self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| !filter.active_only || p.is_active)
            .filter(|p| match &filter.category_ids {
                Some(ids) => p.category_id.is_some_and(|c| ids.contains(&c)),
                None => true,
            })
            .cloned()
            .collect();
        rows.reverse();
        let total = rows.len() as u64;
        let page = rows
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn insert(&self, fields: ProductFields) -> AppResult<products::Model> {
        self.touch();
        let mut model = products::Model {
            id: Uuid::new_v4(),
            name_fr: String::new(),
            name_ar: String::new(),
            slug: String::new(),
            description: None,
            price_dzd: 0,
            stock: 0,
            category_id: None,
            is_active: true,
            created_at: now(),
        };
        apply_product_fields(&mut model, fields);
        self.products.lock().unwrap().push(model.clone());
        Ok(model)
    }

    async fn update(&self, id: Uuid, fields: ProductFields) -> AppResult<Option<products::Model>> {
        self.touch();
        let mut products = self.products.lock().unwrap();
        let Some(model) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        apply_product_fields(model, fields);
        Ok(Some(model.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        self.touch();
        let mut products = self.products.lock().unwrap();
        let before = products.len();
        products.retain(|p| p.id != id);
        Ok(products.len() != before)
    }

    async fn count_in_category(&self, category_id: Uuid) -> AppResult<u64> {
        self.touch();
        let products = self.products.lock().unwrap();
        Ok(products
            .iter()
            .filter(|p| p.category_id == Some(category_id))
            .count() as u64)
    }

    async fn has_order_items(&self, id: Uuid) -> AppResult<bool> {
        self.touch();
        Ok(self.order_items.lock().unwrap().iter().any(|i| i.product_id == id))
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<categories::Model>> {
        self.touch();
        Ok(self.categories.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn all(&self) -> AppResult<Vec<categories::Model>> {
        self.touch();
        Ok(self.categories.lock().unwrap().clone())
    }

    async fn children_of(&self, parent_id: Option<Uuid>) -> AppResult<Vec<categories::Model>> {
        self.touch();
        let mut children: Vec<categories::Model> = self
            .categories
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.parent_id == parent_id)
            .cloned()
            .collect();
        children.sort_by_key(|c| c.sort_order);
        Ok(children)
    }

    async fn slug_taken(
        &self,
        slug: &str,
        department_id: Option<Uuid>,
        exclude: Option<Uuid>,
    ) -> AppResult<bool> {
        self.touch();
        if self.skip_slug_check.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let categories = self.categories.lock().unwrap();
        Ok(slug_in_use(&categories, slug, department_id, exclude))
    }

    async fn insert(&self, category: NewCategory) -> AppResult<categories::Model> {
        self.touch();
        let mut categories = self.categories.lock().unwrap();
        if slug_in_use(&categories, &category.slug, category.department_id, None) {
            return Err(unique_violation("categories_department_slug"));
        }
        let model = categories::Model {
            id: Uuid::new_v4(),
            parent_id: category.parent_id,
            department_id: category.department_id,
            depth: category.depth,
            name_fr: category.name_fr,
            name_ar: category.name_ar,
            slug: category.slug,
            sort_order: category.sort_order,
            is_active: true,
            created_at: now(),
            updated_at: now(),
        };
        categories.push(model.clone());
        Ok(model)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> AppResult<Option<categories::Model>> {
        self.touch();
        let mut categories = self.categories.lock().unwrap();
        let Some(department_id) = categories.iter().find(|c| c.id == id).map(|c| c.department_id)
        else {
            return Ok(None);
        };
        if slug_in_use(&categories, &changes.slug, department_id, Some(id)) {
            return Err(unique_violation("categories_department_slug"));
        }
        let Some(model) = categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        model.name_fr = changes.name_fr;
        model.name_ar = changes.name_ar;
        model.slug = changes.slug;
        model.updated_at = now();
        Ok(Some(model.clone()))
    }

    async fn swap_sort_order(&self, a: Uuid, b: Uuid) -> AppResult<()> {
        self.touch();
        let mut categories = self.categories.lock().unwrap();
        let order_of = |id: Uuid, list: &[categories::Model]| {
            list.iter().find(|c| c.id == id).map(|c| c.sort_order)
        };
        let (Some(order_a), Some(order_b)) = (order_of(a, &categories), order_of(b, &categories))
        else {
            return Err(AppError::NotFound);
        };
        for c in categories.iter_mut() {
            if c.id == a {
                c.sort_order = order_b;
            } else if c.id == b {
                c.sort_order = order_a;
            }
        }
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Option<categories::Model>> {
        self.touch();
        let mut categories = self.categories.lock().unwrap();
        let Some(model) = categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        model.is_active = active;
        Ok(Some(model.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        self.touch();
        let mut categories = self.categories.lock().unwrap();
        let before = categories.len();
        categories.retain(|c| c.id != id);
        Ok(categories.len() != before)
    }
}

#[async_trait]
impl StaffRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<staff_users::Model>> {
        self.touch();
        Ok(self.staff.lock().unwrap().iter().find(|s| s.email == email).cloned())
    }
}

#[async_trait]
impl StoreSettingsRepository for MemoryStore {
    async fn load(&self) -> AppResult<Option<store_settings::Model>> {
        self.touch();
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn save(&self, settings: StoreSettings) -> AppResult<store_settings::Model> {
        self.touch();
        let model = store_settings::Model {
            id: 1,
            store_name: settings.store_name,
            contact_phone: settings.contact_phone,
            contact_email: settings.contact_email,
            address: settings.address,
            facebook_url: settings.facebook_url,
            instagram_url: settings.instagram_url,
            updated_at: now(),
        };
        *self.settings.lock().unwrap() = Some(model.clone());
        Ok(model)
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn record(&self, entry: AuditEntry) -> AppResult<()> {
        self.audit.lock().unwrap().push(entry);
        Ok(())
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: JWT_SECRET.into(),
        secure_cookies: false,
        order_cache_ttl_secs: 30,
    }
}

pub fn test_state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let repos = Repositories {
        customers: store.clone(),
        orders: store.clone(),
        products: store.clone(),
        categories: store.clone(),
        staff: store.clone(),
        settings: store.clone(),
        audit: store.clone(),
    };
    (AppState::new(test_config(), repos), store)
}

pub fn app(state: &AppState) -> Router {
    create_app(state.clone())
}

pub fn admin_user() -> AdminUser {
    AdminUser {
        staff_id: Uuid::new_v4(),
        email: "admin@boutique.dz".into(),
        role: "admin".into(),
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn form_post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// `name=value` pairs from every `Set-Cookie` header, attributes dropped.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::to_string)
        .collect()
}

/// Raw `Set-Cookie` header for the named cookie.
pub fn set_cookie_header(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

pub fn urlencode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}
