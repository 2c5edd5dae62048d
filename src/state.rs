use std::{
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use moka::future::Cache;

use crate::{
    audit::SqlxAuditLog,
    config::AppConfig,
    db::{DbPool, OrmConn},
    dto::orders::OrderList,
    repository::{
        AuditRepository, CategoryRepository, CustomerRepository, OrderFilter, OrderRepository,
        ProductRepository, SeaOrmStore, StaffRepository, StoreSettingsRepository,
    },
    response::Meta,
};

#[derive(Clone)]
pub struct Repositories {
    pub customers: Arc<dyn CustomerRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub staff: Arc<dyn StaffRepository>,
    pub settings: Arc<dyn StoreSettingsRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl Repositories {
    pub fn postgres(pool: DbPool, orm: OrmConn) -> Self {
        let store = Arc::new(SeaOrmStore::new(orm));
        Self {
            customers: store.clone(),
            orders: store.clone(),
            products: store.clone(),
            categories: store.clone(),
            staff: store.clone(),
            settings: store,
            audit: Arc::new(SqlxAuditLog::new(pool)),
        }
    }
}

/// Short-lived cache of admin order list pages. Any order write clears it.
#[derive(Clone)]
pub struct OrderListCache {
    inner: Cache<OrderFilter, (OrderList, Meta)>,
}

impl OrderListCache {
    pub fn new(ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(256)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }

    pub async fn get(&self, key: &OrderFilter) -> Option<(OrderList, Meta)> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: OrderFilter, value: (OrderList, Meta)) {
        self.inner.insert(key, value).await;
    }

    pub fn invalidate(&self) {
        self.inner.invalidate_all();
    }
}

/// `CH-<epoch millis>` numbers, strictly increasing within the process so two
/// checkouts in the same millisecond never share a number.
#[derive(Debug, Default)]
pub struct OrderNumberGenerator {
    last_millis: AtomicI64,
}

impl OrderNumberGenerator {
    pub fn next(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_millis.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last_millis.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("CH-{candidate}"),
                Err(actual) => last = actual,
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repos: Repositories,
    pub order_cache: OrderListCache,
    pub order_numbers: Arc<OrderNumberGenerator>,
}

impl AppState {
    pub fn new(config: AppConfig, repos: Repositories) -> Self {
        let order_cache = OrderListCache::new(Duration::from_secs(config.order_cache_ttl_secs));
        Self {
            config: Arc::new(config),
            repos,
            order_cache,
            order_numbers: Arc::new(OrderNumberGenerator::default()),
        }
    }

    pub fn postgres(config: AppConfig, pool: DbPool, orm: OrmConn) -> Self {
        Self::new(config, Repositories::postgres(pool, orm))
    }
}
