pub mod audit_logs;
pub mod categories;
pub mod customer_profiles;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod staff_users;
pub mod store_settings;

pub use audit_logs::Entity as AuditLogs;
pub use categories::Entity as Categories;
pub use customer_profiles::Entity as CustomerProfiles;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use staff_users::Entity as StaffUsers;
pub use store_settings::Entity as StoreSettings;
