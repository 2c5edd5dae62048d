pub mod auth_service;
pub mod category_service;
pub mod checkout_service;
pub mod order_admin_service;
pub mod product_service;
pub mod settings_service;
