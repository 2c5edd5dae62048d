pub mod auth;
pub mod categories;
pub mod checkout;
pub mod orders;
pub mod products;
