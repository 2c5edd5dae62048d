use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{categories, customer_profiles, order_items, orders, products, store_settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    const FORWARD: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    fn stage(&self) -> Option<usize> {
        Self::FORWARD.iter().position(|s| s == self)
    }

    /// Forward moves along the fulfilment chain, or cancellation of a
    /// non-terminal order.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() || *self == next {
            return false;
        }
        if next == OrderStatus::Cancelled {
            return true;
        }
        match (self.stage(), next.stage()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Home,
    /// Pickup at a stop-desk relay point.
    Desk,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Home => "home",
            DeliveryMethod::Desk => "desk",
        }
    }
}

impl FromStr for DeliveryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "home" => Ok(DeliveryMethod::Home),
            "desk" => Ok(DeliveryMethod::Desk),
            other => Err(format!("unknown delivery method '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    BankTransfer,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cash_on_delivery" | "cod" | "cash" => Ok(PaymentMethod::CashOnDelivery),
            "bank_transfer" | "ccp" => Ok(PaymentMethod::BankTransfer),
            "card" | "cib" | "edahabia" => Ok(PaymentMethod::Card),
            other => Err(format!("unknown payment method '{other}'")),
        }
    }
}

/// Shipping details copied onto the order at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddressSnapshot {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_desk_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub session_id: Uuid,
    pub status: String,
    pub payment_method: String,
    pub delivery_method: String,
    pub wilaya_code: i32,
    pub subtotal_dzd: i64,
    pub shipping_dzd: i64,
    pub total_dzd: i64,
    pub address_snapshot: AddressSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn from_entity(model: orders::Model) -> Result<Self, serde_json::Error> {
        Ok(Self {
            address_snapshot: serde_json::from_value(model.address_snapshot)?,
            id: model.id,
            order_number: model.order_number,
            session_id: model.session_id,
            status: model.status,
            payment_method: model.payment_method,
            delivery_method: model.delivery_method,
            wilaya_code: model.wilaya_code,
            subtotal_dzd: model.subtotal_dzd,
            shipping_dzd: model.shipping_dzd,
            total_dzd: model.total_dzd,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub title_snapshot: String,
    pub unit_price_dzd: i64,
    pub qty: i32,
    pub line_total_dzd: i64,
    pub created_at: DateTime<Utc>,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            variant_id: model.variant_id,
            title_snapshot: model.title_snapshot,
            unit_price_dzd: model.unit_price_dzd,
            qty: model.qty,
            line_total_dzd: model.line_total_dzd,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// Profile as shown to its owner; credentials never leave the server.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerProfile {
    pub session_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub registered: bool,
}

impl From<customer_profiles::Model> for CustomerProfile {
    fn from(model: customer_profiles::Model) -> Self {
        let registered = model.credentials().is_some();
        Self {
            session_id: model.session_id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            registered,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub depth: i16,
    pub name_fr: String,
    pub name_ar: String,
    pub slug: String,
    pub sort_order: i32,
    pub is_active: bool,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            parent_id: model.parent_id,
            depth: model.depth,
            name_fr: model.name_fr,
            name_ar: model.name_ar,
            slug: model.slug,
            sort_order: model.sort_order,
            is_active: model.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    #[schema(no_recursion)]
    pub children: Vec<CategoryNode>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name_fr: String,
    pub name_ar: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_dzd: i64,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    /// Ancestor ids from department down to the product's category.
    pub category_path: Vec<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn from_entity(model: products::Model, category_path: Vec<Uuid>) -> Self {
        Self {
            id: model.id,
            name_fr: model.name_fr,
            name_ar: model.name_ar,
            slug: model.slug,
            description: model.description,
            price_dzd: model.price_dzd,
            stock: model.stock,
            category_id: model.category_id,
            category_path,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StoreSettings {
    pub store_name: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub address: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            store_name: "Boutique Informatique".to_string(),
            contact_phone: None,
            contact_email: None,
            address: None,
            facebook_url: None,
            instagram_url: None,
        }
    }
}

impl From<store_settings::Model> for StoreSettings {
    fn from(model: store_settings::Model) -> Self {
        Self {
            store_name: model.store_name,
            contact_phone: model.contact_phone,
            contact_email: model.contact_email,
            address: model.address,
            facebook_url: model.facebook_url,
            instagram_url: model.instagram_url,
        }
    }
}
