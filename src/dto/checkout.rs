use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Checkout form as posted by the storefront.
///
/// Numbers arrive as text and are parsed by the workflow so that a blank
/// field reads as missing information.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub stop_desk_name: Option<String>,
    pub wilaya_code: Option<String>,
    pub delivery_method: Option<String>,
    pub payment_method: Option<String>,
    /// JSON array of `{product: {id, ...}, quantity, variantId?}`.
    pub cart_items: Option<String>,
    pub subtotal: Option<String>,
    pub shipping: Option<String>,
    pub total: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product: CartProduct,
    pub quantity: i32,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
}

/// Only the id is trusted; title and price come from the catalog.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CartProduct {
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub success: bool,
    pub order_id: Uuid,
    pub order_number: String,
}
