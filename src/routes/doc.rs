use utoipa::{
    Modify, OpenApi,
    openapi::{
        self, OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    category_path::CategoryPath,
    dto::{
        auth::{LoginRequest, RegisterRequest, StaffLoginRequest, StaffLoginResponse, UpdateProfileRequest},
        categories::{CanDelete, CategoryTree, CreateCategoryRequest, UpdateCategoryRequest},
        checkout::{CartLine, CartProduct, CheckoutForm, PlacedOrder},
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products::{ProductList, ProductRequest},
    },
    error::ErrorData,
    models::{
        AddressSnapshot, Category, CategoryNode, CustomerProfile, DeliveryMethod, Order,
        OrderItem, OrderStatus, PaymentMethod, Product, StoreSettings,
    },
    response::{ApiResponse, Meta},
    routes::{account, admin, auth, catalog, checkout, health, params},
    session::SESSION_COOKIE,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        account::get_profile,
        account::update_profile,
        account::list_orders,
        account::get_order,
        checkout::place_order,
        catalog::category_tree,
        catalog::list_products,
        catalog::get_product,
        catalog::get_settings,
        admin::staff_login,
        admin::list_orders,
        admin::get_order,
        admin::update_order_status,
        admin::category_tree,
        admin::create_category,
        admin::update_category,
        admin::can_delete_category,
        admin::delete_category,
        admin::move_category_up,
        admin::move_category_down,
        admin::toggle_category,
        admin::list_products,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::toggle_product,
        admin::save_settings
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            UpdateProfileRequest,
            StaffLoginRequest,
            StaffLoginResponse,
            CustomerProfile,
            CheckoutForm,
            CartLine,
            CartProduct,
            PlacedOrder,
            AddressSnapshot,
            OrderStatus,
            DeliveryMethod,
            PaymentMethod,
            Order,
            OrderItem,
            OrderList,
            OrderWithItems,
            UpdateOrderStatusRequest,
            Category,
            CategoryNode,
            CategoryTree,
            CategoryPath,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CanDelete,
            Product,
            ProductList,
            ProductRequest,
            StoreSettings,
            ErrorData,
            params::Pagination,
            params::SortOrder,
            Meta,
            ApiResponse<PlacedOrder>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<ProductList>,
            ApiResponse<CategoryTree>,
            ApiResponse<ErrorData>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Customer registration, login and logout"),
        (name = "Account", description = "Logged-in customer profile and order history"),
        (name = "Checkout", description = "Order placement"),
        (name = "Catalog", description = "Storefront categories, products and store settings"),
        (name = "Admin", description = "Back-office endpoints, staff token required"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
