use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest},
        orders::{
            CreateOrderRequest, OrderDetail, OrderItemDetail, OrderItemInput, OrderList,
            ProductSummary, ShopSummary, UpdateOrderStatusRequest,
        },
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        shops::{
            CategoryList, CreateCategoryRequest, CreateShopRequest, ShopList, ShopWithProducts,
            UpdateShopRequest,
        },
    },
    models::{Order, OrderItem, Product, Shop, ShopCategory, UserPublic},
    response::{ApiResponse, Meta},
    routes::{auth, health, orders, params, products as product_routes, shops as shop_routes},
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
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::profile,
        auth::update_profile,
        shop_routes::list_categories,
        shop_routes::create_category,
        shop_routes::list_shops,
        shop_routes::my_shops,
        shop_routes::get_shop,
        shop_routes::get_shop_with_products,
        shop_routes::create_shop,
        shop_routes::update_shop,
        shop_routes::delete_shop,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::delete_product,
        orders::list_my_orders,
        orders::create_order,
        orders::list_shop_orders,
        orders::list_orders_for_shop,
        orders::get_order,
        orders::update_order_status
    ),
    components(
        schemas(
            UserPublic,
            ShopCategory,
            Shop,
            Product,
            Order,
            OrderItem,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            CreateCategoryRequest,
            CreateShopRequest,
            UpdateShopRequest,
            CategoryList,
            ShopList,
            ShopWithProducts,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateOrderRequest,
            OrderItemInput,
            UpdateOrderStatusRequest,
            OrderDetail,
            OrderItemDetail,
            ProductSummary,
            ShopSummary,
            OrderList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<UserPublic>,
            ApiResponse<Shop>,
            ApiResponse<ShopList>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderDetail>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication and profile endpoints"),
        (name = "Shops", description = "Shop and category endpoints"),
        (name = "Products", description = "Product endpoints"),
        (name = "Orders", description = "Order endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
