use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Product, Shop, ShopCategory};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateShopRequest {
    pub name: String,
    pub category_id: Uuid,
    pub address: String,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub picture_url: Option<String>,
    pub opening_hours: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateShopRequest {
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub picture_url: Option<String>,
    pub opening_hours: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<ShopCategory>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopList {
    pub items: Vec<Shop>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopWithProducts {
    pub shop: Shop,
    pub products: Vec<Product>,
}
