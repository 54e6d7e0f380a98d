use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::shops::{
        CategoryList, CreateCategoryRequest, CreateShopRequest, ShopList, ShopWithProducts,
        UpdateShopRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Shop, ShopCategory},
    response::ApiResponse,
    routes::params::Pagination,
    services::shop_service,
    state::AppState,
};

pub fn categories_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/", post(create_category))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_shops))
        .route("/", post(create_shop))
        .route("/mine", get(my_shops))
        .route("/{id}", get(get_shop))
        .route("/{id}", put(update_shop))
        .route("/{id}", delete(delete_shop))
        .route("/{id}/with-products", get(get_shop_with_products))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "List shop categories", body = ApiResponse<CategoryList>)
    ),
    tag = "Shops"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = shop_service::list_categories(&state.pool).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Create category", body = ApiResponse<ShopCategory>),
        (status = 403, description = "Staff only")
    ),
    tag = "Shops"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<Json<ApiResponse<ShopCategory>>> {
    let resp = shop_service::create_category(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shops",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "List shops", body = ApiResponse<ShopList>)
    ),
    tag = "Shops"
)]
pub async fn list_shops(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ShopList>>> {
    let resp = shop_service::list_shops(&state.pool, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shops/mine",
    responses(
        (status = 200, description = "Shops owned by the caller", body = ApiResponse<ShopList>),
        (status = 401, description = "Unauthenticated")
    ),
    tag = "Shops"
)]
pub async fn my_shops(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ShopList>>> {
    let resp = shop_service::my_shops(&state.pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shops/{id}",
    params(("id" = Uuid, Path, description = "Shop ID")),
    responses(
        (status = 200, description = "Get shop", body = ApiResponse<Shop>),
        (status = 404, description = "Shop not found"),
    ),
    tag = "Shops"
)]
pub async fn get_shop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = shop_service::get_shop(&state.pool, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shops/{id}/with-products",
    params(("id" = Uuid, Path, description = "Shop ID")),
    responses(
        (status = 200, description = "Shop with its products", body = ApiResponse<ShopWithProducts>),
        (status = 404, description = "Shop not found"),
    ),
    tag = "Shops"
)]
pub async fn get_shop_with_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ShopWithProducts>>> {
    let resp = shop_service::get_shop_with_products(&state.pool, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/shops",
    request_body = CreateShopRequest,
    responses(
        (status = 201, description = "Create shop, caller becomes owner", body = ApiResponse<Shop>),
        (status = 400, description = "Invalid payload")
    ),
    tag = "Shops"
)]
pub async fn create_shop(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateShopRequest>,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = shop_service::create_shop(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/shops/{id}",
    params(("id" = Uuid, Path, description = "Shop ID")),
    request_body = UpdateShopRequest,
    responses(
        (status = 200, description = "Updated shop", body = ApiResponse<Shop>),
        (status = 403, description = "Not the owner")
    ),
    tag = "Shops"
)]
pub async fn update_shop(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateShopRequest>,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = shop_service::update_shop(&state.pool, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/shops/{id}",
    params(("id" = Uuid, Path, description = "Shop ID")),
    responses(
        (status = 200, description = "Deleted shop"),
        (status = 403, description = "Not the owner")
    ),
    tag = "Shops"
)]
pub async fn delete_shop(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = shop_service::delete_shop(&state.pool, &user, id).await?;
    Ok(Json(resp))
}
