use uuid::Uuid;

use crate::{
    audit::{AuditAction, log_audit},
    db::DbPool,
    dto::shops::{
        CategoryList, CreateCategoryRequest, CreateShopRequest, ShopList, ShopWithProducts,
        UpdateShopRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{Product, Shop, ShopCategory},
    policies,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

pub async fn list_categories(pool: &DbPool) -> AppResult<ApiResponse<CategoryList>> {
    let items = sqlx::query_as::<_, ShopCategory>("SELECT * FROM shop_categories ORDER BY name")
        .fetch_all(pool)
        .await?;

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::total_only(total)),
    ))
}

pub async fn create_category(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<ShopCategory>> {
    ensure_staff(user)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }

    let category = sqlx::query_as::<_, ShopCategory>(
        "INSERT INTO shop_categories (id, name) VALUES ($1, $2) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(payload.name.trim())
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        AuditAction::CategoryCreate,
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Category created",
        category,
        Some(Meta::empty()),
    ))
}

pub async fn list_shops(
    pool: &DbPool,
    pagination: Pagination,
) -> AppResult<ApiResponse<ShopList>> {
    let (page, limit, offset) = pagination.normalize();
    let items = sqlx::query_as::<_, Shop>(
        "SELECT * FROM shops ORDER BY name LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT count(*) FROM shops")
        .fetch_one(pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Shops", ShopList { items }, Some(meta)))
}

pub async fn get_shop(pool: &DbPool, id: Uuid) -> AppResult<ApiResponse<Shop>> {
    let shop = find_shop(pool, id).await?;
    Ok(ApiResponse::success("Shop", shop, None))
}

pub async fn get_shop_with_products(
    pool: &DbPool,
    id: Uuid,
) -> AppResult<ApiResponse<ShopWithProducts>> {
    let shop = find_shop(pool, id).await?;

    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE shop_id = $1 ORDER BY name",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(
        "Shop",
        ShopWithProducts { shop, products },
        None,
    ))
}

/// Shops owned by the acting user.
pub async fn my_shops(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<ShopList>> {
    let items = sqlx::query_as::<_, Shop>(
        "SELECT * FROM shops WHERE owner_id = $1 ORDER BY name",
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    let total = items.len() as i64;
    let message = if items.is_empty() {
        "You do not own any shops yet"
    } else {
        "Shops"
    };
    Ok(ApiResponse::success(
        message,
        ShopList { items },
        Some(Meta::total_only(total)),
    ))
}

/// The creator becomes the shop's owner.
pub async fn create_shop(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateShopRequest,
) -> AppResult<ApiResponse<Shop>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }

    let category_exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM shop_categories WHERE id = $1)")
            .bind(payload.category_id)
            .fetch_one(pool)
            .await?;
    if !category_exists.0 {
        return Err(AppError::BadRequest("category not found".into()));
    }

    let shop = sqlx::query_as::<_, Shop>(
        r#"
        INSERT INTO shops
            (id, name, category_id, address, description, latitude, longitude,
             picture_url, opening_hours, owner_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.name.trim())
    .bind(payload.category_id)
    .bind(payload.address)
    .bind(payload.description)
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.picture_url)
    .bind(payload.opening_hours.unwrap_or_default())
    .bind(user.user_id)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        AuditAction::ShopCreate,
        Some(serde_json::json!({ "shop_id": shop.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Shop created",
        shop,
        Some(Meta::empty()),
    ))
}

pub async fn update_shop(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateShopRequest,
) -> AppResult<ApiResponse<Shop>> {
    policies::ensure_owns_shop(pool, user, id).await?;
    let existing = find_shop(pool, id).await?;

    if let Some(category_id) = payload.category_id {
        let category_exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM shop_categories WHERE id = $1)")
                .bind(category_id)
                .fetch_one(pool)
                .await?;
        if !category_exists.0 {
            return Err(AppError::BadRequest("category not found".into()));
        }
    }

    let name = payload.name.unwrap_or(existing.name);
    let category_id = payload.category_id.unwrap_or(existing.category_id);
    let address = payload.address.unwrap_or(existing.address);
    let description = payload.description.unwrap_or(existing.description);
    let latitude = payload.latitude.or(existing.latitude);
    let longitude = payload.longitude.or(existing.longitude);
    let picture_url = payload.picture_url.or(existing.picture_url);
    let opening_hours = payload.opening_hours.unwrap_or(existing.opening_hours);

    let shop = sqlx::query_as::<_, Shop>(
        r#"
        UPDATE shops
        SET name = $2, category_id = $3, address = $4, description = $5,
            latitude = $6, longitude = $7, picture_url = $8, opening_hours = $9
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(category_id)
    .bind(address)
    .bind(description)
    .bind(latitude)
    .bind(longitude)
    .bind(picture_url)
    .bind(opening_hours)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        AuditAction::ShopUpdate,
        Some(serde_json::json!({ "shop_id": shop.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Updated", shop, Some(Meta::empty())))
}

/// Deleting a shop cascades to its products and order items.
pub async fn delete_shop(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    policies::ensure_owns_shop(pool, user, id).await?;

    let result = sqlx::query("DELETE FROM shops WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        AuditAction::ShopDelete,
        Some(serde_json::json!({ "shop_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn find_shop(pool: &DbPool, id: Uuid) -> AppResult<Shop> {
    let shop = sqlx::query_as::<_, Shop>("SELECT * FROM shops WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    shop.ok_or(AppError::NotFound)
}
