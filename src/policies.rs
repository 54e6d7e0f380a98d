//! Ownership predicates over (actor, resource). Read endpoints pass without
//! authentication; mutation requires ownership or the staff flag. Denials are
//! `Forbidden` with no side effects.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
};

/// True iff the actor owns at least one shop.
pub async fn is_shop_owner(pool: &DbPool, user: &AuthUser) -> AppResult<bool> {
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM shops WHERE owner_id = $1)")
            .bind(user.user_id)
            .fetch_one(pool)
            .await?;
    Ok(exists.0)
}

/// Gate for shop-owner-only endpoints. Staff pass unconditionally.
pub async fn ensure_shop_owner(pool: &DbPool, user: &AuthUser) -> AppResult<()> {
    if user.staff || is_shop_owner(pool, user).await? {
        return Ok(());
    }
    Err(AppError::Forbidden)
}

/// The actor must be the owner of this specific shop (or staff). A shop that
/// does not exist is reported as not found rather than forbidden.
pub async fn ensure_owns_shop(pool: &DbPool, user: &AuthUser, shop_id: Uuid) -> AppResult<()> {
    let owner: Option<(Option<Uuid>,)> =
        sqlx::query_as("SELECT owner_id FROM shops WHERE id = $1")
            .bind(shop_id)
            .fetch_optional(pool)
            .await?;
    let (owner_id,) = owner.ok_or(AppError::NotFound)?;

    if user.staff || owner_id == Some(user.user_id) {
        return Ok(());
    }
    Err(AppError::Forbidden)
}

/// Ownership of a product is indirect, via its shop.
pub async fn ensure_can_modify_product(
    pool: &DbPool,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<()> {
    let row: Option<(Option<Uuid>,)> = sqlx::query_as(
        r#"
        SELECT s.owner_id
        FROM products p
        JOIN shops s ON s.id = p.shop_id
        WHERE p.id = $1
        "#,
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?;
    let (owner_id,) = row.ok_or(AppError::NotFound)?;

    if user.staff || owner_id == Some(user.user_id) {
        return Ok(());
    }
    Err(AppError::Forbidden)
}

/// True iff the actor owns a shop referenced by at least one item of the order.
pub async fn owns_shop_in_order(
    pool: &DbPool,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<bool> {
    let exists: (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS(
            SELECT 1
            FROM order_items oi
            JOIN shops s ON s.id = oi.shop_id
            WHERE oi.order_id = $1 AND s.owner_id = $2
        )
        "#,
    )
    .bind(order_id)
    .bind(user.user_id)
    .fetch_one(pool)
    .await?;
    Ok(exists.0)
}
