use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::{AuditAction, log_audit},
    dto::orders::{
        CreateOrderRequest, OrderDetail, OrderItemDetail, OrderList, ProductSummary, ShopSummary,
        UpdateOrderStatusRequest,
    },
    entity::{
        order_items::ActiveModel as OrderItemActive,
        orders::{ActiveModel as OrderActive, Entity as Orders},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderStatus},
    policies,
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    state::AppState,
};

/// Order line joined with its product and shop names, as read from the store.
#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    order_id: Uuid,
    quantity: i32,
    unit_price: i64,
    product_id: Uuid,
    product_name: String,
    shop_id: Uuid,
    shop_name: String,
}

const ITEMS_FOR_ORDERS_SQL: &str = r#"
    SELECT oi.id, oi.order_id, oi.quantity, oi.unit_price,
           p.id AS product_id, p.name AS product_name,
           s.id AS shop_id, s.name AS shop_name
    FROM order_items oi
    JOIN products p ON p.id = oi.product_id
    JOIN shops s ON s.id = oi.shop_id
    WHERE oi.order_id = ANY($1)
    ORDER BY oi.created_at
"#;

/// Creates the order and all of its items in one transaction; any validation
/// or persistence failure rolls the whole thing back.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest(
            "Order must contain at least one item".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for item in &payload.items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest(
                "quantity must be greater than 0".into(),
            ));
        }

        let product = Products::find_by_id(item.product_id).one(&txn).await?;
        let product = match product {
            Some(p) => p,
            None => {
                return Err(AppError::BadRequest(format!(
                    "product {} not found",
                    item.product_id
                )));
            }
        };
        if product.shop_id != item.shop_id {
            return Err(AppError::BadRequest(format!(
                "product {} does not belong to shop {}",
                item.product_id, item.shop_id
            )));
        }

        // Unit price is snapshotted here so later price edits do not rewrite
        // historical totals.
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(item.product_id),
            shop_id: Set(item.shop_id),
            quantity: Set(item.quantity),
            unit_price: Set(product.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderCreate,
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let detail = load_order_detail(state, order.id).await?;
    Ok(ApiResponse::success(
        "Order created",
        detail,
        Some(Meta::empty()),
    ))
}

/// Visible to the order's owner, to owners of any shop among its items, and
/// to staff; anyone else sees a 404.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = find_order(state, id).await?;

    let visible = user.staff
        || order.user_id == user.user_id
        || policies::owns_shop_in_order(&state.pool, user, id).await?;
    if !visible {
        return Err(AppError::NotFound);
    }

    let detail = load_order_detail(state, id).await?;
    Ok(ApiResponse::success("OK", detail, Some(Meta::empty())))
}

/// Status transitions: staff and owners of a shop in the order may set any
/// recognized status; the ordering customer may only reject (cancel). The
/// order row is locked for the duration of the update.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    let new_status =
        OrderStatus::parse(&payload.status).ok_or_else(|| AppError::BadRequest("Invalid status".into()))?;

    let owns_shop = policies::owns_shop_in_order(&state.pool, user, id).await?;

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let allowed = user.staff
        || owns_shop
        || (order.user_id == user.user_id && new_status == OrderStatus::Rejected);
    if !allowed {
        return Err(AppError::Forbidden);
    }

    let mut active: OrderActive = order.into();
    active.status = Set(new_status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderStatusUpdate,
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let detail = load_order_detail(state, order.id).await?;
    Ok(ApiResponse::success(
        "Order updated",
        detail,
        Some(Meta::empty()),
    ))
}

/// Customer scope: only the actor's own orders, newest first.
pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let status = normalize_status_filter(query.status)?;

    let orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user.user_id)
    .bind(status.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        "SELECT count(*) FROM orders WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)",
    )
    .bind(user.user_id)
    .bind(status.as_deref())
    .fetch_one(&state.pool)
    .await?;

    build_order_list(state, orders, Meta::new(page, limit, total.0)).await
}

/// Shop-owner scope: every order with at least one item from a shop the actor
/// owns, each exactly once, newest first.
pub async fn list_shop_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    policies::ensure_shop_owner(&state.pool, user).await?;

    let (page, limit, offset) = query.pagination().normalize();
    let status = normalize_status_filter(query.status)?;

    let orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT DISTINCT o.id, o.user_id, o.status, o.created_at, o.updated_at
        FROM orders o
        JOIN order_items oi ON oi.order_id = o.id
        JOIN shops s ON s.id = oi.shop_id
        WHERE s.owner_id = $1 AND ($2::text IS NULL OR o.status = $2)
        ORDER BY o.created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user.user_id)
    .bind(status.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT count(DISTINCT o.id)
        FROM orders o
        JOIN order_items oi ON oi.order_id = o.id
        JOIN shops s ON s.id = oi.shop_id
        WHERE s.owner_id = $1 AND ($2::text IS NULL OR o.status = $2)
        "#,
    )
    .bind(user.user_id)
    .bind(status.as_deref())
    .fetch_one(&state.pool)
    .await?;

    build_order_list(state, orders, Meta::new(page, limit, total.0)).await
}

/// Orders containing items of one specific shop, gated on owning that shop.
pub async fn list_orders_for_shop(
    state: &AppState,
    user: &AuthUser,
    shop_id: Uuid,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    policies::ensure_owns_shop(&state.pool, user, shop_id).await?;

    let (page, limit, offset) = query.pagination().normalize();
    let status = normalize_status_filter(query.status)?;

    let orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT DISTINCT o.id, o.user_id, o.status, o.created_at, o.updated_at
        FROM orders o
        JOIN order_items oi ON oi.order_id = o.id
        WHERE oi.shop_id = $1 AND ($2::text IS NULL OR o.status = $2)
        ORDER BY o.created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(shop_id)
    .bind(status.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT count(DISTINCT o.id)
        FROM orders o
        JOIN order_items oi ON oi.order_id = o.id
        WHERE oi.shop_id = $1 AND ($2::text IS NULL OR o.status = $2)
        "#,
    )
    .bind(shop_id)
    .bind(status.as_deref())
    .fetch_one(&state.pool)
    .await?;

    build_order_list(state, orders, Meta::new(page, limit, total.0)).await
}

async fn build_order_list(
    state: &AppState,
    orders: Vec<Order>,
    meta: Meta,
) -> AppResult<ApiResponse<OrderList>> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = if ids.is_empty() {
        Vec::new()
    } else {
        sqlx::query_as::<_, ItemRow>(ITEMS_FOR_ORDERS_SQL)
            .bind(&ids)
            .fetch_all(&state.pool)
            .await?
    };

    let details = assemble_orders(orders, items);
    let message = if details.is_empty() {
        "No orders found"
    } else {
        "Orders"
    };
    Ok(ApiResponse::success(
        message,
        OrderList { items: details },
        Some(meta),
    ))
}

async fn find_order(state: &AppState, id: Uuid) -> AppResult<Order> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    order.ok_or(AppError::NotFound)
}

async fn load_order_detail(state: &AppState, id: Uuid) -> AppResult<OrderDetail> {
    let order = find_order(state, id).await?;
    let items = sqlx::query_as::<_, ItemRow>(ITEMS_FOR_ORDERS_SQL)
        .bind(vec![id])
        .fetch_all(&state.pool)
        .await?;

    assemble_orders(vec![order], items)
        .pop()
        .ok_or(AppError::NotFound)
}

fn normalize_status_filter(status: Option<String>) -> AppResult<Option<String>> {
    match status.filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => {
            let parsed = OrderStatus::parse(&s)
                .ok_or_else(|| AppError::BadRequest("Invalid status".into()))?;
            Ok(Some(parsed.as_str().to_string()))
        }
    }
}

/// Groups item rows under their orders and derives the aggregates: line
/// totals, the order total and the distinct shop names. Input order of
/// `orders` is preserved.
fn assemble_orders(orders: Vec<Order>, items: Vec<ItemRow>) -> Vec<OrderDetail> {
    let mut details: Vec<OrderDetail> = orders
        .into_iter()
        .map(|order| OrderDetail {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            created_at: order.created_at,
            items: Vec::new(),
            total_sum: 0,
            shop_names: Vec::new(),
        })
        .collect();

    for row in items {
        let Some(detail) = details.iter_mut().find(|d| d.id == row.order_id) else {
            continue;
        };
        let total_price = row.unit_price * row.quantity as i64;
        detail.total_sum += total_price;
        if !detail.shop_names.contains(&row.shop_name) {
            detail.shop_names.push(row.shop_name.clone());
        }
        detail.items.push(OrderItemDetail {
            id: row.id,
            product: ProductSummary {
                id: row.product_id,
                name: row.product_name,
            },
            shop: ShopSummary {
                id: row.shop_id,
                name: row.shop_name,
            },
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price,
        });
    }

    details
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: Uuid) -> Order {
        let now = Utc::now();
        Order {
            id,
            user_id: Uuid::new_v4(),
            status: "pending".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn item(order_id: Uuid, shop_name: &str, quantity: i32, unit_price: i64) -> ItemRow {
        ItemRow {
            id: Uuid::new_v4(),
            order_id,
            quantity,
            unit_price,
            product_id: Uuid::new_v4(),
            product_name: "p".into(),
            shop_id: Uuid::new_v4(),
            shop_name: shop_name.into(),
        }
    }

    #[test]
    fn totals_are_sums_of_line_totals() {
        let id = Uuid::new_v4();
        let details = assemble_orders(
            vec![order(id)],
            vec![item(id, "S1", 3, 1000), item(id, "S2", 2, 250)],
        );
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].total_sum, 3500);
        assert_eq!(details[0].items[0].total_price, 3000);
        assert_eq!(details[0].items[1].total_price, 500);
    }

    #[test]
    fn shop_names_are_deduplicated() {
        let id = Uuid::new_v4();
        let details = assemble_orders(
            vec![order(id)],
            vec![
                item(id, "S1", 1, 100),
                item(id, "S1", 2, 100),
                item(id, "S2", 1, 100),
            ],
        );
        assert_eq!(details[0].shop_names, vec!["S1", "S2"]);
        assert_eq!(details[0].items.len(), 3);
    }

    #[test]
    fn items_attach_to_their_own_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let details = assemble_orders(
            vec![order(a), order(b)],
            vec![item(a, "S1", 1, 100), item(b, "S2", 1, 200)],
        );
        assert_eq!(details[0].items.len(), 1);
        assert_eq!(details[0].total_sum, 100);
        assert_eq!(details[1].items.len(), 1);
        assert_eq!(details[1].total_sum, 200);
    }

    #[test]
    fn orders_without_items_have_zero_totals() {
        let details = assemble_orders(vec![order(Uuid::new_v4())], Vec::new());
        assert_eq!(details[0].total_sum, 0);
        assert!(details[0].items.is_empty());
        assert!(details[0].shop_names.is_empty());
    }
}
