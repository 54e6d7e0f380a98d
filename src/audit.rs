use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// Actions recorded in the append-only audit trail.
#[derive(Debug, Clone, Copy)]
pub enum AuditAction {
    UserRegister,
    UserLogin,
    ProfileUpdate,
    CategoryCreate,
    ShopCreate,
    ShopUpdate,
    ShopDelete,
    ProductCreate,
    ProductUpdate,
    ProductDelete,
    OrderCreate,
    OrderStatusUpdate,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegister => "user_register",
            AuditAction::UserLogin => "user_login",
            AuditAction::ProfileUpdate => "profile_update",
            AuditAction::CategoryCreate => "category_create",
            AuditAction::ShopCreate => "shop_create",
            AuditAction::ShopUpdate => "shop_update",
            AuditAction::ShopDelete => "shop_delete",
            AuditAction::ProductCreate => "product_create",
            AuditAction::ProductUpdate => "product_update",
            AuditAction::ProductDelete => "product_delete",
            AuditAction::OrderCreate => "order_create",
            AuditAction::OrderStatusUpdate => "order_status_update",
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            AuditAction::UserRegister
            | AuditAction::UserLogin
            | AuditAction::ProfileUpdate => "users",
            AuditAction::CategoryCreate => "shop_categories",
            AuditAction::ShopCreate | AuditAction::ShopUpdate | AuditAction::ShopDelete => "shops",
            AuditAction::ProductCreate
            | AuditAction::ProductUpdate
            | AuditAction::ProductDelete => "products",
            AuditAction::OrderCreate | AuditAction::OrderStatusUpdate => "orders",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}
