use axum_marketplace_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        orders::{CreateOrderRequest, OrderItemInput},
        products::{CreateProductRequest, UpdateProductRequest},
        shops::{CreateCategoryRequest, CreateShopRequest, UpdateShopRequest},
    },
    error::AppError,
    middleware::auth::AuthUser,
    services::{order_service, product_service, shop_service},
    state::AppState,
};
use axum_marketplace_api::entity::users::ActiveModel as UserActive;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

// Ownership rules across shops and products, and the unit-price snapshot:
// editing a product's price after an order exists must not change the
// order's historical total.
#[tokio::test]
async fn shop_ownership_and_price_snapshot_flow() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let owner = auth_user(create_user(&state, "owner@shops.test", false).await?, false);
    let outsider = auth_user(create_user(&state, "outsider@shops.test", false).await?, false);
    let staff = auth_user(create_user(&state, "staff@shops.test", true).await?, true);
    let customer = auth_user(create_user(&state, "customer@shops.test", false).await?, false);

    // Categories are staff-only.
    let err = shop_service::create_category(
        &state.pool,
        &outsider,
        CreateCategoryRequest {
            name: "Bakeries".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let category = shop_service::create_category(
        &state.pool,
        &staff,
        CreateCategoryRequest {
            name: "Bakeries".into(),
        },
    )
    .await?
    .data
    .unwrap();

    // The creator becomes the shop's owner.
    let shop = shop_service::create_shop(
        &state.pool,
        &owner,
        CreateShopRequest {
            name: "Rise & Shine".into(),
            category_id: category.id,
            address: "2 Oven Lane".into(),
            description: "Bread and pastry".into(),
            latitude: None,
            longitude: None,
            picture_url: None,
            opening_hours: Some("7:00-15:00".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(shop.owner_id, Some(owner.user_id));

    let mine = shop_service::my_shops(&state.pool, &owner).await?;
    assert_eq!(mine.data.unwrap().items.len(), 1);
    let mine = shop_service::my_shops(&state.pool, &outsider).await?;
    assert_eq!(mine.meta.unwrap().total, Some(0));

    // Mutating someone else's shop is denied; staff pass.
    let rename = UpdateShopRequest {
        name: Some("Rise & Grind".into()),
        category_id: None,
        address: None,
        description: None,
        latitude: None,
        longitude: None,
        picture_url: None,
        opening_hours: None,
    };
    let err = shop_service::update_shop(&state.pool, &outsider, shop.id, rename)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let renamed = shop_service::update_shop(
        &state.pool,
        &staff,
        shop.id,
        UpdateShopRequest {
            name: Some("Rise & Grind".into()),
            category_id: None,
            address: None,
            description: None,
            latitude: None,
            longitude: None,
            picture_url: None,
            opening_hours: None,
        },
    )
    .await?;
    assert_eq!(renamed.data.unwrap().name, "Rise & Grind");

    // Creating a product requires owning the target shop.
    let err = product_service::create_product(
        &state,
        &outsider,
        CreateProductRequest {
            name: "Croissant".into(),
            description: "Plain".into(),
            quantity: 40,
            price: 10,
            shop_id: shop.id,
            picture_url: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let product = product_service::create_product(
        &state,
        &owner,
        CreateProductRequest {
            name: "Croissant".into(),
            description: "Plain".into(),
            quantity: 40,
            price: 10,
            shop_id: shop.id,
            picture_url: None,
        },
    )
    .await?
    .data
    .unwrap();

    // An order freezes the unit price at creation time.
    let order = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            items: vec![OrderItemInput {
                product_id: product.id,
                shop_id: shop.id,
                quantity: 2,
            }],
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(order.total_sum, 20);

    product_service::update_product(
        &state,
        &owner,
        product.id,
        UpdateProductRequest {
            name: None,
            description: None,
            quantity: None,
            price: Some(99),
            picture_url: None,
        },
    )
    .await?;

    let reread = order_service::get_order(&state, &customer, order.id).await?;
    let reread = reread.data.unwrap();
    assert_eq!(reread.total_sum, 20);
    assert_eq!(reread.items[0].unit_price, 10);

    // Deleting the shop cascades to its products.
    shop_service::delete_shop(&state.pool, &owner, shop.id).await?;
    let err = product_service::get_product(&state, product.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

fn auth_user(user_id: Uuid, staff: bool) -> AuthUser {
    AuthUser { user_id, staff }
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(database_url).await?;

    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, products, shops, shop_categories, audit_logs, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState { pool, orm })
}

async fn create_user(state: &AppState, email: &str, is_staff: bool) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        first_name: Set("Test".into()),
        last_name: Set("User".into()),
        is_staff: Set(is_staff),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
