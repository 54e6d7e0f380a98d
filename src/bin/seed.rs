use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_marketplace_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let staff_id = ensure_user(&pool, "staff@example.com", "staff123!", "Staff", "User", true).await?;
    let owner_id = ensure_user(&pool, "owner@example.com", "owner123!", "Olive", "Owner", false).await?;
    let customer_id =
        ensure_user(&pool, "customer@example.com", "customer1", "Carl", "Customer", false).await?;

    let category_id = ensure_category(&pool, "Groceries").await?;
    let shop_id = ensure_shop(&pool, owner_id, category_id, "Corner Grocer").await?;
    seed_products(&pool, shop_id).await?;

    println!(
        "Seed completed. Staff: {staff_id}, Owner: {owner_id}, Customer: {customer_id}, Shop: {shop_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
    is_staff: bool,
) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = row {
        return Ok(id);
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, is_staff)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(password_hash)
    .bind(first_name)
    .bind(last_name)
    .bind(is_staff)
    .execute(pool)
    .await?;
    Ok(id)
}

async fn ensure_category(pool: &sqlx::PgPool, name: &str) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM shop_categories WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = row {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO shop_categories (id, name) VALUES ($1, $2)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(id)
}

async fn ensure_shop(
    pool: &sqlx::PgPool,
    owner_id: Uuid,
    category_id: Uuid,
    name: &str,
) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM shops WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = row {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO shops (id, name, category_id, address, description, opening_hours, owner_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(category_id)
    .bind("1 Market Street")
    .bind("Neighbourhood grocery shop")
    .bind("Mon-Sat 8:00-20:00")
    .bind(owner_id)
    .execute(pool)
    .await?;
    Ok(id)
}

async fn seed_products(pool: &sqlx::PgPool, shop_id: Uuid) -> anyhow::Result<()> {
    let products: [(&str, &str, i32, i64); 3] = [
        ("Sourdough Loaf", "Baked daily", 20, 450),
        ("Whole Milk 1L", "Local dairy", 50, 120),
        ("Free-range Eggs", "Box of 10", 30, 380),
    ];

    for (name, description, quantity, price) in products {
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM products WHERE name = $1 AND shop_id = $2")
                .bind(name)
                .bind(shop_id)
                .fetch_optional(pool)
                .await?;
        if exists.is_some() {
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, quantity, price, shop_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(quantity)
        .bind(price)
        .bind(shop_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}
