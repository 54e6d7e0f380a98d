use axum_marketplace_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::auth::{LoginRequest, RegisterRequest, UpdateProfileRequest},
    error::AppError,
    middleware::auth::AuthUser,
    services::auth_service,
};
use sea_orm::{ConnectionTrait, Statement};

// Register -> duplicate register rejected -> login -> profile update.
#[tokio::test]
async fn register_login_and_profile_flow() -> anyhow::Result<()> {
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
    if std::env::var("JWT_SECRET").is_err() {
        // SAFETY: single-threaded at this point, before any login call.
        unsafe { std::env::set_var("JWT_SECRET", "integration-test-secret") };
    }

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(&database_url).await?;

    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, products, shops, shop_categories, audit_logs, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let registered = auth_service::register_user(
        &pool,
        RegisterRequest {
            email: "ada@test.com".into(),
            password: "correct horse".into(),
            first_name: "Ada".into(),
            last_name: "L".into(),
        },
    )
    .await?;
    let user = registered.data.unwrap();
    assert_eq!(user.email, "ada@test.com");
    assert!(!user.is_staff);

    // Short passwords and malformed emails are validation errors.
    let err = auth_service::register_user(
        &pool,
        RegisterRequest {
            email: "bob@test.com".into(),
            password: "short".into(),
            first_name: "Bob".into(),
            last_name: "B".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Duplicate email is rejected.
    let err = auth_service::register_user(
        &pool,
        RegisterRequest {
            email: "ada@test.com".into(),
            password: "correct horse".into(),
            first_name: "Ada".into(),
            last_name: "L".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Wrong password is rejected without detail.
    let err = auth_service::login_user(
        &pool,
        LoginRequest {
            email: "ada@test.com".into(),
            password: "wrong".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let logged_in = auth_service::login_user(
        &pool,
        LoginRequest {
            email: "ada@test.com".into(),
            password: "correct horse".into(),
        },
    )
    .await?;
    let login = logged_in.data.unwrap();
    assert!(login.token.starts_with("Bearer "));
    assert_eq!(login.user.id, user.id);

    // Profile update changes the name, never the email.
    let actor = AuthUser {
        user_id: user.id,
        staff: false,
    };
    let updated = auth_service::update_profile(
        &pool,
        &actor,
        UpdateProfileRequest {
            first_name: Some("Augusta".into()),
            last_name: None,
        },
    )
    .await?;
    let updated = updated.data.unwrap();
    assert_eq!(updated.first_name, "Augusta");
    assert_eq!(updated.email, "ada@test.com");

    let profile = auth_service::get_profile(&pool, &actor).await?;
    assert_eq!(profile.data.unwrap().first_name, "Augusta");

    Ok(())
}
