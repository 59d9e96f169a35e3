use anyhow::Result;
use chilli_pizza_bot::db;

mod test_helpers;
use test_helpers::{create_test_product, create_test_user, setup_test_database, unique_telegram_id};

/// User creation is idempotent and registration enforces phone uniqueness
#[tokio::test]
async fn test_user_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let pool = match setup_test_database().await? {
        Some(pool) => pool,
        None => return Ok(()),
    };

    let telegram_id = unique_telegram_id(1);
    let user = create_test_user(&pool, telegram_id).await?;
    assert_eq!(user.telegram_id, telegram_id);
    assert!(user.phone.is_none());

    // Second call returns the same row
    let again = db::get_or_create_user(&pool, telegram_id, "Other", Some("ru")).await?;
    assert_eq!(again.id, user.id);

    let phone = format!("+38063{:07}", telegram_id % 10_000_000);
    assert!(db::set_user_phone(&pool, telegram_id, "Test", &phone).await?);

    // The same phone on a different account is rejected
    let other_id = unique_telegram_id(2);
    create_test_user(&pool, other_id).await?;
    assert!(!db::set_user_phone(&pool, other_id, "Test", &phone).await?);

    Ok(())
}

#[tokio::test]
async fn test_user_language_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let pool = match setup_test_database().await? {
        Some(pool) => pool,
        None => return Ok(()),
    };

    let telegram_id = unique_telegram_id(3);
    create_test_user(&pool, telegram_id).await?;

    assert_eq!(db::get_user_language(&pool, telegram_id).await?, "en");
    assert!(db::set_user_language(&pool, telegram_id, "ru").await?);
    assert_eq!(db::get_user_language(&pool, telegram_id).await?, "ru");

    // Unknown users read as English
    assert_eq!(
        db::get_user_language(&pool, unique_telegram_id(999)).await?,
        "en"
    );

    Ok(())
}

/// Cart math: add increments, reduce decrements and drops the line at zero
#[tokio::test]
async fn test_cart_operations() -> Result<(), Box<dyn std::error::Error>> {
    let pool = match setup_test_database().await? {
        Some(pool) => pool,
        None => return Ok(()),
    };

    let telegram_id = unique_telegram_id(4);
    create_test_user(&pool, telegram_id).await?;
    let (_, product_id) = create_test_product(&pool, "Cart Tests", 9.5).await?;

    db::add_to_cart(&pool, telegram_id, product_id).await?;
    db::add_to_cart(&pool, telegram_id, product_id).await?;

    let cart = db::get_user_cart(&pool, telegram_id).await?;
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 2);
    assert_eq!(cart[0].product.id, product_id);

    // 2 -> 1 keeps the line
    assert!(db::reduce_in_cart(&pool, telegram_id, product_id).await?);
    // 1 -> 0 removes it
    assert!(!db::reduce_in_cart(&pool, telegram_id, product_id).await?);
    assert!(db::get_user_cart(&pool, telegram_id).await?.is_empty());

    // Reducing an absent line is a no-op
    assert!(!db::reduce_in_cart(&pool, telegram_id, product_id).await?);

    db::add_to_cart(&pool, telegram_id, product_id).await?;
    db::clear_cart(&pool, telegram_id).await?;
    assert!(db::get_user_cart(&pool, telegram_id).await?.is_empty());

    Ok(())
}

/// Orders capture cart lines with their price at order time
#[tokio::test]
async fn test_order_creation_from_cart() -> Result<(), Box<dyn std::error::Error>> {
    let pool = match setup_test_database().await? {
        Some(pool) => pool,
        None => return Ok(()),
    };

    let telegram_id = unique_telegram_id(5);
    create_test_user(&pool, telegram_id).await?;
    let (_, product_id) = create_test_product(&pool, "Order Tests", 12.0).await?;

    db::add_to_cart(&pool, telegram_id, product_id).await?;
    db::add_to_cart(&pool, telegram_id, product_id).await?;
    let cart = db::get_user_cart(&pool, telegram_id).await?;

    let order = db::create_order_with_items(
        &pool,
        telegram_id,
        "John",
        "+380631234567",
        "Deribasivska 1",
        "completed",
        &cart,
    )
    .await?;
    assert_eq!(order.status, "completed");

    let fetched = db::get_order(&pool, order.id).await?;
    assert_eq!(fetched.as_ref().map(|o| o.telegram_id), Some(telegram_id));

    let items = db::get_order_items(&pool, order.id).await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);
    assert!((items[0].price - 12.0).abs() < f64::EPSILON);

    let orders = db::get_user_orders(&pool, telegram_id).await?;
    assert!(orders.iter().any(|o| o.id == order.id));

    Ok(())
}

#[tokio::test]
async fn test_captcha_pass_window() -> Result<(), Box<dyn std::error::Error>> {
    let pool = match setup_test_database().await? {
        Some(pool) => pool,
        None => return Ok(()),
    };

    let telegram_id = unique_telegram_id(6);
    create_test_user(&pool, telegram_id).await?;

    assert!(!db::has_recent_captcha_pass(&pool, telegram_id).await?);
    db::mark_captcha_passed(&pool, telegram_id, "🍎").await?;
    assert!(db::has_recent_captcha_pass(&pool, telegram_id).await?);

    let status = db::get_captcha_status(&pool, telegram_id).await?;
    assert_eq!(status.map(|s| (s.captcha, s.is_passed)), Some(("🍎".to_string(), true)));

    // Re-passing refreshes the single row instead of inserting another
    db::mark_captcha_passed(&pool, telegram_id, "🚗").await?;
    let status = db::get_captcha_status(&pool, telegram_id).await?;
    assert_eq!(status.map(|s| s.captcha), Some("🚗".to_string()));

    Ok(())
}

#[tokio::test]
async fn test_banner_seed_and_image() -> Result<(), Box<dyn std::error::Error>> {
    let pool = match setup_test_database().await? {
        Some(pool) => pool,
        None => return Ok(()),
    };

    db::seed_banners(&pool, &[("main", "Welcome!"), ("cart", "Cart is empty!")]).await?;
    let pages = db::get_info_pages(&pool).await?;
    assert!(!pages.is_empty());

    let name = pages[0].name.clone();
    assert!(db::set_banner_image(&pool, &name, "AgACAgTESTFILEID").await?);
    let banner = db::get_banner(&pool, &name).await?;
    assert_eq!(
        banner.and_then(|banner| banner.image),
        Some("AgACAgTESTFILEID".to_string())
    );

    // Unknown pages are reported, not invented
    assert!(!db::set_banner_image(&pool, "no-such-page", "x").await?);

    Ok(())
}

#[tokio::test]
async fn test_product_crud_and_localized_fields() -> Result<(), Box<dyn std::error::Error>> {
    let pool = match setup_test_database().await? {
        Some(pool) => pool,
        None => return Ok(()),
    };

    let (category_id, product_id) = create_test_product(&pool, "CRUD Tests", 7.25).await?;

    let product = db::get_product(&pool, product_id)
        .await?
        .expect("product just created");
    assert_eq!(product.localized_name("ru"), "Тестовая пицца");
    assert_eq!(product.localized_name("en"), "Test Pizza");
    // Unknown languages fall back to English
    assert_eq!(product.localized_name("fr"), "Test Pizza");

    let mut input = chilli_pizza_bot::db::ProductInput {
        name_en: product.name_en.clone(),
        name_ru: product.name_ru.clone(),
        description_en: product.description_en.clone(),
        description_ru: product.description_ru.clone(),
        price: 8.75,
        image: product.image.clone(),
        category_id,
    };
    input.name_en = "Renamed Pizza".to_string();
    assert!(db::update_product(&pool, product_id, &input).await?);

    let updated = db::get_product(&pool, product_id).await?.expect("still there");
    assert_eq!(updated.name_en, "Renamed Pizza");
    assert!((updated.price - 8.75).abs() < f64::EPSILON);

    let in_category = db::get_products(&pool, Some(category_id)).await?;
    assert!(in_category.iter().any(|p| p.id == product_id));

    assert!(db::delete_product(&pool, product_id).await?);
    assert!(db::get_product(&pool, product_id).await?.is_none());
    assert!(!db::delete_product(&pool, product_id).await?);

    Ok(())
}
