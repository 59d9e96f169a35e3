//! # Test Helper Library
//!
//! This module provides common test setup functions to reduce code duplication
//! across integration tests and improve test reliability and consistency.

use chilli_pizza_bot::db::{self, ProductInput};
use sqlx::postgres::PgPool;
use std::sync::Arc;

/// Setup a test database connection pool
///
/// This function handles the common pattern of:
/// 1. Checking for DATABASE_URL environment variable
/// 2. Creating a connection pool
/// 3. Initializing the database schema
///
/// Returns None if DATABASE_URL is not set (graceful skip for integration tests)
pub async fn setup_test_database() -> Result<Option<Arc<PgPool>>, Box<dyn std::error::Error>> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            println!("⚠️ Skipping database test - DATABASE_URL not set");
            return Ok(None);
        }
    };

    let pool = match PgPool::connect(&database_url).await {
        Ok(pool) => Arc::new(pool),
        Err(e) => {
            println!("⚠️ Skipping database test - failed to connect: {}", e);
            return Ok(None);
        }
    };

    if let Err(e) = db::init_database_schema(&pool).await {
        println!("⚠️ Skipping database test - failed to init schema: {}", e);
        return Ok(None);
    }

    Ok(Some(pool))
}

/// Create a test user with a unique Telegram id
pub async fn create_test_user(
    pool: &PgPool,
    telegram_id: i64,
) -> Result<chilli_pizza_bot::db::User, Box<dyn std::error::Error>> {
    let user = db::get_or_create_user(pool, telegram_id, "Test", Some("en")).await?;
    Ok(user)
}

/// Create a category plus one product in it, returning (category_id, product_id)
pub async fn create_test_product(
    pool: &PgPool,
    category_name: &str,
    price: f64,
) -> Result<(i64, i64), Box<dyn std::error::Error>> {
    db::seed_categories(pool, &[category_name]).await?;
    let categories = db::get_categories(pool).await?;
    // Seeding is a no-op on a populated table, so fall back to any category
    let category_id = categories
        .iter()
        .find(|category| category.name == category_name)
        .or_else(|| categories.first())
        .map(|category| category.id)
        .ok_or("no categories available")?;

    let product_id = db::create_product(
        pool,
        &ProductInput {
            name_en: "Test Pizza".to_string(),
            name_ru: "Тестовая пицца".to_string(),
            description_en: "A pizza for tests".to_string(),
            description_ru: "Пицца для тестов".to_string(),
            price,
            image: None,
            category_id,
        },
    )
    .await?;

    Ok((category_id, product_id))
}

/// A unique-ish Telegram id per test to keep tests independent
pub fn unique_telegram_id(seed: i64) -> i64 {
    let pid = std::process::id() as i64;
    9_000_000_000 + pid * 1_000 + seed
}
