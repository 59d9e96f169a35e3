use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

/// Represents a Telegram user in the database
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub first_name: String,
    pub phone: Option<String>,
    pub language_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents a product category
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Represents a product with per-language name and description
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name_en: String,
    pub name_ru: String,
    pub description_en: String,
    pub description_ru: String,
    /// Price in USD; converted to the user's currency only for display
    pub price: f64,
    /// Telegram photo file id
    pub image: Option<String>,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Product name in the user's language, falling back to English
    pub fn localized_name(&self, language: &str) -> &str {
        match language {
            "ru" if !self.name_ru.is_empty() => &self.name_ru,
            _ => &self.name_en,
        }
    }

    /// Product description in the user's language, falling back to English
    pub fn localized_description(&self, language: &str) -> &str {
        match language {
            "ru" if !self.description_ru.is_empty() => &self.description_ru,
            _ => &self.description_en,
        }
    }
}

/// Represents an info-page banner (main, about, payment, shipping, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub id: i64,
    pub name: String,
    /// Telegram photo file id
    pub image: Option<String>,
    pub description: Option<String>,
}

/// One cart line joined with its product
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub id: i64,
    pub telegram_id: i64,
    pub quantity: i32,
    pub product: Product,
}

/// Represents an order
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub telegram_id: i64,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// One order line with the product name captured for display
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: Uuid,
    pub product_name_en: String,
    pub product_name_ru: String,
    pub quantity: i32,
    /// Unit price in USD at order time
    pub price: f64,
}

impl OrderItem {
    /// Item name in the user's language, falling back to English
    pub fn localized_name(&self, language: &str) -> &str {
        match language {
            "ru" if !self.product_name_ru.is_empty() => &self.product_name_ru,
            _ => &self.product_name_en,
        }
    }
}

/// Captcha state for a user
#[derive(Debug, Clone, PartialEq)]
pub struct CaptchaStatus {
    pub telegram_id: i64,
    pub captcha: String,
    pub is_passed: bool,
    pub timestamp: DateTime<Utc>,
}

/// Input for creating or updating a product
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name_en: String,
    pub name_ru: String,
    pub description_en: String,
    pub description_ru: String,
    pub price: f64,
    pub image: Option<String>,
    pub category_id: i64,
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT UNIQUE NOT NULL,
            first_name VARCHAR(150) NOT NULL DEFAULT '',
            phone VARCHAR(20) UNIQUE,
            language_code VARCHAR(10) NOT NULL DEFAULT 'en',
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS categories (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(150) NOT NULL UNIQUE
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create categories table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS products (
            id BIGSERIAL PRIMARY KEY,
            name_en VARCHAR(150) NOT NULL,
            name_ru VARCHAR(150) NOT NULL DEFAULT '',
            description_en TEXT NOT NULL DEFAULT '',
            description_ru TEXT NOT NULL DEFAULT '',
            price DOUBLE PRECISION NOT NULL,
            image TEXT,
            category_id BIGINT NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create products table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS banners (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(25) NOT NULL UNIQUE,
            image TEXT,
            description TEXT
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create banners table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS carts (
            id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT NOT NULL REFERENCES users(telegram_id) ON DELETE CASCADE,
            product_id BIGINT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            quantity INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (telegram_id, product_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create carts table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders (
            id UUID PRIMARY KEY,
            telegram_id BIGINT NOT NULL REFERENCES users(telegram_id) ON DELETE CASCADE,
            name VARCHAR(150) NOT NULL,
            phone VARCHAR(20) NOT NULL,
            address TEXT NOT NULL,
            status VARCHAR(25) NOT NULL DEFAULT 'pending',
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create orders table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS order_items (
            id BIGSERIAL PRIMARY KEY,
            order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            product_id BIGINT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            quantity INTEGER NOT NULL,
            price DOUBLE PRECISION NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create order_items table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS captchas (
            id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT UNIQUE NOT NULL REFERENCES users(telegram_id) ON DELETE CASCADE,
            captcha VARCHAR(50) NOT NULL,
            is_passed BOOLEAN NOT NULL DEFAULT FALSE,
            timestamp TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create captchas table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS carts_telegram_id_idx ON carts(telegram_id)")
        .execute(pool)
        .await
        .context("Failed to create carts index")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS orders_telegram_id_idx ON orders(telegram_id)")
        .execute(pool)
        .await
        .context("Failed to create orders index")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS products_category_id_idx ON products(category_id)")
        .execute(pool)
        .await
        .context("Failed to create products index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> User {
    User {
        id: row.get(0),
        telegram_id: row.get(1),
        first_name: row.get(2),
        phone: row.get(3),
        language_code: row.get(4),
        created_at: row.get(5),
        updated_at: row.get(6),
    }
}

const USER_COLUMNS: &str =
    "id, telegram_id, first_name, phone, language_code, created_at, updated_at";

/// Get or create a user by Telegram ID
pub async fn get_or_create_user(
    pool: &PgPool,
    telegram_id: i64,
    first_name: &str,
    language_code: Option<&str>,
) -> Result<User> {
    debug!(telegram_id = %telegram_id, "Getting or creating user");

    if let Some(user) = get_user(pool, telegram_id).await? {
        return Ok(user);
    }

    let language_code = language_code.unwrap_or("en");
    let row = sqlx::query(&format!(
        "INSERT INTO users (telegram_id, first_name, language_code) VALUES ($1, $2, $3) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(telegram_id)
    .bind(first_name)
    .bind(language_code)
    .fetch_one(pool)
    .await
    .context("Failed to create new user")?;

    let user = user_from_row(&row);
    debug!(user_id = %user.id, "User created successfully");
    Ok(user)
}

/// Get a user by Telegram ID
pub async fn get_user(pool: &PgPool, telegram_id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE telegram_id = $1",
        USER_COLUMNS
    ))
    .bind(telegram_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by telegram_id")?;

    Ok(row.map(|row| user_from_row(&row)))
}

/// Store the phone collected during registration.
///
/// Returns `false` when the phone already belongs to another user, matching
/// the unique-phone registration rule.
pub async fn set_user_phone(
    pool: &PgPool,
    telegram_id: i64,
    first_name: &str,
    phone: &str,
) -> Result<bool> {
    debug!(telegram_id = %telegram_id, "Completing registration");

    let taken = sqlx::query("SELECT 1 FROM users WHERE phone = $1 AND telegram_id <> $2")
        .bind(phone)
        .bind(telegram_id)
        .fetch_optional(pool)
        .await
        .context("Failed to check phone uniqueness")?;

    if taken.is_some() {
        info!(telegram_id = %telegram_id, "Phone already registered to another user");
        return Ok(false);
    }

    sqlx::query(
        "UPDATE users SET first_name = $1, phone = $2, updated_at = CURRENT_TIMESTAMP WHERE telegram_id = $3",
    )
    .bind(first_name)
    .bind(phone)
    .bind(telegram_id)
    .execute(pool)
    .await
    .context("Failed to store user phone")?;

    Ok(true)
}

/// Get the user's stored language, defaulting to English for unknown users
pub async fn get_user_language(pool: &PgPool, telegram_id: i64) -> Result<String> {
    let row = sqlx::query("SELECT language_code FROM users WHERE telegram_id = $1")
        .bind(telegram_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user language")?;

    Ok(row
        .map(|row| row.get(0))
        .unwrap_or_else(|| "en".to_string()))
}

/// Persist the user's language preference
pub async fn set_user_language(pool: &PgPool, telegram_id: i64, language: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET language_code = $1, updated_at = CURRENT_TIMESTAMP WHERE telegram_id = $2",
    )
    .bind(language)
    .bind(telegram_id)
    .execute(pool)
    .await
    .context("Failed to set user language")?;

    Ok(result.rows_affected() > 0)
}

/// Count registered users
pub async fn total_users(pool: &PgPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;
    Ok(row.get(0))
}

/// Every known Telegram user id, for broadcasts
pub async fn all_user_ids(pool: &PgPool) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT telegram_id FROM users ORDER BY created_at")
        .fetch_all(pool)
        .await
        .context("Failed to list user ids")?;
    Ok(rows.into_iter().map(|row| row.get(0)).collect())
}

/// Seed the category list on first run
pub async fn seed_categories(pool: &PgPool, names: &[&str]) -> Result<()> {
    let row = sqlx::query("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await
        .context("Failed to count categories")?;
    let count: i64 = row.get(0);
    if count > 0 {
        return Ok(());
    }

    for name in names {
        sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(pool)
            .await
            .context("Failed to seed category")?;
    }
    info!("Seeded {} categories", names.len());
    Ok(())
}

/// List all categories
pub async fn get_categories(pool: &PgPool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name FROM categories ORDER BY id")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows
        .into_iter()
        .map(|row| Category {
            id: row.get(0),
            name: row.get(1),
        })
        .collect())
}

fn product_from_row(row: &sqlx::postgres::PgRow) -> Product {
    Product {
        id: row.get(0),
        name_en: row.get(1),
        name_ru: row.get(2),
        description_en: row.get(3),
        description_ru: row.get(4),
        price: row.get(5),
        image: row.get(6),
        category_id: row.get(7),
        created_at: row.get(8),
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name_en, name_ru, description_en, description_ru, price, image, category_id, created_at";

/// Create a new product
pub async fn create_product(pool: &PgPool, input: &ProductInput) -> Result<i64> {
    debug!(name = %input.name_en, "Creating product");

    let row = sqlx::query(
        "INSERT INTO products (name_en, name_ru, description_en, description_ru, price, image, category_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(&input.name_en)
    .bind(&input.name_ru)
    .bind(&input.description_en)
    .bind(&input.description_ru)
    .bind(input.price)
    .bind(&input.image)
    .bind(input.category_id)
    .fetch_one(pool)
    .await
    .context("Failed to insert new product")?;

    let product_id: i64 = row.get(0);
    debug!(product_id = %product_id, "Product created successfully");
    Ok(product_id)
}

/// Update an existing product
pub async fn update_product(pool: &PgPool, product_id: i64, input: &ProductInput) -> Result<bool> {
    debug!(product_id = %product_id, "Updating product");

    let result = sqlx::query(
        "UPDATE products SET name_en = $1, name_ru = $2, description_en = $3, description_ru = $4,
         price = $5, image = $6, category_id = $7 WHERE id = $8",
    )
    .bind(&input.name_en)
    .bind(&input.name_ru)
    .bind(&input.description_en)
    .bind(&input.description_ru)
    .bind(input.price)
    .bind(&input.image)
    .bind(input.category_id)
    .bind(product_id)
    .execute(pool)
    .await
    .context("Failed to update product")?;

    Ok(result.rows_affected() > 0)
}

/// Delete a product
pub async fn delete_product(pool: &PgPool, product_id: i64) -> Result<bool> {
    debug!(product_id = %product_id, "Deleting product");

    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(product_id)
        .execute(pool)
        .await
        .context("Failed to delete product")?;

    Ok(result.rows_affected() > 0)
}

/// Get a single product by id
pub async fn get_product(pool: &PgPool, product_id: i64) -> Result<Option<Product>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM products WHERE id = $1",
        PRODUCT_COLUMNS
    ))
    .bind(product_id)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch product")?;

    Ok(row.map(|row| product_from_row(&row)))
}

/// List products, optionally restricted to one category, in insertion order
pub async fn get_products(pool: &PgPool, category_id: Option<i64>) -> Result<Vec<Product>> {
    let rows = match category_id {
        Some(category_id) => {
            sqlx::query(&format!(
                "SELECT {} FROM products WHERE category_id = $1 ORDER BY id",
                PRODUCT_COLUMNS
            ))
            .bind(category_id)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(&format!("SELECT {} FROM products ORDER BY id", PRODUCT_COLUMNS))
                .fetch_all(pool)
                .await
        }
    }
    .context("Failed to list products")?;

    Ok(rows.iter().map(product_from_row).collect())
}

/// Count products
pub async fn total_products(pool: &PgPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await
        .context("Failed to count products")?;
    Ok(row.get(0))
}

/// Product counts per category name
pub async fn products_per_category(pool: &PgPool) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query(
        "SELECT c.name, COUNT(p.id) FROM categories c
         LEFT JOIN products p ON p.category_id = c.id
         GROUP BY c.name ORDER BY c.name",
    )
    .fetch_all(pool)
    .await
    .context("Failed to count products per category")?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get(0), row.get(1)))
        .collect())
}

/// Seed banner rows with default descriptions on first run
pub async fn seed_banners(pool: &PgPool, descriptions: &[(&str, &str)]) -> Result<()> {
    let row = sqlx::query("SELECT COUNT(*) FROM banners")
        .fetch_one(pool)
        .await
        .context("Failed to count banners")?;
    let count: i64 = row.get(0);
    if count > 0 {
        return Ok(());
    }

    for (name, description) in descriptions {
        sqlx::query(
            "INSERT INTO banners (name, description) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(description)
        .execute(pool)
        .await
        .context("Failed to seed banner")?;
    }
    info!("Seeded {} banners", descriptions.len());
    Ok(())
}

/// Get a banner by page name
pub async fn get_banner(pool: &PgPool, name: &str) -> Result<Option<Banner>> {
    let row = sqlx::query("SELECT id, name, image, description FROM banners WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch banner")?;

    Ok(row.map(|row| Banner {
        id: row.get(0),
        name: row.get(1),
        image: row.get(2),
        description: row.get(3),
    }))
}

/// List all banner pages
pub async fn get_info_pages(pool: &PgPool) -> Result<Vec<Banner>> {
    let rows = sqlx::query("SELECT id, name, image, description FROM banners ORDER BY id")
        .fetch_all(pool)
        .await
        .context("Failed to list banners")?;

    Ok(rows
        .into_iter()
        .map(|row| Banner {
            id: row.get(0),
            name: row.get(1),
            image: row.get(2),
            description: row.get(3),
        })
        .collect())
}

/// Replace a banner's photo file id
pub async fn set_banner_image(pool: &PgPool, name: &str, file_id: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE banners SET image = $1 WHERE name = $2")
        .bind(file_id)
        .bind(name)
        .execute(pool)
        .await
        .context("Failed to update banner image")?;

    Ok(result.rows_affected() > 0)
}

/// Add one unit of a product to the user's cart, creating the line if needed
pub async fn add_to_cart(pool: &PgPool, telegram_id: i64, product_id: i64) -> Result<()> {
    debug!(telegram_id = %telegram_id, product_id = %product_id, "Adding to cart");

    sqlx::query(
        "INSERT INTO carts (telegram_id, product_id, quantity) VALUES ($1, $2, 1)
         ON CONFLICT (telegram_id, product_id) DO UPDATE SET quantity = carts.quantity + 1",
    )
    .bind(telegram_id)
    .bind(product_id)
    .execute(pool)
    .await
    .context("Failed to add to cart")?;

    Ok(())
}

/// Remove one unit of a product from the cart.
///
/// Returns `true` when the line still exists afterwards, `false` when the
/// last unit was removed and the line is gone.
pub async fn reduce_in_cart(pool: &PgPool, telegram_id: i64, product_id: i64) -> Result<bool> {
    let row = sqlx::query(
        "SELECT quantity FROM carts WHERE telegram_id = $1 AND product_id = $2",
    )
    .bind(telegram_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read cart line")?;

    let quantity: i32 = match row {
        Some(row) => row.get(0),
        None => return Ok(false),
    };

    if quantity > 1 {
        sqlx::query(
            "UPDATE carts SET quantity = quantity - 1 WHERE telegram_id = $1 AND product_id = $2",
        )
        .bind(telegram_id)
        .bind(product_id)
        .execute(pool)
        .await
        .context("Failed to decrement cart line")?;
        Ok(true)
    } else {
        delete_from_cart(pool, telegram_id, product_id).await?;
        Ok(false)
    }
}

/// Drop a cart line entirely
pub async fn delete_from_cart(pool: &PgPool, telegram_id: i64, product_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM carts WHERE telegram_id = $1 AND product_id = $2")
        .bind(telegram_id)
        .bind(product_id)
        .execute(pool)
        .await
        .context("Failed to delete cart line")?;
    Ok(())
}

/// List the user's cart lines joined with their products
pub async fn get_user_cart(pool: &PgPool, telegram_id: i64) -> Result<Vec<CartLine>> {
    let rows = sqlx::query(
        "SELECT c.id, c.telegram_id, c.quantity,
                p.id, p.name_en, p.name_ru, p.description_en, p.description_ru,
                p.price, p.image, p.category_id, p.created_at
         FROM carts c JOIN products p ON p.id = c.product_id
         WHERE c.telegram_id = $1 ORDER BY c.id",
    )
    .bind(telegram_id)
    .fetch_all(pool)
    .await
    .context("Failed to list cart")?;

    Ok(rows
        .into_iter()
        .map(|row| CartLine {
            id: row.get(0),
            telegram_id: row.get(1),
            quantity: row.get(2),
            product: Product {
                id: row.get(3),
                name_en: row.get(4),
                name_ru: row.get(5),
                description_en: row.get(6),
                description_ru: row.get(7),
                price: row.get(8),
                image: row.get(9),
                category_id: row.get(10),
                created_at: row.get(11),
            },
        })
        .collect())
}

/// Empty the user's cart
pub async fn clear_cart(pool: &PgPool, telegram_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM carts WHERE telegram_id = $1")
        .bind(telegram_id)
        .execute(pool)
        .await
        .context("Failed to clear cart")?;
    Ok(())
}

/// Create an order and its items from the given cart lines, atomically
pub async fn create_order_with_items(
    pool: &PgPool,
    telegram_id: i64,
    name: &str,
    phone: &str,
    address: &str,
    status: &str,
    cart_lines: &[CartLine],
) -> Result<Order> {
    debug!(telegram_id = %telegram_id, lines = cart_lines.len(), "Creating order");

    let order_id = Uuid::new_v4();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let row = sqlx::query(
        "INSERT INTO orders (id, telegram_id, name, phone, address, status)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id, telegram_id, name, phone, address, status, created_at",
    )
    .bind(order_id)
    .bind(telegram_id)
    .bind(name)
    .bind(phone)
    .bind(address)
    .bind(status)
    .fetch_one(&mut *tx)
    .await
    .context("Failed to insert order")?;

    for line in cart_lines {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4)",
        )
        .bind(order_id)
        .bind(line.product.id)
        .bind(line.quantity)
        .bind(line.product.price)
        .execute(&mut *tx)
        .await
        .context("Failed to insert order item")?;
    }

    tx.commit().await.context("Failed to commit order")?;

    let order = Order {
        id: row.get(0),
        telegram_id: row.get(1),
        name: row.get(2),
        phone: row.get(3),
        address: row.get(4),
        status: row.get(5),
        created_at: row.get(6),
    };

    info!(order_id = %order.id, telegram_id = %telegram_id, "Order created");
    Ok(order)
}

/// List a user's orders, newest first
pub async fn get_user_orders(pool: &PgPool, telegram_id: i64) -> Result<Vec<Order>> {
    let rows = sqlx::query(
        "SELECT id, telegram_id, name, phone, address, status, created_at
         FROM orders WHERE telegram_id = $1 ORDER BY created_at DESC",
    )
    .bind(telegram_id)
    .fetch_all(pool)
    .await
    .context("Failed to list orders")?;

    Ok(rows
        .into_iter()
        .map(|row| Order {
            id: row.get(0),
            telegram_id: row.get(1),
            name: row.get(2),
            phone: row.get(3),
            address: row.get(4),
            status: row.get(5),
            created_at: row.get(6),
        })
        .collect())
}

/// Fetch one order by id
pub async fn get_order(pool: &PgPool, order_id: Uuid) -> Result<Option<Order>> {
    let row = sqlx::query(
        "SELECT id, telegram_id, name, phone, address, status, created_at
         FROM orders WHERE id = $1",
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch order")?;

    Ok(row.map(|row| Order {
        id: row.get(0),
        telegram_id: row.get(1),
        name: row.get(2),
        phone: row.get(3),
        address: row.get(4),
        status: row.get(5),
        created_at: row.get(6),
    }))
}

/// List an order's items with product names for display
pub async fn get_order_items(pool: &PgPool, order_id: Uuid) -> Result<Vec<OrderItem>> {
    let rows = sqlx::query(
        "SELECT i.id, i.order_id, p.name_en, p.name_ru, i.quantity, i.price
         FROM order_items i JOIN products p ON p.id = i.product_id
         WHERE i.order_id = $1 ORDER BY i.id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
    .context("Failed to list order items")?;

    Ok(rows
        .into_iter()
        .map(|row| OrderItem {
            id: row.get(0),
            order_id: row.get(1),
            product_name_en: row.get(2),
            product_name_ru: row.get(3),
            quantity: row.get(4),
            price: row.get(5),
        })
        .collect())
}

/// Record a passed captcha for the user (one row per user, refreshed on re-pass)
pub async fn mark_captcha_passed(pool: &PgPool, telegram_id: i64, captcha: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO captchas (telegram_id, captcha, is_passed, timestamp)
         VALUES ($1, $2, TRUE, CURRENT_TIMESTAMP)
         ON CONFLICT (telegram_id)
         DO UPDATE SET captcha = excluded.captcha, is_passed = TRUE, timestamp = CURRENT_TIMESTAMP",
    )
    .bind(telegram_id)
    .bind(captcha)
    .execute(pool)
    .await
    .context("Failed to record captcha pass")?;

    Ok(())
}

/// Whether the user passed a captcha within the last two weeks
pub async fn has_recent_captcha_pass(pool: &PgPool, telegram_id: i64) -> Result<bool> {
    let two_weeks_ago = Utc::now() - Duration::weeks(2);

    let row = sqlx::query(
        "SELECT 1 FROM captchas WHERE telegram_id = $1 AND is_passed AND timestamp > $2",
    )
    .bind(telegram_id)
    .bind(two_weeks_ago)
    .fetch_optional(pool)
    .await
    .context("Failed to check captcha pass")?;

    Ok(row.is_some())
}

/// Fetch the captcha record for a user
pub async fn get_captcha_status(pool: &PgPool, telegram_id: i64) -> Result<Option<CaptchaStatus>> {
    let row = sqlx::query(
        "SELECT telegram_id, captcha, is_passed, timestamp FROM captchas WHERE telegram_id = $1",
    )
    .bind(telegram_id)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch captcha status")?;

    Ok(row.map(|row| CaptchaStatus {
        telegram_id: row.get(0),
        captcha: row.get(1),
        is_passed: row.get(2),
        timestamp: row.get(3),
    }))
}
