//! # Menu engine
//!
//! Renders the four inline-menu levels into media + keyboard pairs:
//! 0 main, 1 catalog, 2 products, 3 cart. Product and cart views show one
//! record per page through [`Paginator`]; the callback handler feeds the page
//! number from the pressed button back in here on every navigation.

use anyhow::Result;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use teloxide::types::InlineKeyboardMarkup;

use crate::bot::ui_builder::{self, PaginationButtons};
use crate::currency::{convert_currency, format_price};
use crate::db;
use crate::localization::{t_args_lang, t_lang, LocalizationManager};
use crate::paginator::Paginator;
use crate::payment::RateClient;

/// One record per page, as in the product/cart browsing UI
const PER_PAGE: usize = 1;

/// A rendered menu view: optional banner/product photo, caption, keyboard
#[derive(Debug, Clone)]
pub struct MenuContent {
    /// Telegram photo file id, when the view has one
    pub photo: Option<String>,
    pub caption: String,
    pub keyboard: InlineKeyboardMarkup,
}

/// Everything the menu renderer needs besides per-request values
pub struct MenuContext<'a> {
    pub pool: &'a PgPool,
    pub rates: &'a RateClient,
    pub localization: &'a Arc<LocalizationManager>,
}

/// Parameters carried by the pressed menu button
#[derive(Debug, Clone, Default)]
pub struct MenuRequest {
    pub level: u8,
    pub menu_name: String,
    pub category: Option<i64>,
    pub page: usize,
    pub product_id: Option<i64>,
    pub telegram_id: i64,
    pub language: String,
}

/// Build prev/next buttons from the paginator's navigability answers
fn pagination_buttons<T>(
    paginator: &Paginator<'_, T>,
    localization: &Arc<LocalizationManager>,
    language: &str,
) -> PaginationButtons {
    let mut buttons = PaginationButtons::new();

    if let Some(previous) = paginator.has_previous() {
        buttons.push((
            format!("⬅️ {}", t_lang(localization, "prev-button", Some(language))),
            "previous",
            previous,
        ));
    }
    if let Some(next) = paginator.has_next() {
        buttons.push((
            format!("{} ➡️", t_lang(localization, "next-button", Some(language))),
            "next",
            next,
        ));
    }

    buttons
}

/// Render the requested menu level
pub async fn get_menu_content(ctx: &MenuContext<'_>, request: &MenuRequest) -> Result<MenuContent> {
    match request.level {
        0 => main_menu(ctx, request).await,
        1 => catalog(ctx, request).await,
        2 => products(ctx, request).await,
        _ => carts(ctx, request).await,
    }
}

/// Banner photo and description for an info page, with a localized fallback
/// caption when the page has no description yet
async fn banner_content(
    ctx: &MenuContext<'_>,
    name: &str,
    language: &str,
) -> Result<(Option<String>, String)> {
    let banner = db::get_banner(ctx.pool, name).await?;

    let caption = banner
        .as_ref()
        .and_then(|banner| banner.description.clone())
        .unwrap_or_else(|| t_lang(ctx.localization, "banner-missing", Some(language)));
    let photo = banner.and_then(|banner| banner.image);

    Ok((photo, caption))
}

async fn main_menu(ctx: &MenuContext<'_>, request: &MenuRequest) -> Result<MenuContent> {
    let (photo, caption) = banner_content(ctx, &request.menu_name, &request.language).await?;

    Ok(MenuContent {
        photo,
        caption,
        keyboard: ui_builder::main_menu_keyboard(ctx.localization, Some(&request.language)),
    })
}

async fn catalog(ctx: &MenuContext<'_>, request: &MenuRequest) -> Result<MenuContent> {
    let (photo, caption) = banner_content(ctx, "catalog", &request.language).await?;
    let categories = db::get_categories(ctx.pool).await?;

    Ok(MenuContent {
        photo,
        caption,
        keyboard: ui_builder::catalog_keyboard(&categories, ctx.localization, Some(&request.language)),
    })
}

async fn products(ctx: &MenuContext<'_>, request: &MenuRequest) -> Result<MenuContent> {
    let products = db::get_products(ctx.pool, request.category).await?;
    let paginator = Paginator::new(&products, request.page, PER_PAGE);

    let product = match paginator.get_page().first() {
        Some(product) => product,
        None => {
            // Category emptied out from under the navigation buttons
            let (photo, caption) = banner_content(ctx, "catalog", &request.language).await?;
            let categories = db::get_categories(ctx.pool).await?;
            return Ok(MenuContent {
                photo,
                caption,
                keyboard: ui_builder::catalog_keyboard(
                    &categories,
                    ctx.localization,
                    Some(&request.language),
                ),
            });
        }
    };

    let (converted, currency) =
        convert_currency(ctx.rates, product.price, &request.language).await?;
    let caption = t_args_lang(
        ctx.localization,
        "product-details",
        &[
            ("name", product.localized_name(&request.language).to_string()),
            (
                "description",
                product.localized_description(&request.language).to_string(),
            ),
            ("price", format_price(converted, currency)),
            ("current_page", paginator.page().to_string()),
            ("total_pages", paginator.pages().to_string()),
        ],
        Some(&request.language),
    );

    let pagination = pagination_buttons(&paginator, ctx.localization, &request.language);
    let keyboard = ui_builder::products_keyboard(
        request.category.unwrap_or_default(),
        product.id,
        &pagination,
        ctx.localization,
        Some(&request.language),
    );

    Ok(MenuContent {
        photo: product.image.clone(),
        caption,
        keyboard,
    })
}

/// A plain info page (about/payment/shipping) with a way back home
pub async fn info_page_content(
    ctx: &MenuContext<'_>,
    name: &str,
    language: &str,
) -> Result<MenuContent> {
    let (photo, caption) = banner_content(ctx, name, language).await?;
    Ok(MenuContent {
        photo,
        caption,
        keyboard: ui_builder::back_to_main_keyboard(ctx.localization, Some(language)),
    })
}

/// The user's order list under the orders banner
pub async fn orders_content(
    ctx: &MenuContext<'_>,
    telegram_id: i64,
    language: &str,
) -> Result<MenuContent> {
    let (photo, banner_caption) = banner_content(ctx, "orders", language).await?;
    let orders = db::get_user_orders(ctx.pool, telegram_id).await?;

    let orders_text = if orders.is_empty() {
        t_lang(ctx.localization, "no-orders", Some(language))
    } else {
        orders
            .iter()
            .map(|order| {
                t_args_lang(
                    ctx.localization,
                    "order-item",
                    &[
                        ("order_id", ui_builder::short_order_id(&order.id)),
                        ("name", order.name.clone()),
                        ("status", order.status.clone()),
                        ("address", order.address.clone()),
                        ("phone", order.phone.clone()),
                    ],
                    Some(language),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let caption = format!("<strong>{}</strong>\n\n{}", banner_caption, orders_text);
    let keyboard = if orders.is_empty() {
        ui_builder::back_to_main_keyboard(ctx.localization, Some(language))
    } else {
        ui_builder::order_details_keyboard(&orders, ctx.localization, Some(language))
    };

    Ok(MenuContent {
        photo,
        caption,
        keyboard,
    })
}

/// One order in full: header, items with converted prices, total
pub async fn order_detail_content(
    ctx: &MenuContext<'_>,
    order: &db::Order,
    items: &[db::OrderItem],
    language: &str,
) -> Result<MenuContent> {
    let (photo, _) = banner_content(ctx, "orders", language).await?;

    let mut total_usd = 0.0;
    let mut item_lines = Vec::with_capacity(items.len());
    for item in items {
        total_usd += item.price * f64::from(item.quantity);
        let (item_price, item_currency) = convert_currency(ctx.rates, item.price, language).await?;
        item_lines.push(t_args_lang(
            ctx.localization,
            "order-detail-item",
            &[
                ("name", item.localized_name(language).to_string()),
                ("quantity", item.quantity.to_string()),
                ("price", format_price(item_price, item_currency)),
            ],
            Some(language),
        ));
    }
    let (total, currency) = convert_currency(ctx.rates, total_usd, language).await?;

    let header = t_args_lang(
        ctx.localization,
        "order-detail-header",
        &[
            ("order_id", ui_builder::short_order_id(&order.id)),
            (
                "created_at",
                order.created_at.format("%d.%m.%Y %H:%M").to_string(),
            ),
            ("name", order.name.clone()),
            ("status", order.status.clone()),
            ("address", order.address.clone()),
            ("phone", order.phone.clone()),
        ],
        Some(language),
    );
    let total_line = t_args_lang(
        ctx.localization,
        "order-detail-total",
        &[("total_sum", format_price(total, currency))],
        Some(language),
    );

    Ok(MenuContent {
        photo,
        caption: format!("{}\n\n{}\n\n{}", header, item_lines.join("\n"), total_line),
        keyboard: ui_builder::back_to_orders_keyboard(ctx.localization, Some(language)),
    })
}

/// The profile card under the profile banner
#[allow(clippy::too_many_arguments)]
pub async fn profile_content(
    ctx: &MenuContext<'_>,
    telegram_id: i64,
    language: &str,
    tg_first_name: &str,
    tg_last_name: &str,
    tg_username: &str,
) -> Result<MenuContent> {
    let user = db::get_user(ctx.pool, telegram_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {} not found in database", telegram_id))?;

    let orders = db::get_user_orders(ctx.pool, telegram_id).await?;
    let captcha_status = db::get_captcha_status(ctx.pool, telegram_id).await?;

    let captcha_text = if captcha_status.map(|status| status.is_passed).unwrap_or(false) {
        t_lang(ctx.localization, "captcha-passed", Some(language))
    } else {
        t_lang(ctx.localization, "captcha-not-passed", Some(language))
    };

    let language_flag = match user.language_code.as_str() {
        "en" => "🇬🇧",
        "ru" => "🇷🇺",
        _ => "🏳️",
    };
    let days_in_bot = (chrono::Utc::now() - user.created_at).num_days();

    let (photo, _) = banner_content(ctx, "profile", language).await?;
    let caption = t_args_lang(
        ctx.localization,
        "profile-text",
        &[
            ("user_id", user.id.to_string()),
            ("first_name", tg_first_name.to_string()),
            ("last_name", tg_last_name.to_string()),
            ("username", tg_username.to_string()),
            (
                "phone",
                user.phone.unwrap_or_else(|| "N/A".to_string()),
            ),
            ("captcha_status", captcha_text),
            ("language", language_flag.to_string()),
            ("days_in_bot", days_in_bot.to_string()),
            ("orders_count", orders.len().to_string()),
            (
                "registration_date",
                user.created_at.format("%d.%m.%Y").to_string(),
            ),
        ],
        Some(language),
    );

    Ok(MenuContent {
        photo,
        caption,
        keyboard: ui_builder::back_to_main_keyboard(ctx.localization, Some(language)),
    })
}

async fn carts(ctx: &MenuContext<'_>, request: &MenuRequest) -> Result<MenuContent> {
    let mut page = request.page.max(1);

    // Line mutations arrive as menu names; adjust the page when the current
    // one may have disappeared
    match (request.menu_name.as_str(), request.product_id) {
        ("delete", Some(product_id)) => {
            db::delete_from_cart(ctx.pool, request.telegram_id, product_id).await?;
            if page > 1 {
                page -= 1;
            }
        }
        ("decrement", Some(product_id)) => {
            let line_survived =
                db::reduce_in_cart(ctx.pool, request.telegram_id, product_id).await?;
            if page > 1 && !line_survived {
                page -= 1;
            }
        }
        ("increment", Some(product_id)) => {
            db::add_to_cart(ctx.pool, request.telegram_id, product_id).await?;
        }
        _ => {}
    }

    let cart_lines = db::get_user_cart(ctx.pool, request.telegram_id).await?;

    if cart_lines.is_empty() {
        let (photo, _) = banner_content(ctx, "cart", &request.language).await?;
        return Ok(MenuContent {
            photo,
            caption: t_lang(ctx.localization, "cart-empty", Some(&request.language)),
            keyboard: ui_builder::cart_keyboard(
                None,
                None,
                &PaginationButtons::new(),
                ctx.localization,
                Some(&request.language),
            ),
        });
    }

    // With one line per page the page count equals the line count; clamp so a
    // stale button can never point past the shrunken cart
    let page = page.clamp(1, cart_lines.len());
    let paginator = Paginator::new(&cart_lines, page, PER_PAGE);
    let line = paginator
        .get_page()
        .first()
        .ok_or_else(|| anyhow::anyhow!("cart page out of range after clamping"))?;

    let (unit_price, currency) =
        convert_currency(ctx.rates, line.product.price, &request.language).await?;
    let line_total = unit_price * f64::from(line.quantity);

    let mut cart_total = 0.0;
    for cart_line in &cart_lines {
        let (converted, _) =
            convert_currency(ctx.rates, cart_line.product.price, &request.language).await?;
        cart_total += converted * f64::from(cart_line.quantity);
    }

    let caption = t_args_lang(
        ctx.localization,
        "cart-item-details",
        &[
            ("name", line.product.localized_name(&request.language).to_string()),
            ("price", format_price(unit_price, currency)),
            ("quantity", line.quantity.to_string()),
            ("cart_price", format_price(line_total, currency)),
            ("current_page", paginator.page().to_string()),
            ("total_pages", paginator.pages().to_string()),
            ("total_price", format_price(cart_total, currency)),
        ],
        Some(&request.language),
    );

    let pagination = pagination_buttons(&paginator, ctx.localization, &request.language);
    let keyboard = ui_builder::cart_keyboard(
        Some(paginator.page()),
        Some(line.product.id),
        &pagination,
        ctx.localization,
        Some(&request.language),
    );

    Ok(MenuContent {
        photo: line.product.image.clone(),
        caption,
        keyboard,
    })
}
