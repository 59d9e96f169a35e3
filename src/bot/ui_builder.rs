//! UI Builder module for creating keyboards and formatting messages

use std::sync::Arc;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};
use uuid::Uuid;

use crate::callbacks::{MenuCallback, OrderDetailCallback};
use crate::db::{Category, Order};
use crate::localization::{t_args_lang, t_lang, LocalizationManager};

/// Pagination buttons for the current page: (label, target menu name, target page)
pub type PaginationButtons = Vec<(String, &'static str, usize)>;

/// Main menu keyboard (level 0)
pub fn main_menu_keyboard(
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let rows = vec![
        vec![
            InlineKeyboardButton::callback(
                format!("{} 🍕", t_lang(localization, "goods-button", language_code)),
                MenuCallback::new(1, "catalog").pack(),
            ),
            InlineKeyboardButton::callback(
                format!("{} 🛒", t_lang(localization, "cart-button", language_code)),
                MenuCallback::new(3, "cart").pack(),
            ),
        ],
        vec![
            InlineKeyboardButton::callback(
                format!("{} 📦", t_lang(localization, "orders-button", language_code)),
                MenuCallback::new(0, "orders").pack(),
            ),
            InlineKeyboardButton::callback(
                format!("{} ℹ️", t_lang(localization, "about-button", language_code)),
                MenuCallback::new(0, "about").pack(),
            ),
        ],
        vec![
            InlineKeyboardButton::callback(
                format!("{} 💰", t_lang(localization, "payment-button", language_code)),
                MenuCallback::new(0, "payment").pack(),
            ),
            InlineKeyboardButton::callback(
                format!("{} 🚚", t_lang(localization, "shipping-button", language_code)),
                MenuCallback::new(0, "shipping").pack(),
            ),
        ],
        vec![
            InlineKeyboardButton::callback(
                format!("{} 👤", t_lang(localization, "profile-button", language_code)),
                MenuCallback::new(0, "profile").pack(),
            ),
            InlineKeyboardButton::callback(
                format!("{} 🌐", t_lang(localization, "language-button", language_code)),
                MenuCallback::new(0, "language").pack(),
            ),
        ],
    ];

    InlineKeyboardMarkup::new(rows)
}

/// Catalog keyboard (level 1): back/cart plus one button per category
pub fn catalog_keyboard(
    categories: &[Category],
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![
        InlineKeyboardButton::callback(
            t_lang(localization, "back-button", language_code),
            MenuCallback::new(0, "main").pack(),
        ),
        InlineKeyboardButton::callback(
            format!("{} 🛒", t_lang(localization, "cart-button", language_code)),
            MenuCallback::new(3, "cart").pack(),
        ),
    ]];

    for pair in categories.chunks(2) {
        rows.push(
            pair.iter()
                .map(|category| {
                    InlineKeyboardButton::callback(
                        category.name.clone(),
                        MenuCallback::new(2, "products")
                            .with_category(category.id)
                            .pack(),
                    )
                })
                .collect(),
        );
    }

    InlineKeyboardMarkup::new(rows)
}

/// Product browsing keyboard (level 2): back/cart/buy plus pagination
pub fn products_keyboard(
    category: i64,
    product_id: i64,
    pagination: &PaginationButtons,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows = vec![
        vec![
            InlineKeyboardButton::callback(
                t_lang(localization, "back-button", language_code),
                MenuCallback::new(1, "catalog").pack(),
            ),
            InlineKeyboardButton::callback(
                format!("{} 🛒", t_lang(localization, "cart-button", language_code)),
                MenuCallback::new(3, "cart").pack(),
            ),
        ],
        vec![InlineKeyboardButton::callback(
            format!("{} 💵", t_lang(localization, "buy-button", language_code)),
            MenuCallback::new(2, "add_to_cart")
                .with_category(category)
                .with_product(product_id)
                .pack(),
        )],
    ];

    let nav: Vec<InlineKeyboardButton> = pagination
        .iter()
        .map(|(text, menu_name, page)| {
            InlineKeyboardButton::callback(
                text.clone(),
                MenuCallback::new(2, *menu_name)
                    .with_category(category)
                    .with_page(*page)
                    .pack(),
            )
        })
        .collect();
    if !nav.is_empty() {
        rows.push(nav);
    }

    InlineKeyboardMarkup::new(rows)
}

/// Cart keyboard (level 3). With a page: line controls, pagination and
/// main/order buttons; without: just the way back home.
pub fn cart_keyboard(
    page: Option<usize>,
    product_id: Option<i64>,
    pagination: &PaginationButtons,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let page = match page {
        Some(page) => page,
        None => {
            return InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                format!("{} 🏠", t_lang(localization, "main-button", language_code)),
                MenuCallback::new(0, "main").pack(),
            )]]);
        }
    };

    let line_action = |menu_name: &str| {
        let mut callback = MenuCallback::new(3, menu_name).with_page(page);
        if let Some(product_id) = product_id {
            callback = callback.with_product(product_id);
        }
        callback.pack()
    };

    let mut rows = vec![vec![
        InlineKeyboardButton::callback(
            t_lang(localization, "delete-button", language_code),
            line_action("delete"),
        ),
        InlineKeyboardButton::callback("-1".to_string(), line_action("decrement")),
        InlineKeyboardButton::callback("+1".to_string(), line_action("increment")),
    ]];

    let nav: Vec<InlineKeyboardButton> = pagination
        .iter()
        .map(|(text, menu_name, target_page)| {
            InlineKeyboardButton::callback(
                text.clone(),
                MenuCallback::new(3, *menu_name).with_page(*target_page).pack(),
            )
        })
        .collect();
    if !nav.is_empty() {
        rows.push(nav);
    }

    rows.push(vec![
        InlineKeyboardButton::callback(
            format!("{} 🏠", t_lang(localization, "main-button", language_code)),
            MenuCallback::new(0, "main").pack(),
        ),
        InlineKeyboardButton::callback(
            format!("{} 🛍️", t_lang(localization, "order-button", language_code)),
            MenuCallback::new(0, "order").pack(),
        ),
    ]);

    InlineKeyboardMarkup::new(rows)
}

/// One detail button per order plus a back button
pub fn order_details_keyboard(
    orders: &[Order],
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = orders
        .iter()
        .map(|order| {
            vec![InlineKeyboardButton::callback(
                format!(
                    "📋 {} #{}",
                    t_lang(localization, "order-details-button", language_code),
                    short_order_id(&order.id)
                ),
                OrderDetailCallback::new(order.id).pack(),
            )]
        })
        .collect();

    rows.push(vec![InlineKeyboardButton::callback(
        format!("◀️ {}", t_lang(localization, "back-button", language_code)),
        MenuCallback::new(0, "main").pack(),
    )]);

    InlineKeyboardMarkup::new(rows)
}

/// Back-to-orders button under an order detail view
pub fn back_to_orders_keyboard(
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        t_lang(localization, "back-to-orders-button", language_code),
        MenuCallback::new(0, "orders").pack(),
    )]])
}

/// Single back-to-main button
pub fn back_to_main_keyboard(
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        format!("⬅️ {}", t_lang(localization, "back-button", language_code)),
        MenuCallback::new(0, "main").pack(),
    )]])
}

/// Payment method picker shown after the order is confirmed
pub fn payment_method_keyboard(
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("TON 💎", "crypto_TON"),
            InlineKeyboardButton::callback("BTC ₿", "crypto_BTC"),
        ],
        vec![
            InlineKeyboardButton::callback("USDT 💵", "crypto_USDT"),
            InlineKeyboardButton::callback("ETH ⟠", "crypto_ETH"),
        ],
        vec![InlineKeyboardButton::callback(
            format!("{} ⭐", t_lang(localization, "star-payment-button", language_code)),
            "star_payment",
        )],
        vec![InlineKeyboardButton::callback(
            format!("{} ⬅️", t_lang(localization, "back-button", language_code)),
            "cancel_order",
        )],
    ])
}

/// Captcha keyboard: the selectable emojis, three per row
pub fn captcha_keyboard(options: &[&str]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = options
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .map(|emoji| {
                    InlineKeyboardButton::callback(emoji.to_string(), format!("captcha_{}", emoji))
                })
                .collect()
        })
        .collect();

    InlineKeyboardMarkup::new(rows)
}

/// Language picker
pub fn language_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("English 🇬🇧", "lang_en"),
        InlineKeyboardButton::callback("Русский 🇷🇺", "lang_ru"),
    ]])
}

/// Subscription gate: join link plus a re-check button
pub fn subscription_keyboard(
    channel_link: &str,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Ok(url) = reqwest::Url::parse(channel_link) {
        rows.push(vec![InlineKeyboardButton::url(
            t_lang(localization, "subscribe-channel-button", language_code),
            url,
        )]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        format!(
            "🔄 {}",
            t_lang(localization, "check-subscription-button", language_code)
        ),
        "check_subscription",
    )]);

    InlineKeyboardMarkup::new(rows)
}

/// Order confirmation row: pick payment or cancel, with an optional
/// user-agreement link below
pub fn order_confirmation_keyboard(
    user_agreement_url: Option<&str>,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![
        InlineKeyboardButton::callback(
            t_lang(localization, "select-payment-button", language_code),
            "select_payment",
        ),
        InlineKeyboardButton::callback(
            t_lang(localization, "cancel-order-button", language_code),
            "cancel_order",
        ),
    ]];

    if let Some(url) = user_agreement_url.and_then(|u| reqwest::Url::parse(u).ok()) {
        rows.push(vec![InlineKeyboardButton::url(
            t_lang(localization, "user-agreement-button", language_code),
            url,
        )]);
    }

    InlineKeyboardMarkup::new(rows)
}

/// Crypto invoice keyboard: pay link plus cancel
pub fn invoice_keyboard(
    pay_url: &str,
    asset: &str,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Ok(url) = reqwest::Url::parse(pay_url) {
        rows.push(vec![InlineKeyboardButton::url(
            t_args_lang(
                localization,
                "pay-with-crypto-button",
                &[("crypto", asset.to_string())],
                language_code,
            ),
            url,
        )]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        t_lang(localization, "cancel-order-button", language_code),
        "cancel_order",
    )]);

    InlineKeyboardMarkup::new(rows)
}

/// Pay-with-stars keyboard attached to the XTR invoice
pub fn stars_keyboard(
    stars_amount: i32,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::pay(t_args_lang(
            localization,
            "pay-with-stars-button",
            &[("stars_amount", stars_amount.to_string())],
            language_code,
        ))],
        vec![InlineKeyboardButton::callback(
            t_lang(localization, "cancel-order-button", language_code),
            "cancel_order",
        )],
    ])
}

/// Reply keyboard with the admin features
pub fn admin_keyboard(
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(t_lang(localization, "admin-add-good", language_code)),
            KeyboardButton::new(t_lang(localization, "admin-assortment", language_code)),
        ],
        vec![
            KeyboardButton::new(t_lang(localization, "admin-add-banner", language_code)),
            KeyboardButton::new(t_lang(localization, "admin-statistics", language_code)),
        ],
        vec![KeyboardButton::new(t_lang(
            localization,
            "admin-newsletter",
            language_code,
        ))],
    ])
    .resize_keyboard()
}

/// Reply keyboard with a single localized back button
pub fn back_reply_keyboard(
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(t_lang(
        localization,
        "back-button",
        language_code,
    ))]])
    .resize_keyboard()
}

/// Inline keyboard from (label, callback data) pairs, two per row
pub fn callback_buttons(btns: &[(String, String)]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = btns
        .chunks(2)
        .map(|chunk| {
            chunk
                .iter()
                .map(|(text, data)| InlineKeyboardButton::callback(text.clone(), data.clone()))
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// First 8 characters of an order uuid, as shown to users
pub fn short_order_id(order_id: &Uuid) -> String {
    order_id.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captcha_keyboard_rows_of_three() {
        let options = ["🍎", "🚗", "🍬", "⚽", "🪑", "⌚"];
        let keyboard = captcha_keyboard(&options);
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert!(keyboard.inline_keyboard.iter().all(|row| row.len() == 3));
    }

    #[test]
    fn test_cart_keyboard_without_page_only_links_home() {
        let localization = crate::localization::create_localization_manager().unwrap();
        let keyboard = cart_keyboard(None, None, &Vec::new(), &localization, Some("en"));
        assert_eq!(keyboard.inline_keyboard.len(), 1);
        assert_eq!(keyboard.inline_keyboard[0].len(), 1);
    }

    #[test]
    fn test_short_order_id() {
        let id = Uuid::parse_str("0192aabb-1234-4e5f-8a9b-0123456789ab").unwrap();
        assert_eq!(short_order_id(&id), "0192aabb");
    }
}
