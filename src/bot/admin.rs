//! Admin console: product CRUD, banner images, statistics, broadcast
//!
//! Reached through /admin and a reply keyboard. The add/edit product flow is
//! a dialogue walking through both languages, category, price and photo; "."
//! keeps the stored value when editing an existing product.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, Message, ParseMode, ReplyMarkup};
use tracing::{info, warn};

use super::{ui_builder, AppContext};
use crate::db::{self, ProductInput};
use crate::dialogue::{StoreDialogue, StoreDialogueState};
use crate::localization::{t_args_lang, t_lang};
use crate::validation;

/// Handle the admin reply-keyboard labels. Returns `false` when the text is
/// not an admin action.
pub async fn handle_admin_action(
    bot: &Bot,
    msg: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    text: &str,
    language: &str,
) -> Result<bool> {
    let lang = Some(language);

    if text == t_lang(&ctx.localization, "admin-add-good", lang) {
        bot.send_message(
            msg.chat.id,
            t_lang(&ctx.localization, "admin-product-name-en-request", lang),
        )
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;
        dialogue
            .update(StoreDialogueState::AdminProductNameEn { editing: None })
            .await?;
        return Ok(true);
    }

    if text == t_lang(&ctx.localization, "admin-assortment", lang) {
        let categories = db::get_categories(&ctx.pool).await?;
        let buttons: Vec<(String, String)> = categories
            .into_iter()
            .map(|category| (category.name, format!("admincat_{}", category.id)))
            .collect();
        bot.send_message(
            msg.chat.id,
            t_lang(&ctx.localization, "admin-choose-category", lang),
        )
        .reply_markup(ui_builder::callback_buttons(&buttons))
        .await?;
        return Ok(true);
    }

    if text == t_lang(&ctx.localization, "admin-add-banner", lang) {
        let pages: Vec<String> = db::get_info_pages(&ctx.pool)
            .await?
            .into_iter()
            .map(|banner| banner.name)
            .collect();
        bot.send_message(
            msg.chat.id,
            t_args_lang(
                &ctx.localization,
                "admin-banner-request",
                &[("pages", pages.join(", "))],
                lang,
            ),
        )
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;
        dialogue.update(StoreDialogueState::AdminBannerImage).await?;
        return Ok(true);
    }

    if text == t_lang(&ctx.localization, "admin-statistics", lang) {
        let users = db::total_users(&ctx.pool).await?;
        let products = db::total_products(&ctx.pool).await?;
        let per_category = db::products_per_category(&ctx.pool).await?;

        let category_lines = per_category
            .into_iter()
            .map(|(name, count)| format!("• {}: {}", name, count))
            .collect::<Vec<_>>()
            .join("\n");
        bot.send_message(
            msg.chat.id,
            t_args_lang(
                &ctx.localization,
                "admin-statistics-text",
                &[
                    ("users", users.to_string()),
                    ("products", products.to_string()),
                    ("categories", category_lines),
                ],
                lang,
            ),
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(true);
    }

    if text == t_lang(&ctx.localization, "admin-newsletter", lang) {
        bot.send_message(
            msg.chat.id,
            t_lang(&ctx.localization, "admin-broadcast-request", lang),
        )
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;
        dialogue.update(StoreDialogueState::AdminBroadcast).await?;
        return Ok(true);
    }

    Ok(false)
}

/// Product stored for the id being edited, when there is one
async fn current_product(ctx: &AppContext, editing: Option<i64>) -> Result<Option<db::Product>> {
    match editing {
        Some(product_id) => db::get_product(&ctx.pool, product_id).await,
        None => Ok(None),
    }
}

/// Handle a message while an admin dialogue step is active
pub async fn handle_dialogue_message(
    bot: &Bot,
    msg: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    state: StoreDialogueState,
    language: &str,
) -> Result<()> {
    let lang = Some(language);
    let text = msg.text().unwrap_or("");

    if text.eq_ignore_ascii_case("cancel") || text == "/cancel" {
        dialogue.exit().await?;
        bot.send_message(
            msg.chat.id,
            t_lang(&ctx.localization, "admin-canceled", lang),
        )
        .reply_markup(ui_builder::admin_keyboard(&ctx.localization, lang))
        .await?;
        return Ok(());
    }

    if text.eq_ignore_ascii_case("back") || text == "/back" {
        return step_back(bot, msg, ctx, dialogue, state, language).await;
    }

    match state {
        StoreDialogueState::AdminProductNameEn { editing } => {
            let value = match keep_or_text(text, editing, |product| product.name_en.clone(), ctx)
                .await?
            {
                Some(value) => value,
                None => {
                    bot.send_message(
                        msg.chat.id,
                        t_lang(&ctx.localization, "admin-product-name-invalid", lang),
                    )
                    .await?;
                    return Ok(());
                }
            };
            dialogue
                .update(StoreDialogueState::AdminProductNameRu {
                    editing,
                    name_en: value,
                })
                .await?;
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "admin-product-name-ru-request", lang),
            )
            .await?;
        }
        StoreDialogueState::AdminProductNameRu { editing, name_en } => {
            let value = match keep_or_text(text, editing, |product| product.name_ru.clone(), ctx)
                .await?
            {
                Some(value) => value,
                None => {
                    bot.send_message(
                        msg.chat.id,
                        t_lang(&ctx.localization, "admin-product-name-invalid", lang),
                    )
                    .await?;
                    return Ok(());
                }
            };
            dialogue
                .update(StoreDialogueState::AdminProductDescriptionEn {
                    editing,
                    name_en,
                    name_ru: value,
                })
                .await?;
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "admin-product-description-en-request", lang),
            )
            .await?;
        }
        StoreDialogueState::AdminProductDescriptionEn {
            editing,
            name_en,
            name_ru,
        } => {
            let value = match keep_or_description(text, editing, false, ctx).await? {
                Some(value) => value,
                None => {
                    bot.send_message(
                        msg.chat.id,
                        t_lang(&ctx.localization, "admin-product-description-invalid", lang),
                    )
                    .await?;
                    return Ok(());
                }
            };
            dialogue
                .update(StoreDialogueState::AdminProductDescriptionRu {
                    editing,
                    name_en,
                    name_ru,
                    description_en: value,
                })
                .await?;
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "admin-product-description-ru-request", lang),
            )
            .await?;
        }
        StoreDialogueState::AdminProductDescriptionRu {
            editing,
            name_en,
            name_ru,
            description_en,
        } => {
            let value = match keep_or_description(text, editing, true, ctx).await? {
                Some(value) => value,
                None => {
                    bot.send_message(
                        msg.chat.id,
                        t_lang(&ctx.localization, "admin-product-description-invalid", lang),
                    )
                    .await?;
                    return Ok(());
                }
            };

            let categories = db::get_categories(&ctx.pool).await?;
            let buttons: Vec<(String, String)> = categories
                .into_iter()
                .map(|category| (category.name, format!("setcat_{}", category.id)))
                .collect();

            dialogue
                .update(StoreDialogueState::AdminProductCategory {
                    editing,
                    name_en,
                    name_ru,
                    description_en,
                    description_ru: value,
                })
                .await?;
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "admin-choose-category", lang),
            )
            .reply_markup(ui_builder::callback_buttons(&buttons))
            .await?;
        }
        StoreDialogueState::AdminProductCategory { .. } => {
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "admin-pick-category-hint", lang),
            )
            .await?;
        }
        StoreDialogueState::AdminProductPrice {
            editing,
            name_en,
            name_ru,
            description_en,
            description_ru,
            category_id,
        } => {
            let price = if text == "." {
                match current_product(ctx, editing).await? {
                    Some(product) => product.price,
                    None => {
                        bot.send_message(
                            msg.chat.id,
                            t_lang(&ctx.localization, "price-invalid", lang),
                        )
                        .await?;
                        return Ok(());
                    }
                }
            } else {
                match validation::parse_price(text) {
                    Ok(price) => price,
                    Err(error_key) => {
                        bot.send_message(msg.chat.id, t_lang(&ctx.localization, error_key, lang))
                            .await?;
                        return Ok(());
                    }
                }
            };

            dialogue
                .update(StoreDialogueState::AdminProductImage {
                    editing,
                    name_en,
                    name_ru,
                    description_en,
                    description_ru,
                    category_id,
                    price,
                })
                .await?;
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "admin-product-image-request", lang),
            )
            .await?;
        }
        StoreDialogueState::AdminProductImage {
            editing,
            name_en,
            name_ru,
            description_en,
            description_ru,
            category_id,
            price,
        } => {
            let image = if let Some(photos) = msg.photo() {
                photos.last().map(|photo| photo.file.id.0.clone())
            } else if text == "." {
                current_product(ctx, editing).await?.and_then(|p| p.image)
            } else {
                bot.send_message(
                    msg.chat.id,
                    t_lang(&ctx.localization, "admin-product-image-invalid", lang),
                )
                .await?;
                return Ok(());
            };

            let input = ProductInput {
                name_en,
                name_ru,
                description_en,
                description_ru,
                price,
                image,
                category_id,
            };

            match editing {
                Some(product_id) => {
                    db::update_product(&ctx.pool, product_id, &input).await?;
                    info!(product_id = %product_id, "Product updated via admin console");
                }
                None => {
                    let product_id = db::create_product(&ctx.pool, &input).await?;
                    info!(product_id = %product_id, "Product created via admin console");
                }
            }

            dialogue.exit().await?;
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "admin-product-saved", lang),
            )
            .reply_markup(ui_builder::admin_keyboard(&ctx.localization, lang))
            .await?;
        }
        StoreDialogueState::AdminBannerImage => {
            let photos = match msg.photo() {
                Some(photos) => photos,
                None => {
                    bot.send_message(
                        msg.chat.id,
                        t_lang(&ctx.localization, "admin-banner-need-photo", lang),
                    )
                    .await?;
                    return Ok(());
                }
            };
            let page = msg.caption().unwrap_or("").trim();
            let known_pages: Vec<String> = db::get_info_pages(&ctx.pool)
                .await?
                .into_iter()
                .map(|banner| banner.name)
                .collect();

            if !known_pages.iter().any(|name| name == page) {
                bot.send_message(
                    msg.chat.id,
                    t_args_lang(
                        &ctx.localization,
                        "admin-banner-wrong-page",
                        &[("pages", known_pages.join(", "))],
                        lang,
                    ),
                )
                .await?;
                return Ok(());
            }

            if let Some(photo) = photos.last() {
                db::set_banner_image(&ctx.pool, page, &photo.file.id.0).await?;
            }
            dialogue.exit().await?;
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "admin-banner-saved", lang),
            )
            .reply_markup(ui_builder::admin_keyboard(&ctx.localization, lang))
            .await?;
        }
        StoreDialogueState::AdminBroadcast => {
            if text.is_empty() {
                bot.send_message(
                    msg.chat.id,
                    t_lang(&ctx.localization, "admin-broadcast-request", lang),
                )
                .await?;
                return Ok(());
            }

            let mut delivered: u64 = 0;
            for user_id in db::all_user_ids(&ctx.pool).await? {
                if bot
                    .send_message(ChatId(user_id), text.to_string())
                    .parse_mode(ParseMode::Html)
                    .await
                    .is_ok()
                {
                    delivered += 1;
                }
            }

            dialogue.exit().await?;
            bot.send_message(
                msg.chat.id,
                t_args_lang(
                    &ctx.localization,
                    "admin-broadcast-done",
                    &[("count", delivered.to_string())],
                    lang,
                ),
            )
            .reply_markup(ui_builder::admin_keyboard(&ctx.localization, lang))
            .await?;
            info!(delivered = %delivered, "Broadcast finished");
        }
        _ => {}
    }

    Ok(())
}

/// Step one state back in the add-product chain
async fn step_back(
    bot: &Bot,
    msg: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    state: StoreDialogueState,
    language: &str,
) -> Result<()> {
    let lang = Some(language);

    let (previous, prompt_key) = match state {
        StoreDialogueState::AdminProductNameRu { editing, .. } => (
            StoreDialogueState::AdminProductNameEn { editing },
            "admin-product-name-en-request",
        ),
        StoreDialogueState::AdminProductDescriptionEn {
            editing, name_en, ..
        } => (
            StoreDialogueState::AdminProductNameRu { editing, name_en },
            "admin-product-name-ru-request",
        ),
        StoreDialogueState::AdminProductDescriptionRu {
            editing,
            name_en,
            name_ru,
            ..
        } => (
            StoreDialogueState::AdminProductDescriptionEn {
                editing,
                name_en,
                name_ru,
            },
            "admin-product-description-en-request",
        ),
        StoreDialogueState::AdminProductCategory {
            editing,
            name_en,
            name_ru,
            description_en,
            ..
        } => (
            StoreDialogueState::AdminProductDescriptionRu {
                editing,
                name_en,
                name_ru,
                description_en,
            },
            "admin-product-description-ru-request",
        ),
        StoreDialogueState::AdminProductPrice {
            editing,
            name_en,
            name_ru,
            description_en,
            description_ru,
            ..
        } => (
            StoreDialogueState::AdminProductCategory {
                editing,
                name_en,
                name_ru,
                description_en,
                description_ru,
            },
            "admin-choose-category",
        ),
        StoreDialogueState::AdminProductImage {
            editing,
            name_en,
            name_ru,
            description_en,
            description_ru,
            category_id,
            ..
        } => (
            StoreDialogueState::AdminProductPrice {
                editing,
                name_en,
                name_ru,
                description_en,
                description_ru,
                category_id,
            },
            "admin-product-price-request",
        ),
        _ => {
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "admin-no-previous-step", lang),
            )
            .await?;
            return Ok(());
        }
    };

    dialogue.update(previous).await?;
    bot.send_message(msg.chat.id, t_lang(&ctx.localization, prompt_key, lang))
        .await?;
    Ok(())
}

/// Handle admin callback buttons. Returns `false` for unrelated data.
pub async fn handle_admin_callback(
    bot: &Bot,
    q: &CallbackQuery,
    message: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    data: &str,
    language: &str,
) -> Result<bool> {
    let lang = Some(language);

    if let Some(category_id) = data.strip_prefix("admincat_").and_then(|id| id.parse::<i64>().ok())
    {
        let products = db::get_products(&ctx.pool, Some(category_id)).await?;
        for product in &products {
            let caption = format!(
                "<strong>{}</strong>\n{}\nPrice: {:.2}💵",
                product.name_en, product.description_en, product.price
            );
            let buttons = vec![
                (
                    t_lang(&ctx.localization, "admin-delete-product", lang),
                    format!("delete_{}", product.id),
                ),
                (
                    t_lang(&ctx.localization, "admin-edit-product", lang),
                    format!("edit_{}", product.id),
                ),
            ];
            match &product.image {
                Some(file_id) => {
                    bot.send_photo(message.chat.id, InputFile::file_id(FileId(file_id.clone())))
                        .caption(caption)
                        .parse_mode(ParseMode::Html)
                        .reply_markup(ui_builder::callback_buttons(&buttons))
                        .await?;
                }
                None => {
                    bot.send_message(message.chat.id, caption)
                        .parse_mode(ParseMode::Html)
                        .reply_markup(ui_builder::callback_buttons(&buttons))
                        .await?;
                }
            }
        }
        bot.send_message(
            message.chat.id,
            t_lang(&ctx.localization, "admin-products-listed", lang),
        )
        .await?;
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(true);
    }

    if let Some(product_id) = data.strip_prefix("delete_").and_then(|id| id.parse::<i64>().ok()) {
        if db::delete_product(&ctx.pool, product_id).await? {
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "admin-product-deleted", lang))
                .await?;
            bot.delete_message(message.chat.id, message.id).await?;
        } else {
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "admin-product-missing", lang))
                .show_alert(true)
                .await?;
        }
        return Ok(true);
    }

    if let Some(product_id) = data.strip_prefix("edit_").and_then(|id| id.parse::<i64>().ok()) {
        if db::get_product(&ctx.pool, product_id).await?.is_none() {
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "admin-product-missing", lang))
                .show_alert(true)
                .await?;
            return Ok(true);
        }
        dialogue
            .update(StoreDialogueState::AdminProductNameEn {
                editing: Some(product_id),
            })
            .await?;
        bot.send_message(
            message.chat.id,
            format!(
                "{}\n{}",
                t_lang(&ctx.localization, "admin-product-name-en-request", lang),
                t_lang(&ctx.localization, "admin-keep-hint", lang)
            ),
        )
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(true);
    }

    if let Some(category_id) = data.strip_prefix("setcat_").and_then(|id| id.parse::<i64>().ok()) {
        let state = dialogue.get().await?;
        if let Some(StoreDialogueState::AdminProductCategory {
            editing,
            name_en,
            name_ru,
            description_en,
            description_ru,
        }) = state
        {
            let known = db::get_categories(&ctx.pool)
                .await?
                .iter()
                .any(|category| category.id == category_id);
            if !known {
                bot.answer_callback_query(q.id.clone())
                    .text(t_lang(&ctx.localization, "admin-pick-category-hint", lang))
                    .show_alert(true)
                    .await?;
                return Ok(true);
            }

            dialogue
                .update(StoreDialogueState::AdminProductPrice {
                    editing,
                    name_en,
                    name_ru,
                    description_en,
                    description_ru,
                    category_id,
                })
                .await?;
            bot.send_message(
                message.chat.id,
                t_lang(&ctx.localization, "admin-product-price-request", lang),
            )
            .await?;
            bot.answer_callback_query(q.id.clone()).await?;
        } else {
            warn!("Category picked outside the product dialogue");
            bot.answer_callback_query(q.id.clone()).await?;
        }
        return Ok(true);
    }

    Ok(false)
}

/// "." keeps the stored value (edit mode); otherwise take the text as-is
/// when it fits a product name
async fn keep_or_text(
    text: &str,
    editing: Option<i64>,
    pick: impl Fn(&db::Product) -> String,
    ctx: &AppContext,
) -> Result<Option<String>> {
    if text == "." && editing.is_some() {
        return Ok(current_product(ctx, editing).await?.map(|p| pick(&p)));
    }

    let trimmed = text.trim();
    let length = trimmed.chars().count();
    if !(2..=150).contains(&length) {
        return Ok(None);
    }
    Ok(Some(trimmed.to_string()))
}

/// Same as [`keep_or_text`] for the longer description fields
async fn keep_or_description(
    text: &str,
    editing: Option<i64>,
    russian: bool,
    ctx: &AppContext,
) -> Result<Option<String>> {
    if text == "." && editing.is_some() {
        return Ok(current_product(ctx, editing).await?.map(|product| {
            if russian {
                product.description_ru
            } else {
                product.description_en
            }
        }));
    }

    let trimmed = text.trim();
    let length = trimmed.chars().count();
    if !(4..=1000).contains(&length) {
        return Ok(None);
    }
    Ok(Some(trimmed.to_string()))
}
