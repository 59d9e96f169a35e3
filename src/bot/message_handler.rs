//! Message Handler module for processing incoming Telegram messages
//!
//! Routes commands, dialogue-step answers (registration, checkout, admin)
//! and the Stars payment confirmation. Group chats only get moderation.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, ReplyMarkup};
use tracing::{debug, warn};

use super::{admin, group, is_subscribed, send_content, ui_builder, AppContext};
use crate::captcha;
use crate::currency::{convert_currency, format_price};
use crate::db;
use crate::dialogue::{StoreDialogue, StoreDialogueState};
use crate::localization::{t_args_lang, t_lang};
use crate::menu;
use crate::validation;

/// Handle every incoming message
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    ctx: AppContext,
    dialogue: StoreDialogue,
) -> Result<()> {
    if msg.chat.is_group() || msg.chat.is_supergroup() {
        return group::moderate_group_message(&bot, &msg, &ctx).await;
    }

    let user = match msg.from.as_ref() {
        Some(user) => user,
        None => return Ok(()),
    };
    let telegram_id = user.id.0 as i64;
    let language = db::get_user_language(&ctx.pool, telegram_id).await?;
    let lang = Some(language.as_str());

    // Stars payments come back as a service message once Telegram settles them
    if msg.successful_payment().is_some() {
        return finalize_star_payment(&bot, &msg, &ctx, &dialogue, telegram_id, &language).await;
    }

    let state = dialogue.get().await?;

    // Admin dialogue steps accept photos as well as text
    if let Some(state) = state.clone() {
        if state.is_admin_step() && ctx.config.is_admin(telegram_id) {
            return admin::handle_dialogue_message(&bot, &msg, &ctx, &dialogue, state, &language)
                .await;
        }
    }

    let text = match msg.text() {
        Some(text) => text,
        None => {
            debug!(user_id = %telegram_id, "Ignoring non-text message outside a dialogue");
            return Ok(());
        }
    };

    match state {
        Some(StoreDialogueState::RegistrationName) => {
            handle_registration_name(&bot, &msg, &ctx, &dialogue, text, &language).await
        }
        Some(StoreDialogueState::RegistrationPhone { first_name }) => {
            handle_registration_phone(
                &bot, &msg, &ctx, &dialogue, text, &first_name, telegram_id, &language,
            )
            .await
        }
        Some(StoreDialogueState::OrderName) => {
            handle_order_name(&bot, &msg, &ctx, &dialogue, text, &language).await
        }
        Some(StoreDialogueState::OrderPhone { name }) => {
            handle_order_phone(&bot, &msg, &ctx, &dialogue, text, name, &language).await
        }
        Some(StoreDialogueState::OrderAddress { name, phone }) => {
            handle_order_address(
                &bot, &msg, &ctx, &dialogue, text, name, phone, telegram_id, &language,
            )
            .await
        }
        Some(StoreDialogueState::OrderPayment { .. }) => {
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "payment-use-buttons", lang),
            )
            .await?;
            Ok(())
        }
        _ => handle_command(&bot, &msg, &ctx, &dialogue, text, telegram_id, &language).await,
    }
}

/// `/start`: captcha gate, then registration, then the subscription gate,
/// then the main menu
async fn handle_start(
    bot: &Bot,
    msg: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    telegram_id: i64,
    language: &str,
) -> Result<()> {
    let lang = Some(language);
    let first_name = msg
        .from
        .as_ref()
        .map(|user| user.first_name.as_str())
        .unwrap_or("Unknown");

    let user = db::get_or_create_user(&ctx.pool, telegram_id, first_name, lang).await?;

    if !db::has_recent_captcha_pass(&ctx.pool, telegram_id).await? {
        let challenge = captcha::issue_challenge(&ctx.caches, telegram_id);
        bot.send_message(
            msg.chat.id,
            t_args_lang(
                &ctx.localization,
                "captcha-prompt",
                &[("word", challenge.word.clone())],
                lang,
            ),
        )
        .parse_mode(ParseMode::Html)
        .reply_markup(ui_builder::captcha_keyboard(&captcha::captcha_options()))
        .await?;
        return Ok(());
    }

    if user.phone.is_none() {
        bot.send_message(
            msg.chat.id,
            t_lang(&ctx.localization, "first-name-request", lang),
        )
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;
        dialogue.update(StoreDialogueState::RegistrationName).await?;
        return Ok(());
    }

    if !is_subscribed(bot, ctx, telegram_id).await {
        bot.send_message(
            msg.chat.id,
            t_lang(&ctx.localization, "subscription-required", lang),
        )
        .reply_markup(ui_builder::subscription_keyboard(
            &ctx.config.channel_link,
            &ctx.localization,
            lang,
        ))
        .await?;
        return Ok(());
    }

    let request = menu::MenuRequest {
        level: 0,
        menu_name: "main".to_string(),
        page: 1,
        telegram_id,
        language: language.to_string(),
        ..Default::default()
    };
    let content = menu::get_menu_content(&ctx.menu(), &request).await?;
    send_content(bot, msg.chat.id, &content).await
}

async fn handle_registration_name(
    bot: &Bot,
    msg: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    text: &str,
    language: &str,
) -> Result<()> {
    let lang = Some(language);
    match validation::validate_first_name(text) {
        Ok(first_name) => {
            dialogue
                .update(StoreDialogueState::RegistrationPhone {
                    first_name: first_name.to_string(),
                })
                .await?;
            bot.send_message(msg.chat.id, t_lang(&ctx.localization, "phone-request", lang))
                .parse_mode(ParseMode::Html)
                .reply_markup(ui_builder::back_reply_keyboard(&ctx.localization, lang))
                .await?;
        }
        Err(error_key) => {
            bot.send_message(msg.chat.id, t_lang(&ctx.localization, error_key, lang))
                .await?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_registration_phone(
    bot: &Bot,
    msg: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    text: &str,
    first_name: &str,
    telegram_id: i64,
    language: &str,
) -> Result<()> {
    let lang = Some(language);

    if text == t_lang(&ctx.localization, "back-button", lang) {
        dialogue.update(StoreDialogueState::RegistrationName).await?;
        bot.send_message(
            msg.chat.id,
            t_lang(&ctx.localization, "first-name-request", lang),
        )
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;
        return Ok(());
    }

    let phone = match validation::format_phone_number(text) {
        Some(phone) => phone,
        None => {
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "invalid-phone-format", lang),
            )
            .await?;
            return Ok(());
        }
    };

    if !db::set_user_phone(&ctx.pool, telegram_id, first_name, &phone).await? {
        bot.send_message(
            msg.chat.id,
            t_lang(&ctx.localization, "phone-already-registered", lang),
        )
        .await?;
        return Ok(());
    }

    dialogue.exit().await?;
    bot.send_message(
        msg.chat.id,
        t_args_lang(
            &ctx.localization,
            "registration-complete",
            &[
                ("name", first_name.to_string()),
                ("phone", phone.clone()),
            ],
            lang,
        ),
    )
    .reply_markup(ReplyMarkup::kb_remove())
    .await?;

    if is_subscribed(bot, ctx, telegram_id).await {
        let request = menu::MenuRequest {
            level: 0,
            menu_name: "main".to_string(),
            page: 1,
            telegram_id,
            language: language.to_string(),
            ..Default::default()
        };
        let content = menu::get_menu_content(&ctx.menu(), &request).await?;
        send_content(bot, msg.chat.id, &content).await?;
    } else {
        bot.send_message(
            msg.chat.id,
            t_lang(&ctx.localization, "subscription-required", lang),
        )
        .reply_markup(ui_builder::subscription_keyboard(
            &ctx.config.channel_link,
            &ctx.localization,
            lang,
        ))
        .await?;
    }

    Ok(())
}

async fn handle_order_name(
    bot: &Bot,
    msg: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    text: &str,
    language: &str,
) -> Result<()> {
    let lang = Some(language);
    match validation::validate_recipient_name(text) {
        Ok(name) => {
            dialogue
                .update(StoreDialogueState::OrderPhone {
                    name: name.to_string(),
                })
                .await?;
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "phone-request-order", lang),
            )
            .reply_markup(ui_builder::back_reply_keyboard(&ctx.localization, lang))
            .await?;
        }
        Err(error_key) => {
            bot.send_message(msg.chat.id, t_lang(&ctx.localization, error_key, lang))
                .await?;
        }
    }
    Ok(())
}

async fn handle_order_phone(
    bot: &Bot,
    msg: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    text: &str,
    name: String,
    language: &str,
) -> Result<()> {
    let lang = Some(language);

    if text == t_lang(&ctx.localization, "back-button", lang) {
        dialogue.update(StoreDialogueState::OrderName).await?;
        bot.send_message(
            msg.chat.id,
            t_lang(&ctx.localization, "name-request-again", lang),
        )
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;
        return Ok(());
    }

    match validation::format_phone_number(text) {
        Some(phone) => {
            dialogue
                .update(StoreDialogueState::OrderAddress { name, phone })
                .await?;
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "address-request", lang),
            )
            .reply_markup(ui_builder::back_reply_keyboard(&ctx.localization, lang))
            .await?;
        }
        None => {
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "invalid-phone-format-order", lang),
            )
            .await?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_order_address(
    bot: &Bot,
    msg: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    text: &str,
    name: String,
    phone: String,
    telegram_id: i64,
    language: &str,
) -> Result<()> {
    let lang = Some(language);

    if text == t_lang(&ctx.localization, "back-button", lang) {
        dialogue
            .update(StoreDialogueState::OrderPhone { name })
            .await?;
        bot.send_message(
            msg.chat.id,
            t_lang(&ctx.localization, "phone-request-again", lang),
        )
        .reply_markup(ui_builder::back_reply_keyboard(&ctx.localization, lang))
        .await?;
        return Ok(());
    }

    let address = match validation::validate_address(text) {
        Ok(address) => address.to_string(),
        Err(error_key) => {
            bot.send_message(msg.chat.id, t_lang(&ctx.localization, error_key, lang))
                .await?;
            return Ok(());
        }
    };

    let cart_lines = db::get_user_cart(&ctx.pool, telegram_id).await?;
    let amount_usd: f64 = cart_lines
        .iter()
        .map(|line| line.product.price * f64::from(line.quantity))
        .sum();

    let (total, currency) = convert_currency(&ctx.rates, amount_usd, language).await?;
    let confirmation = t_args_lang(
        &ctx.localization,
        "order-confirmation",
        &[
            ("name", name.clone()),
            ("phone", phone.clone()),
            ("address", address.clone()),
            ("total_amount", format_price(total, currency)),
        ],
        lang,
    );

    bot.send_message(msg.chat.id, confirmation)
        .parse_mode(ParseMode::Html)
        .reply_markup(ui_builder::order_confirmation_keyboard(
            ctx.config.user_agreement_url.as_deref(),
            &ctx.localization,
            lang,
        ))
        .await?;

    dialogue
        .update(StoreDialogueState::OrderPayment {
            name,
            phone,
            address,
            amount_usd,
        })
        .await?;
    Ok(())
}

/// Commands and admin reply-keyboard labels
async fn handle_command(
    bot: &Bot,
    msg: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    text: &str,
    telegram_id: i64,
    language: &str,
) -> Result<()> {
    let lang = Some(language);

    if text == "/start" {
        return handle_start(bot, msg, ctx, dialogue, telegram_id, language).await;
    }

    if text == "/menu" {
        let request = menu::MenuRequest {
            level: 0,
            menu_name: "main".to_string(),
            page: 1,
            telegram_id,
            language: language.to_string(),
            ..Default::default()
        };
        let content = menu::get_menu_content(&ctx.menu(), &request).await?;
        return send_content(bot, msg.chat.id, &content).await;
    }

    if let Some(page) = match text {
        "/about" => Some("about"),
        "/payment" => Some("payment"),
        "/shipping" => Some("shipping"),
        _ => None,
    } {
        let content = menu::info_page_content(&ctx.menu(), page, language).await?;
        return send_content(bot, msg.chat.id, &content).await;
    }

    if text == "/orders" {
        let content = menu::orders_content(&ctx.menu(), telegram_id, language).await?;
        return send_content(bot, msg.chat.id, &content).await;
    }

    if text == "/profile" {
        let user = msg.from.as_ref();
        let content = menu::profile_content(
            &ctx.menu(),
            telegram_id,
            language,
            user.map(|u| u.first_name.as_str()).unwrap_or(""),
            user.and_then(|u| u.last_name.as_deref()).unwrap_or(""),
            user.and_then(|u| u.username.as_deref()).unwrap_or("N/A"),
        )
        .await?;
        return send_content(bot, msg.chat.id, &content).await;
    }

    if text == "/admin" {
        if ctx.config.is_admin(telegram_id) {
            bot.send_message(
                msg.chat.id,
                t_lang(&ctx.localization, "admin-what-to-do", lang),
            )
            .reply_markup(ui_builder::admin_keyboard(&ctx.localization, lang))
            .await?;
        } else {
            warn!(user_id = %telegram_id, "Non-admin tried /admin");
        }
        return Ok(());
    }

    if ctx.config.is_admin(telegram_id)
        && admin::handle_admin_action(bot, msg, ctx, dialogue, text, language).await?
    {
        return Ok(());
    }

    bot.send_message(msg.chat.id, t_lang(&ctx.localization, "menu-hint", lang))
        .await?;
    Ok(())
}

/// Create the order once Telegram reports a settled Stars payment
async fn finalize_star_payment(
    bot: &Bot,
    msg: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    telegram_id: i64,
    language: &str,
) -> Result<()> {
    match dialogue.get().await? {
        Some(StoreDialogueState::OrderPayment {
            name,
            phone,
            address,
            amount_usd,
        }) => {
            super::complete_order(
                bot, ctx, telegram_id, msg.chat.id, &name, &phone, &address, amount_usd, "XTR",
                language,
            )
            .await?;
            dialogue.exit().await?;
        }
        _ => {
            warn!(user_id = %telegram_id, "Stars payment arrived without a checkout dialogue");
            bot.send_message(
                msg.chat.id,
                t_lang(
                    &ctx.localization,
                    "payment-received-order-failed",
                    Some(language),
                ),
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
    }
    Ok(())
}
