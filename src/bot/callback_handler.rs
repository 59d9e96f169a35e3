//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{
    FileId, InputFile, InputMedia, InputMediaPhoto, LabeledPrice, MaybeInaccessibleMessage,
    Message, ParseMode, PreCheckoutQuery, ReplyMarkup,
};
use tracing::{debug, error, warn};

use super::{admin, is_subscribed, send_content, ui_builder, AppContext};
use crate::callbacks::{MenuCallback, OrderDetailCallback};
use crate::captcha::{self, CaptchaOutcome};
use crate::currency::{convert_currency, format_price};
use crate::db;
use crate::dialogue::{StoreDialogue, StoreDialogueState};
use crate::localization::{t_args_lang, t_lang};
use crate::menu::{self, MenuContent};
use crate::payment::{format_crypto_amount, stars_for_usd, PAYMENT_WINDOW, SUPPORTED_ASSETS};

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    ctx: AppContext,
    dialogue: StoreDialogue,
) -> Result<()> {
    let telegram_id = q.from.id.0 as i64;
    let language = db::get_user_language(&ctx.pool, telegram_id).await?;

    let message = match q.message.as_ref() {
        Some(MaybeInaccessibleMessage::Regular(message)) => message,
        _ => {
            warn!(user_id = %telegram_id, "Callback query without an accessible message");
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
    };

    let data = q.data.as_deref().unwrap_or("");
    debug!(user_id = %telegram_id, data = %data, "Callback query received");

    if let Some(answer) = data.strip_prefix("captcha_") {
        return handle_captcha_answer(&bot, &q, message, &ctx, &dialogue, answer, &language).await;
    }

    if let Some(callback) = MenuCallback::parse(data) {
        return handle_menu_callback(
            &bot, &q, message, &ctx, &dialogue, callback, telegram_id, &language,
        )
        .await;
    }

    if let Some(callback) = OrderDetailCallback::parse(data) {
        return handle_order_detail(&bot, &q, message, &ctx, callback, telegram_id, &language)
            .await;
    }

    if let Some(new_language) = data.strip_prefix("lang_") {
        return handle_language_change(&bot, &q, message, &ctx, new_language, telegram_id).await;
    }

    match data {
        "check_subscription" => {
            handle_check_subscription(&bot, &q, message, &ctx, telegram_id, &language).await
        }
        "select_payment" => handle_select_payment(&bot, &q, message, &ctx, &dialogue, &language).await,
        "star_payment" => {
            handle_star_payment(&bot, &q, message, &ctx, &dialogue, telegram_id, &language).await
        }
        "cancel_order" => handle_cancel_order(&bot, &q, message, &ctx, &dialogue, &language).await,
        _ if data.starts_with("crypto_") => {
            handle_crypto_payment(&bot, &q, message, &ctx, &dialogue, data, telegram_id, &language)
                .await
        }
        _ => {
            if ctx.config.is_admin(telegram_id)
                && admin::handle_admin_callback(&bot, &q, message, &ctx, &dialogue, data, &language)
                    .await?
            {
                return Ok(());
            }
            warn!(user_id = %telegram_id, data = %data, "Unhandled callback data");
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "action-unknown", Some(&language)))
                .await?;
            Ok(())
        }
    }
}

/// Approve Stars pre-checkout; Telegram requires an answer within 10 seconds
pub async fn pre_checkout_handler(bot: Bot, q: PreCheckoutQuery) -> Result<()> {
    bot.answer_pre_checkout_query(q.id, true).await?;
    Ok(())
}

/// Swap an already-sent menu message to new content, staying within
/// Telegram's editing rules (a media message cannot become a text one)
async fn edit_content(bot: &Bot, message: &Message, content: &MenuContent) -> Result<()> {
    let has_photo = message.photo().is_some();

    match (&content.photo, has_photo) {
        (Some(file_id), true) => {
            let media = InputMedia::Photo(
                InputMediaPhoto::new(InputFile::file_id(FileId(file_id.clone())))
                    .caption(content.caption.clone())
                    .parse_mode(ParseMode::Html),
            );
            bot.edit_message_media(message.chat.id, message.id, media)
                .reply_markup(content.keyboard.clone())
                .await?;
        }
        (None, true) => {
            bot.edit_message_caption(message.chat.id, message.id)
                .caption(content.caption.clone())
                .parse_mode(ParseMode::Html)
                .reply_markup(content.keyboard.clone())
                .await?;
        }
        (Some(_), false) => {
            bot.delete_message(message.chat.id, message.id).await?;
            send_content(bot, message.chat.id, content).await?;
        }
        (None, false) => {
            bot.edit_message_text(message.chat.id, message.id, content.caption.clone())
                .parse_mode(ParseMode::Html)
                .reply_markup(content.keyboard.clone())
                .await?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_menu_callback(
    bot: &Bot,
    q: &CallbackQuery,
    message: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    callback: MenuCallback,
    telegram_id: i64,
    language: &str,
) -> Result<()> {
    let lang = Some(language);

    match callback.menu_name.as_str() {
        "add_to_cart" => {
            let product_id = match callback.product_id {
                Some(product_id) => product_id,
                None => {
                    bot.answer_callback_query(q.id.clone())
                        .text(t_lang(&ctx.localization, "action-unknown", lang))
                        .await?;
                    return Ok(());
                }
            };
            // The user row must exist before the cart row references it
            db::get_or_create_user(&ctx.pool, telegram_id, &q.from.first_name, lang).await?;
            db::add_to_cart(&ctx.pool, telegram_id, product_id).await?;
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "product-added-to-cart", lang))
                .await?;
            return Ok(());
        }
        "order" => {
            let user = db::get_user(&ctx.pool, telegram_id).await?;
            if user.and_then(|user| user.phone).is_none() {
                bot.answer_callback_query(q.id.clone())
                    .text(t_lang(&ctx.localization, "registration-required", lang))
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
            bot.send_message(
                message.chat.id,
                t_lang(&ctx.localization, "first-name-request", lang),
            )
            .await?;
            dialogue.update(StoreDialogueState::OrderName).await?;
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
        "orders" => {
            let content = menu::orders_content(&ctx.menu(), telegram_id, language).await?;
            edit_content(bot, message, &content).await?;
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
        "profile" => {
            let content = menu::profile_content(
                &ctx.menu(),
                telegram_id,
                language,
                &q.from.first_name,
                q.from.last_name.as_deref().unwrap_or(""),
                q.from.username.as_deref().unwrap_or("N/A"),
            )
            .await?;
            edit_content(bot, message, &content).await?;
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
        "language" => {
            bot.edit_message_caption(message.chat.id, message.id)
                .caption(t_lang(&ctx.localization, "select-language", lang))
                .reply_markup(ui_builder::language_keyboard())
                .await?;
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
        _ => {}
    }

    let request = menu::MenuRequest {
        level: callback.level,
        menu_name: callback.menu_name,
        category: callback.category,
        page: callback.page,
        product_id: callback.product_id,
        telegram_id,
        language: language.to_string(),
    };

    match menu::get_menu_content(&ctx.menu(), &request).await {
        Ok(content) => {
            edit_content(bot, message, &content).await?;
            bot.answer_callback_query(q.id.clone()).await?;
        }
        Err(e) => {
            error!(user_id = %telegram_id, error = %e, "Menu rendering failed");
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "menu-error", lang))
                .show_alert(true)
                .await?;
        }
    }
    Ok(())
}

async fn handle_captcha_answer(
    bot: &Bot,
    q: &CallbackQuery,
    message: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    answer: &str,
    language: &str,
) -> Result<()> {
    let telegram_id = q.from.id.0 as i64;
    let lang = Some(language);

    match captcha::verify_answer(&ctx.caches, telegram_id, answer) {
        CaptchaOutcome::Passed => {
            db::mark_captcha_passed(&ctx.pool, telegram_id, answer).await?;
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "captcha-passed-answer", lang))
                .await?;
            bot.delete_message(message.chat.id, message.id).await?;

            let user = db::get_user(&ctx.pool, telegram_id).await?;
            if user.and_then(|user| user.phone).is_some() {
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
                    send_content(bot, message.chat.id, &content).await?;
                } else {
                    bot.send_message(
                        message.chat.id,
                        t_lang(&ctx.localization, "subscription-required", lang),
                    )
                    .reply_markup(ui_builder::subscription_keyboard(
                        &ctx.config.channel_link,
                        &ctx.localization,
                        lang,
                    ))
                    .await?;
                }
            } else {
                bot.send_message(
                    message.chat.id,
                    t_lang(&ctx.localization, "welcome-registration", lang),
                )
                .parse_mode(ParseMode::Html)
                .reply_markup(ReplyMarkup::kb_remove())
                .await?;
                dialogue.update(StoreDialogueState::RegistrationName).await?;
            }
        }
        CaptchaOutcome::Wrong => {
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "captcha-wrong-answer", lang))
                .await?;
        }
        CaptchaOutcome::NoPending => {
            // Challenge expired; replace the stale keyboard with a fresh one
            let challenge = captcha::issue_challenge(&ctx.caches, telegram_id);
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "captcha-expired", lang))
                .await?;
            bot.edit_message_text(
                message.chat.id,
                message.id,
                t_args_lang(
                    &ctx.localization,
                    "captcha-prompt",
                    &[("word", challenge.word)],
                    lang,
                ),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(ui_builder::captcha_keyboard(&captcha::captcha_options()))
            .await?;
        }
    }
    Ok(())
}

async fn handle_order_detail(
    bot: &Bot,
    q: &CallbackQuery,
    message: &Message,
    ctx: &AppContext,
    callback: OrderDetailCallback,
    telegram_id: i64,
    language: &str,
) -> Result<()> {
    let lang = Some(language);

    let order = match db::get_order(&ctx.pool, callback.order_id).await? {
        // Only the owner gets to open an order
        Some(order) if order.telegram_id == telegram_id => order,
        _ => {
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "order-not-found", lang))
                .show_alert(true)
                .await?;
            return Ok(());
        }
    };

    let items = db::get_order_items(&ctx.pool, order.id).await?;
    if items.is_empty() {
        bot.answer_callback_query(q.id.clone())
            .text(t_lang(&ctx.localization, "order-no-products", lang))
            .show_alert(true)
            .await?;
        return Ok(());
    }

    let content = menu::order_detail_content(&ctx.menu(), &order, &items, language).await?;
    edit_content(bot, message, &content).await?;
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

async fn handle_language_change(
    bot: &Bot,
    q: &CallbackQuery,
    message: &Message,
    ctx: &AppContext,
    new_language: &str,
    telegram_id: i64,
) -> Result<()> {
    if !ctx.localization.is_language_supported(new_language) {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    }

    db::set_user_language(&ctx.pool, telegram_id, new_language).await?;
    bot.delete_message(message.chat.id, message.id).await?;

    let request = menu::MenuRequest {
        level: 0,
        menu_name: "main".to_string(),
        page: 1,
        telegram_id,
        language: new_language.to_string(),
        ..Default::default()
    };
    let content = menu::get_menu_content(&ctx.menu(), &request).await?;
    send_content(bot, message.chat.id, &content).await?;
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

async fn handle_check_subscription(
    bot: &Bot,
    q: &CallbackQuery,
    message: &Message,
    ctx: &AppContext,
    telegram_id: i64,
    language: &str,
) -> Result<()> {
    let lang = Some(language);

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
        send_content(bot, message.chat.id, &content).await?;
        bot.delete_message(message.chat.id, message.id).await?;
        bot.answer_callback_query(q.id.clone())
            .text(t_lang(&ctx.localization, "subscription-confirmed", lang))
            .await?;
    } else {
        bot.answer_callback_query(q.id.clone())
            .text(t_lang(&ctx.localization, "subscription-missing", lang))
            .show_alert(true)
            .await?;
    }
    Ok(())
}

async fn handle_select_payment(
    bot: &Bot,
    q: &CallbackQuery,
    message: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    language: &str,
) -> Result<()> {
    let lang = Some(language);

    if !matches!(
        dialogue.get().await?,
        Some(StoreDialogueState::OrderPayment { .. })
    ) {
        bot.answer_callback_query(q.id.clone())
            .text(t_lang(&ctx.localization, "order-already-processed", lang))
            .show_alert(true)
            .await?;
        return Ok(());
    }

    bot.edit_message_text(
        message.chat.id,
        message.id,
        t_lang(&ctx.localization, "select-payment-method", lang),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(ui_builder::payment_method_keyboard(&ctx.localization, lang))
    .await?;
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_crypto_payment(
    bot: &Bot,
    q: &CallbackQuery,
    message: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    data: &str,
    telegram_id: i64,
    language: &str,
) -> Result<()> {
    let lang = Some(language);

    let (name, phone, address, amount_usd) = match dialogue.get().await? {
        Some(StoreDialogueState::OrderPayment {
            name,
            phone,
            address,
            amount_usd,
        }) => (name, phone, address, amount_usd),
        _ => {
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "order-already-processed", lang))
                .show_alert(true)
                .await?;
            return Ok(());
        }
    };

    let asset = data.trim_start_matches("crypto_");
    if !SUPPORTED_ASSETS.contains(&asset) {
        bot.answer_callback_query(q.id.clone())
            .text(t_lang(&ctx.localization, "action-unknown", lang))
            .await?;
        return Ok(());
    }

    let crypto_amount = match ctx.rates.convert_to_crypto(amount_usd, "USD", asset).await {
        Ok(amount) => amount,
        Err(e) => {
            crate::errors::error_logging::log_payment_error(
                &e,
                "convert_to_crypto",
                telegram_id,
                None,
                Some(asset),
            );
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "crypto-rate-error", lang))
                .show_alert(true)
                .await?;
            return Ok(());
        }
    };

    let description = t_args_lang(
        &ctx.localization,
        "order-payment-description",
        &[("user_id", telegram_id.to_string())],
        lang,
    );
    let invoice = match ctx
        .crypto_pay
        .create_invoice(asset, crypto_amount, &description)
        .await
    {
        Ok(invoice) => invoice,
        Err(e) => {
            crate::errors::error_logging::log_payment_error(
                &e,
                "create_invoice",
                telegram_id,
                None,
                Some(asset),
            );
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "crypto-invoice-error", lang))
                .show_alert(true)
                .await?;
            return Ok(());
        }
    };

    let expiration = chrono::Utc::now() + chrono::Duration::from_std(PAYMENT_WINDOW)?;
    let (display_amount, currency) = convert_currency(&ctx.rates, amount_usd, language).await?;
    let payment_message = t_args_lang(
        &ctx.localization,
        "payment-details",
        &[
            ("amount", format_price(display_amount, currency)),
            ("crypto_amount", format_crypto_amount(crypto_amount, asset)),
            ("crypto", asset.to_string()),
            ("expiration_time", expiration.format("%H:%M:%S UTC").to_string()),
        ],
        lang,
    );

    bot.edit_message_text(message.chat.id, message.id, payment_message)
        .parse_mode(ParseMode::Html)
        .reply_markup(ui_builder::invoice_keyboard(
            &invoice.bot_invoice_url,
            asset,
            &ctx.localization,
            lang,
        ))
        .await?;
    bot.answer_callback_query(q.id.clone()).await?;

    // Poll the invoice in the background; the dialogue stays in OrderPayment
    // until the payment resolves one way or the other
    let task_bot = bot.clone();
    let task_ctx = ctx.clone();
    let task_dialogue = dialogue.clone();
    let task_language = language.to_string();
    let task_asset = asset.to_string();
    let chat_id = message.chat.id;
    let invoice_id = invoice.invoice_id;

    tokio::spawn(async move {
        let paid = task_ctx.crypto_pay.wait_for_payment(invoice_id).await;

        let outcome: Result<()> = async {
            if paid {
                super::complete_order(
                    &task_bot,
                    &task_ctx,
                    telegram_id,
                    chat_id,
                    &name,
                    &phone,
                    &address,
                    amount_usd,
                    &task_asset,
                    &task_language,
                )
                .await?;
            } else {
                task_bot
                    .send_message(
                        chat_id,
                        t_lang(
                            &task_ctx.localization,
                            "payment-time-expired",
                            Some(&task_language),
                        ),
                    )
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
            task_dialogue.exit().await?;
            Ok(())
        }
        .await;

        if let Err(e) = outcome {
            crate::errors::error_logging::log_payment_error(
                &e,
                "invoice_poll_finalize",
                telegram_id,
                Some(invoice_id),
                Some(&task_asset),
            );
            let _ = task_bot
                .send_message(
                    chat_id,
                    t_lang(
                        &task_ctx.localization,
                        "payment-received-order-failed",
                        Some(&task_language),
                    ),
                )
                .await;
        }
    });

    Ok(())
}

async fn handle_star_payment(
    bot: &Bot,
    q: &CallbackQuery,
    message: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    telegram_id: i64,
    language: &str,
) -> Result<()> {
    let lang = Some(language);

    let amount_usd = match dialogue.get().await? {
        Some(StoreDialogueState::OrderPayment { amount_usd, .. }) => amount_usd,
        _ => {
            bot.answer_callback_query(q.id.clone())
                .text(t_lang(&ctx.localization, "order-already-processed", lang))
                .show_alert(true)
                .await?;
            return Ok(());
        }
    };

    let stars_amount = stars_for_usd(amount_usd, ctx.config.star_rate_usd).max(1);
    let prices = vec![LabeledPrice {
        label: "XTR".to_string(),
        amount: stars_amount as u32,
    }];
    let payload = format!("order:{}:{}", telegram_id, stars_amount);

    bot.send_invoice(
        message.chat.id,
        t_lang(&ctx.localization, "order-payment-title", lang),
        t_args_lang(
            &ctx.localization,
            "star-payment-description",
            &[("stars_amount", stars_amount.to_string())],
            lang,
        ),
        payload,
        "XTR",
        prices,
    )
    .reply_markup(ui_builder::stars_keyboard(
        stars_amount,
        &ctx.localization,
        lang,
    ))
    .await?;
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

async fn handle_cancel_order(
    bot: &Bot,
    q: &CallbackQuery,
    message: &Message,
    ctx: &AppContext,
    dialogue: &StoreDialogue,
    language: &str,
) -> Result<()> {
    let lang = Some(language);

    if dialogue.get().await?.is_none() {
        bot.answer_callback_query(q.id.clone())
            .text(t_lang(&ctx.localization, "order-already-processed", lang))
            .show_alert(true)
            .await?;
        return Ok(());
    }

    bot.edit_message_reply_markup(message.chat.id, message.id)
        .await?;
    bot.answer_callback_query(q.id.clone()).await?;
    bot.send_message(
        message.chat.id,
        t_lang(&ctx.localization, "order-canceled", lang),
    )
    .reply_markup(ReplyMarkup::kb_remove())
    .await?;
    dialogue.exit().await?;
    Ok(())
}
