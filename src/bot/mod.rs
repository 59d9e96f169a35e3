//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `message_handler`: Commands and dialogue-step text messages
//! - `callback_handler`: All inline keyboard callback queries
//! - `admin`: The admin console (product CRUD, banners, stats, broadcast)
//! - `group`: Restricted-word moderation in group chats
//! - `ui_builder`: Creates keyboards and formats messages

pub mod admin;
pub mod callback_handler;
pub mod group;
pub mod message_handler;
pub mod ui_builder;

use anyhow::Result;
use sqlx::postgres::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, ParseMode, UserId};
use tracing::info;

use crate::cache::BotCaches;
use crate::config::BotConfig;
use crate::currency::{convert_currency, format_price};
use crate::db;
use crate::localization::{t_args_lang, LocalizationManager};
use crate::menu::{MenuContent, MenuContext};
use crate::payment::{CryptoPayClient, RateClient};

/// Shared dependencies handed to every handler
#[derive(Clone)]
pub struct AppContext {
    pub pool: Arc<PgPool>,
    pub config: Arc<BotConfig>,
    pub localization: Arc<LocalizationManager>,
    pub caches: BotCaches,
    pub rates: RateClient,
    pub crypto_pay: CryptoPayClient,
    pub restricted_words: Arc<HashSet<String>>,
}

impl AppContext {
    /// Borrow the pieces the menu renderer needs
    pub fn menu(&self) -> MenuContext<'_> {
        MenuContext {
            pool: &self.pool,
            rates: &self.rates,
            localization: &self.localization,
        }
    }
}

/// Send rendered menu content as a fresh message
pub async fn send_content(bot: &Bot, chat_id: ChatId, content: &MenuContent) -> Result<()> {
    match &content.photo {
        Some(file_id) => {
            bot.send_photo(chat_id, InputFile::file_id(FileId(file_id.clone())))
                .caption(content.caption.clone())
                .parse_mode(ParseMode::Html)
                .reply_markup(content.keyboard.clone())
                .await?;
        }
        None => {
            bot.send_message(chat_id, content.caption.clone())
                .parse_mode(ParseMode::Html)
                .reply_markup(content.keyboard.clone())
                .await?;
        }
    }
    Ok(())
}

/// Whether the user is a member of the required channel
pub async fn is_subscribed(bot: &Bot, ctx: &AppContext, telegram_id: i64) -> bool {
    match bot
        .get_chat_member(ChatId(ctx.config.channel_id), UserId(telegram_id as u64))
        .await
    {
        Ok(member) => member.is_present(),
        Err(_) => false,
    }
}

/// Turn the paid-for cart into a completed order and confirm to the user.
///
/// Shared by the crypto invoice poller and the Stars payment finalizer.
#[allow(clippy::too_many_arguments)]
pub async fn complete_order(
    bot: &Bot,
    ctx: &AppContext,
    telegram_id: i64,
    chat_id: ChatId,
    name: &str,
    phone: &str,
    address: &str,
    amount_usd: f64,
    method: &str,
    language: &str,
) -> Result<()> {
    let cart_lines = db::get_user_cart(&ctx.pool, telegram_id).await?;
    let order = db::create_order_with_items(
        &ctx.pool,
        telegram_id,
        name,
        phone,
        address,
        "completed",
        &cart_lines,
    )
    .await?;
    db::clear_cart(&ctx.pool, telegram_id).await?;

    let (amount, currency) = convert_currency(&ctx.rates, amount_usd, language).await?;
    let success_message = t_args_lang(
        &ctx.localization,
        "payment-successful",
        &[
            ("order_id", ui_builder::short_order_id(&order.id)),
            ("order_status", order.status.clone()),
            ("amount", format_price(amount, currency)),
            ("method", method.to_string()),
            ("name", name.to_string()),
            ("phone", phone.to_string()),
            ("address", address.to_string()),
        ],
        Some(language),
    );

    bot.send_message(chat_id, success_message)
        .parse_mode(ParseMode::Html)
        .reply_markup(ui_builder::main_menu_keyboard(
            &ctx.localization,
            Some(language),
        ))
        .await?;

    info!(order_id = %order.id, telegram_id = %telegram_id, method = %method, "Order paid and completed");
    Ok(())
}

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;
