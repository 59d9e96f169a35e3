//! Group moderation: delete messages containing restricted words

use anyhow::Result;
use teloxide::prelude::*;
use tracing::info;

use super::AppContext;
use crate::text_processing::contains_restricted_word;

/// Drop group messages that match the restricted-word list and warn the
/// author. Admins are exempt.
pub async fn moderate_group_message(bot: &Bot, msg: &Message, ctx: &AppContext) -> Result<()> {
    let text = match msg.text().or_else(|| msg.caption()) {
        Some(text) => text,
        None => return Ok(()),
    };

    let user = match msg.from.as_ref() {
        Some(user) => user,
        None => return Ok(()),
    };

    if ctx.config.is_admin(user.id.0 as i64) {
        return Ok(());
    }

    if contains_restricted_word(text, &ctx.restricted_words) {
        info!(user_id = %user.id, chat_id = %msg.chat.id, "Removing message with restricted words");
        bot.delete_message(msg.chat.id, msg.id).await?;
        bot.send_message(
            msg.chat.id,
            format!(
                "{}, {}",
                user.first_name,
                crate::localization::t_lang(&ctx.localization, "group-warning", None)
            ),
        )
        .await?;
    }

    Ok(())
}
