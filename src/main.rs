use anyhow::Result;
use chilli_pizza_bot::bot::{self, AppContext};
use chilli_pizza_bot::cache::BotCaches;
use chilli_pizza_bot::config::BotConfig;
use chilli_pizza_bot::db;
use chilli_pizza_bot::dialogue::{StoreDialogue, StoreDialogueState};
use chilli_pizza_bot::localization;
use chilli_pizza_bot::payment::{CryptoPayClient, RateClient};
use chilli_pizza_bot::text_processing::load_restricted_words;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Categories seeded on an empty database
const DEFAULT_CATEGORIES: [&str; 2] = ["Food", "Beverages"];

/// Info pages seeded on an empty database, with their default descriptions
const DEFAULT_BANNERS: [(&str, &str); 8] = [
    ("main", "Welcome to ChilliPizza! 🍕"),
    ("about", "We are a small pizzeria with a big selection of products."),
    (
        "payment",
        "<b>Payment options:</b>\n✅ Card in bot\n✅ Cash on delivery\n✅ Cryptocurrency\n✅ Telegram Stars",
    ),
    (
        "shipping",
        "<b>Delivery options:</b>\n✅ Pickup\n✅ Courier\n✅ Post\n----------------\n<b>Not available:</b>\n❌ Pigeons\n❌ Teleport",
    ),
    ("catalog", "Categories:"),
    ("cart", "Cart is empty!"),
    ("orders", "Your orders"),
    ("profile", "Your profile"),
];

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Validate configuration early, before anything connects
    let config = Arc::new(BotConfig::from_env()?);

    info!("Initializing database connection");
    let pool = PgPool::connect(&config.database_url).await?;
    db::init_database_schema(&pool).await?;
    db::seed_categories(&pool, &DEFAULT_CATEGORIES).await?;
    db::seed_banners(&pool, &DEFAULT_BANNERS).await?;
    let shared_pool = Arc::new(pool);

    // Initialize localization manager
    let localization_manager = localization::create_localization_manager()?;

    // One HTTP client with an explicit timeout for the bot and provider calls
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

    let caches = BotCaches::new();
    let rates = RateClient::new(client.clone(), config.rate_api.clone(), caches.clone());
    let crypto_pay = CryptoPayClient::new(
        client.clone(),
        config.crypto_pay_api.clone(),
        config.crypto_pay_token.clone(),
    );
    let restricted_words = Arc::new(load_restricted_words(&config.restricted_words_path));
    if restricted_words.is_empty() {
        info!("No restricted-words file found, group moderation is inactive");
    }

    let ctx = AppContext {
        pool: shared_pool,
        config: config.clone(),
        localization: localization_manager,
        caches,
        rates,
        crypto_pay,
        restricted_words,
    };

    let bot = Bot::with_client(config.bot_token.clone(), client);

    let commands = vec![
        BotCommand::new("start", "Launch the bot 🤖"),
        BotCommand::new("menu", "Show menu 📋"),
        BotCommand::new("about", "About us ℹ️"),
        BotCommand::new("payment", "Payment options 💰"),
        BotCommand::new("shipping", "Delivery options 🚚"),
        BotCommand::new("orders", "Your orders 📦"),
        BotCommand::new("profile", "Your profile 👤"),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        tracing::warn!(error = %e, "Failed to register bot commands");
    }

    info!("Bot initialized, starting dispatcher");

    // Create shared dialogue storage
    let dialogue_storage = InMemStorage::<StoreDialogueState>::new();

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let ctx = ctx.clone();
            let storage = dialogue_storage.clone();
            move |bot: Bot, msg: Message| {
                let ctx = ctx.clone();
                let dialogue = StoreDialogue::new(storage.clone(), msg.chat.id);
                async move { bot::message_handler(bot, msg, ctx, dialogue).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let ctx = ctx.clone();
            let storage = dialogue_storage.clone();
            move |bot: Bot, q: CallbackQuery| {
                let ctx = ctx.clone();
                // The dialogue lives in the chat that hosts the keyboard
                let chat_id = q
                    .message
                    .as_ref()
                    .map(|message| message.chat().id)
                    .unwrap_or_else(|| ChatId::from(q.from.id));
                let dialogue = StoreDialogue::new(storage.clone(), chat_id);
                async move { bot::callback_handler(bot, q, ctx, dialogue).await }
            }
        }))
        .branch(
            Update::filter_pre_checkout_query()
                .endpoint(bot::callback_handler::pre_checkout_handler),
        );

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
