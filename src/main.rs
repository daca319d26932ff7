use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use teloxide::update_listeners::webhooks;
use teloxide::{prelude::*, utils::command::BotCommands};
use tokio::time;

mod bot_state;
mod config;
mod database;
mod handlers;
mod messenger;
mod models;
mod weather;

#[cfg(test)]
mod testing;

use crate::bot_state::{BotState, ConversationStore, MemoryConversations};
use crate::config::Config;
use crate::database::Database;
use crate::handlers::{command_handler, location_handler, text_handler};
use crate::messenger::TelegramMessenger;
use crate::weather::OpenWeatherClient;

const CONVERSATION_CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Доступні команди:")]
pub enum Command {
    #[command(description = "почати роботу з ботом")]
    Start,
    #[command(description = "показати допомогу")]
    Help,
    #[command(description = "підписатися на щоденний прогноз")]
    Subscribe,
    #[command(description = "мої підписки")]
    List,
    #[command(description = "скасувати підписку")]
    Unsubscribe,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Загружаем .env и инициализируем логирование
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting weather subscription bot...");

    let config = Config::from_env().map_err(|e| {
        log::error!("❌ Invalid configuration: {}", e);
        e
    })?;

    if config.weather_api_key.is_none() {
        log::warn!("OPENWEATHER_API_KEY is not set, every weather request will fail");
    }

    // Без базы работать нельзя: ошибка подключения завершает процесс
    let db = Database::new(&config.database_url).await.map_err(|e| {
        log::error!("❌ Database connection failed: {}", e);
        e
    })?;
    db.init().await?;
    log::info!("✅ Database initialized");

    let bot = Bot::new(config.bot_token.clone());
    let weather = OpenWeatherClient::new(
        config.weather_url.clone(),
        config.weather_api_key.clone(),
        config.weather_lang.clone(),
    )?;
    let conversations = Arc::new(MemoryConversations::new(config.conversation_ttl));

    let state = BotState::new(
        Arc::new(db),
        Arc::new(weather),
        Arc::new(TelegramMessenger::new(bot.clone())),
        conversations.clone(),
    );

    // Фоновая рассылка прогнозов
    let state_clone = state.clone();
    tokio::spawn(async move {
        handlers::delivery_task(state_clone).await;
    });

    // Фоновая очистка брошенных диалогов
    tokio::spawn(async move {
        let mut interval = time::interval(CONVERSATION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            conversations.cleanup().await;
        }
    });

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler)
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.location().is_some())
                .endpoint(location_handler)
        )
        .branch(Update::filter_message().endpoint(text_handler));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build();

    match config.webhook_url.clone() {
        Some(url) => {
            let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
            log::info!("🚀 Starting dispatcher with webhook on port {}", config.port);
            let listener = webhooks::axum(bot, webhooks::Options::new(addr, url)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => {
            log::info!("🚀 Starting dispatcher with long polling");
            dispatcher.dispatch().await;
        }
    }

    Ok(())
}
