use teloxide::prelude::*;

use crate::bot_state::BotState;
use crate::handlers::scheduler::WEATHER_TIMEOUT;
use crate::handlers::utils::escape_markdown_v2;
use crate::handlers::HandlerResult;
use crate::models::ConversationState;
use crate::weather;

use crate::Command;

pub async fn command_handler(
    msg: Message,
    cmd: Command,
    state: BotState,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    match cmd {
        Command::Start | Command::Help => handle_start(&state, chat_id).await?,
        Command::Subscribe => handle_subscribe(&state, chat_id).await?,
        Command::List => handle_list(&state, chat_id).await?,
        Command::Unsubscribe => handle_unsubscribe(&state, chat_id).await?,
    }
    Ok(())
}

pub async fn handle_start(state: &BotState, chat_id: ChatId) -> HandlerResult {
    state
        .reply_markdown(
            chat_id,
            "👋 Вітаю\\! Я бот для підписки на погоду\\.\n\n\
            *Команди:*\n\
            /subscribe \\- Почати процес підписки\n\
            /list \\- Показати мої підписки\n\
            /unsubscribe \\- Скасувати підписку",
        )
        .await?;

    Ok(())
}

/// Начало диалога подписки. Повторный /subscribe во время диалога начинает его заново.
pub async fn handle_subscribe(state: &BotState, chat_id: ChatId) -> HandlerResult {
    match state.store.find_one(chat_id).await {
        Ok(Some(existing)) if existing.is_active => {
            state
                .reply(
                    chat_id,
                    &format!(
                        "Ви вже підписані на час {} UTC.\n\
                        Якщо хочете змінити, спочатку виконайте /unsubscribe.",
                        existing.notification_time
                    ),
                )
                .await?;
            return Ok(());
        }
        Ok(_) => {}
        Err(e) => {
            log::error!("Subscription lookup failed for user {}: {}", chat_id, e);
            state
                .reply(chat_id, "Ой, сталася помилка бази даних. Спробуйте /subscribe ще раз.")
                .await?;
            return Ok(());
        }
    }

    state
        .conversations
        .set(chat_id, ConversationState::AwaitingLocation)
        .await;
    log::info!("📍 User {} started subscription. Awaiting location...", chat_id);

    state
        .reply(chat_id, "Чудово! 📍 Будь ласка, надішліть свою геолокацію (через 📎).")
        .await?;

    Ok(())
}

pub async fn handle_unsubscribe(state: &BotState, chat_id: ChatId) -> HandlerResult {
    let outcome = state.store.delete_one(chat_id).await;
    state.conversations.remove(chat_id).await;

    match outcome {
        Ok(Some(_)) => {
            log::info!("👋 User {} unsubscribed", chat_id);
            state
                .reply(chat_id, "Ви успішно відписалися від сповіщень. 👋")
                .await?;
        }
        Ok(None) => {
            state.reply(chat_id, "Ви ще не були підписані.").await?;
        }
        Err(e) => {
            log::error!("Unsubscribe failed for user {}: {}", chat_id, e);
            state
                .reply(chat_id, "Не вдалося скасувати підписку. Спробуйте ще раз.")
                .await?;
        }
    }

    Ok(())
}

pub async fn handle_list(state: &BotState, chat_id: ChatId) -> HandlerResult {
    match build_subscription_list(state, chat_id).await {
        Ok(Some(text)) => {
            state.reply_markdown(chat_id, &text).await?;
        }
        Ok(None) => {
            state
                .reply(
                    chat_id,
                    "📭 У вас немає активних підписок.\nНатисніть /subscribe, щоб почати.",
                )
                .await?;
        }
        Err(e) => {
            log::error!("List failed for user {}: {}", chat_id, e);
            state
                .reply(chat_id, "Не вдалося отримати список підписок. Спробуйте ще раз.")
                .await?;
        }
    }

    Ok(())
}

async fn build_subscription_list(
    state: &BotState,
    chat_id: ChatId,
) -> anyhow::Result<Option<String>> {
    let subscriptions = state.store.find_active(chat_id).await?;
    if subscriptions.is_empty() {
        return Ok(None);
    }

    let mut text = String::from("📋 Ваші активні підписки:\n\n");
    for subscription in &subscriptions {
        let weather =
            weather::fetch_bounded(state.weather.as_ref(), subscription.location, WEATHER_TIMEOUT)
                .await?;
        text.push_str(&format!(
            "📍 *Місто:* {}\n⏰ *Час \\(UTC\\):* {}\n\n",
            escape_markdown_v2(&weather.name),
            escape_markdown_v2(&subscription.notification_time)
        ));
    }

    Ok(Some(text.trim_end().to_string()))
}
