use teloxide::prelude::*;

use crate::bot_state::BotState;
use crate::handlers::HandlerResult;
use crate::models::{is_valid_notification_time, ConversationState, Location, Subscription};

pub async fn location_handler(msg: Message, state: BotState) -> HandlerResult {
    if let Some(location) = msg.location() {
        let location = Location::new(location.latitude, location.longitude);
        handle_location(&state, msg.chat.id, location).await?;
    }
    Ok(())
}

pub async fn text_handler(msg: Message, state: BotState) -> HandlerResult {
    // Не текст (фото, стикеры и т.п.) игнорируем
    if let Some(text) = msg.text() {
        let username = msg.chat.username().map(str::to_string);
        handle_text(&state, msg.chat.id, username, text).await?;
    }
    Ok(())
}

/// Геолокация принимается только на шаге AwaitingLocation.
pub async fn handle_location(state: &BotState, chat_id: ChatId, location: Location) -> HandlerResult {
    if state.conversations.get(chat_id).await != Some(ConversationState::AwaitingLocation) {
        return Ok(());
    }

    state
        .conversations
        .set(chat_id, ConversationState::AwaitingTime { location })
        .await;
    log::info!("⏰ Got location from user {}. Awaiting time...", chat_id);

    state
        .reply_markdown(
            chat_id,
            "Дякую\\! ⏰ Тепер введіть час у UTC \\(формат: `HH:MM`, наприклад `08:30`\\)",
        )
        .await?;

    Ok(())
}

pub async fn handle_text(
    state: &BotState,
    chat_id: ChatId,
    username: Option<String>,
    text: &str,
) -> HandlerResult {
    // Команды обрабатывает command_handler
    if text.starts_with('/') {
        return Ok(());
    }

    let Some(ConversationState::AwaitingTime { location }) = state.conversations.get(chat_id).await
    else {
        return Ok(());
    };

    if !is_valid_notification_time(text) {
        state
            .reply_markdown(
                chat_id,
                "❌ Неправильний формат\\. Спробуйте ще раз \\(наприклад, `09:00`\\)\\.",
            )
            .await?;
        return Ok(());
    }

    let subscription = Subscription::new(chat_id, username, location, text);
    let outcome = state.store.upsert(&subscription).await;
    // Диалог завершен при любом исходе записи
    state.conversations.remove(chat_id).await;

    match outcome {
        Ok(saved) => {
            log::info!(
                "✅ Subscription saved for user {} at {} UTC",
                chat_id,
                saved.notification_time
            );
            state
                .reply(
                    chat_id,
                    &format!(
                        "✅ Готово! Ви підписані на щоденний прогноз погоди о {} UTC.",
                        saved.notification_time
                    ),
                )
                .await?;
        }
        Err(e) => {
            log::error!("Failed to save subscription for user {}: {}", chat_id, e);
            state
                .reply(chat_id, "Ой, сталася помилка бази даних. Спробуйте /subscribe ще раз.")
                .await?;
        }
    }

    Ok(())
}
