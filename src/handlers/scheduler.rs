use chrono::{DateTime, Timelike, Utc};
use std::time::Duration;
use thiserror::Error;
use tokio::time;

use crate::bot_state::BotState;
use crate::handlers::utils::format_daily_forecast;
use crate::messenger::TextMode;
use crate::models::Subscription;
use crate::weather::{self, WeatherError};

pub const WEATHER_TIMEOUT: Duration = Duration::from_secs(15);
pub const SEND_TIMEOUT: Duration = Duration::from_secs(15);

const FALLBACK_NOTICE: &str =
    "Не вдалося отримати ваш прогноз погоди. Можливо, ви відкликали дозвіл на геолокацію?";

#[derive(Debug, Error)]
enum DeliveryError {
    #[error(transparent)]
    Weather(#[from] WeatherError),
    #[error("send failed: {0}")]
    Message(anyhow::Error),
    #[error("send timed out after {0:?}")]
    SendTimeout(Duration),
}

/// Итог одного тика планировщика.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub due: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Ключ минуты "HH:MM" в UTC.
pub fn time_key(now: DateTime<Utc>) -> String {
    now.format("%H:%M").to_string()
}

/// Сколько ждать до начала следующей минуты.
pub fn until_next_minute(now: DateTime<Utc>) -> Duration {
    let into_minute = u64::from(now.second()) * 1000 + u64::from(now.timestamp_subsec_millis());
    Duration::from_millis(60_000 - into_minute.min(59_999))
}

/// Одна минута обрабатывается не больше одного раза.
pub fn should_run(last_key: Option<&str>, now_key: &str) -> bool {
    last_key != Some(now_key)
}

/// Фоновая задача: раз в минуту рассылает прогнозы.
pub async fn delivery_task(state: BotState) {
    log::info!("⏰ Delivery scheduler started. Will check every minute.");
    let mut last_key: Option<String> = None;

    loop {
        time::sleep(until_next_minute(Utc::now())).await;

        let now_key = time_key(Utc::now());
        if !should_run(last_key.as_deref(), &now_key) {
            continue;
        }

        let report = run_tick(&state, &now_key).await;
        if report.due > 0 {
            log::info!(
                "Tick {} UTC done: {} delivered, {} failed",
                now_key,
                report.delivered,
                report.failed
            );
        }
        last_key = Some(now_key);
    }
}

/// Один тик: все активные подписки на `now_key`, по очереди.
pub async fn run_tick(state: &BotState, now_key: &str) -> TickReport {
    let mut report = TickReport::default();
    log::info!("Cron tick: {} UTC. Checking...", now_key);

    let subscriptions = match state.store.find_due(now_key).await {
        Ok(subscriptions) => subscriptions,
        Err(e) => {
            log::error!("Scheduler: database query failed for {}: {}", now_key, e);
            return report;
        }
    };

    if subscriptions.is_empty() {
        return report;
    }

    report.due = subscriptions.len();
    log::info!("Found {} subscriptions. Sending...", report.due);

    for subscription in &subscriptions {
        match deliver(state, subscription).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                report.failed += 1;
                log::error!(
                    "Failed to send scheduled weather to user {}: {}",
                    subscription.chat_id,
                    e
                );
                if let Err(e) = send_bounded(state, subscription, FALLBACK_NOTICE, TextMode::Plain).await {
                    log::warn!(
                        "Fallback notice to user {} was not delivered: {}",
                        subscription.chat_id,
                        e
                    );
                }
            }
        }
    }

    report
}

async fn deliver(state: &BotState, subscription: &Subscription) -> Result<(), DeliveryError> {
    let weather =
        weather::fetch_bounded(state.weather.as_ref(), subscription.location, WEATHER_TIMEOUT).await?;
    let message = format_daily_forecast(&weather);
    send_bounded(state, subscription, &message, TextMode::Markdown).await
}

async fn send_bounded(
    state: &BotState,
    subscription: &Subscription,
    text: &str,
    mode: TextMode,
) -> Result<(), DeliveryError> {
    time::timeout(SEND_TIMEOUT, state.messenger.send(subscription.chat_id, text, mode))
        .await
        .map_err(|_| DeliveryError::SendTimeout(SEND_TIMEOUT))?
        .map_err(DeliveryError::Message)
}
