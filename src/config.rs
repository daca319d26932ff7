use std::env;
use std::fmt;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::weather::DEFAULT_WEATHER_URL;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_WEATHER_LANG: &str = "ua";
const DEFAULT_CONVERSATION_TTL_SECS: u64 = 1800;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Настройки процесса из переменных окружения.
#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub weather_api_key: Option<String>,
    pub database_url: String,
    pub port: u16,
    /// Если задан, бот получает обновления через webhook, иначе long polling
    pub webhook_url: Option<Url>,
    pub weather_url: String,
    pub weather_lang: String,
    pub conversation_ttl: Duration,
}

// Секреты в логи не попадают
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("weather_api_key", &self.weather_api_key.as_ref().map(|_| "<redacted>"))
            .field("database_url", &"<redacted>")
            .field("port", &self.port)
            .field("webhook_url", &self.webhook_url)
            .field("weather_url", &self.weather_url)
            .field("weather_lang", &self.weather_lang)
            .field("conversation_ttl", &self.conversation_ttl)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Пустое значение считаем отсутствующим
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bot_token = get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        let database_url = get("DB_CONNECTION_STRING")
            .or_else(|| get("DATABASE_URL"))
            .ok_or(ConfigError::Missing("DB_CONNECTION_STRING"))?;

        let port = match get("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => DEFAULT_PORT,
        };

        let webhook_url = match get("WEBHOOK_URL") {
            Some(value) => Some(
                Url::parse(value.trim())
                    .map_err(|_| ConfigError::Invalid { name: "WEBHOOK_URL", value })?,
            ),
            None => None,
        };

        // Нулевой TTL сразу "теряет" любой начатый диалог
        let conversation_ttl = match get("CONVERSATION_TTL_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::Invalid { name: "CONVERSATION_TTL_SECS", value }),
            },
            None => Duration::from_secs(DEFAULT_CONVERSATION_TTL_SECS),
        };

        Ok(Config {
            bot_token,
            weather_api_key: get("OPENWEATHER_API_KEY"),
            database_url,
            port,
            webhook_url,
            weather_url: get("OPENWEATHER_URL").unwrap_or_else(|| DEFAULT_WEATHER_URL.to_string()),
            weather_lang: get("WEATHER_LANG").unwrap_or_else(|| DEFAULT_WEATHER_LANG.to_string()),
            conversation_ttl,
        })
    }
}
