pub mod config;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use thiserror::Error;

use crate::models::Location;
use crate::weather::config::CurrentWeather;

pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

const RETRIES: u32 = 1;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("OPENWEATHER_API_KEY is not set")]
    MissingApiKey,
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest_middleware::Error),
    #[error("weather client error: {0}")]
    Client(#[from] reqwest::Error),
    #[error("weather provider returned {0}")]
    Status(StatusCode),
    #[error("malformed weather response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("weather response has no conditions")]
    NoConditions,
    #[error("weather response has no location name")]
    NoLocationName,
    #[error("weather request timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, location: Location) -> Result<CurrentWeather, WeatherError>;
}

/// Запрос погоды с ограничением по времени поверх таймаута самого клиента.
pub async fn fetch_bounded(
    provider: &dyn WeatherProvider,
    location: Location,
    limit: Duration,
) -> Result<CurrentWeather, WeatherError> {
    tokio::time::timeout(limit, provider.current(location))
        .await
        .map_err(|_| WeatherError::Timeout(limit))?
}

pub struct OpenWeatherClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: Option<String>,
    lang: String,
}

impl OpenWeatherClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        lang: impl Into<String>,
    ) -> Result<Self, WeatherError> {
        let retry_policy = ExponentialBackoff::builder()
            .build_with_max_retries(RETRIES);

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            lang: lang.into(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, location: Location) -> Result<CurrentWeather, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;
        let start_time = Instant::now();

        let params = [
            ("lat", location.latitude.to_string()),
            ("lon", location.longitude.to_string()),
            ("appid", api_key.to_string()),
            ("units", "metric".to_string()),
            ("lang", self.lang.clone()),
        ];

        let response = self
            .client
            .get(&self.base_url)
            .header("Accept", "application/json")
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status));
        }

        let text = response.text().await?;
        let weather = serde_json::from_str::<CurrentWeather>(&text)?;
        if weather.description().is_none() {
            return Err(WeatherError::NoConditions);
        }
        if weather.name.trim().is_empty() {
            return Err(WeatherError::NoLocationName);
        }

        log::debug!(
            "🌦️ Weather for ({}, {}) fetched in {:?}",
            location.latitude,
            location.longitude,
            start_time.elapsed()
        );

        Ok(weather)
    }
}
