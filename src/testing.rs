//! In-process fakes for the store, weather provider and messenger.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use teloxide::types::ChatId;

use crate::bot_state::{BotState, MemoryConversations};
use crate::database::{StoreError, SubscriptionStore};
use crate::messenger::{Messenger, TextMode};
use crate::models::{Location, Subscription};
use crate::weather::config::{CurrentWeather, MainReadings, WeatherCondition, Wind};
use crate::weather::{WeatherError, WeatherProvider};

pub fn reading(name: &str, temp: f64, feels_like: f64, wind: f64, description: &str) -> CurrentWeather {
    CurrentWeather {
        name: name.to_string(),
        weather: vec![WeatherCondition {
            description: description.to_string(),
        }],
        main: MainReadings { temp, feels_like },
        wind: Wind { speed: wind },
    }
}

#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<ChatId, Subscription>>,
    failing: AtomicBool,
    deleted: AtomicUsize,
    upserts: AtomicUsize,
}

impl MemoryStore {
    pub fn with(subscriptions: Vec<Subscription>) -> Self {
        let store = Self::default();
        {
            let mut docs = store.docs.lock().unwrap();
            for subscription in subscriptions {
                docs.insert(subscription.chat_id, subscription);
            }
        }
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get(&self, chat_id: ChatId) -> Option<Subscription> {
        self.docs.lock().unwrap().get(&chat_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    /// Сколько документов реально удалено
    pub fn deleted(&self) -> usize {
        self.deleted.load(Ordering::SeqCst)
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn find_due(&self, notification_time: &str) -> Result<Vec<Subscription>, StoreError> {
        self.check()?;
        let docs = self.docs.lock().unwrap();
        let mut due: Vec<Subscription> = docs
            .values()
            .filter(|s| s.notification_time == notification_time && s.is_active)
            .cloned()
            .collect();
        due.sort_by_key(|s| s.chat_id.0);
        Ok(due)
    }

    async fn find_active(&self, chat_id: ChatId) -> Result<Vec<Subscription>, StoreError> {
        self.check()?;
        let docs = self.docs.lock().unwrap();
        Ok(docs.get(&chat_id).filter(|s| s.is_active).cloned().into_iter().collect())
    }

    async fn find_one(&self, chat_id: ChatId) -> Result<Option<Subscription>, StoreError> {
        self.check()?;
        Ok(self.docs.lock().unwrap().get(&chat_id).cloned())
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<Subscription, StoreError> {
        self.check()?;
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.docs
            .lock()
            .unwrap()
            .insert(subscription.chat_id, subscription.clone());
        Ok(subscription.clone())
    }

    async fn delete_one(&self, chat_id: ChatId) -> Result<Option<Subscription>, StoreError> {
        self.check()?;
        let removed = self.docs.lock().unwrap().remove(&chat_id);
        if removed.is_some() {
            self.deleted.fetch_add(1, Ordering::SeqCst);
        }
        Ok(removed)
    }
}

pub struct StubWeather {
    reading: CurrentWeather,
    failing: Mutex<Vec<Location>>,
    hanging: Mutex<Vec<Location>>,
    calls: AtomicUsize,
}

impl StubWeather {
    pub fn new(reading: CurrentWeather) -> Self {
        Self {
            reading,
            failing: Mutex::new(Vec::new()),
            hanging: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_at(&self, location: Location) {
        self.failing.lock().unwrap().push(location);
    }

    /// Запрос для этой точки никогда не завершается
    pub fn hang_at(&self, location: Location) {
        self.hanging.lock().unwrap().push(location);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for StubWeather {
    async fn current(&self, location: Location) -> Result<CurrentWeather, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let hangs = self.hanging.lock().unwrap().contains(&location);
        if hangs {
            std::future::pending::<()>().await;
        }
        if self.failing.lock().unwrap().contains(&location) {
            return Err(WeatherError::Status(StatusCode::BAD_GATEWAY));
        }
        Ok(self.reading.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub chat_id: ChatId,
    pub text: String,
    pub mode: TextMode,
}

#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    failing: Mutex<Vec<ChatId>>,
    hanging: Mutex<Vec<ChatId>>,
    attempts: AtomicUsize,
}

impl RecordingMessenger {
    pub fn fail_for(&self, chat_id: ChatId) {
        self.failing.lock().unwrap().push(chat_id);
    }

    /// Отправка в этот чат никогда не завершается
    pub fn hang_for(&self, chat_id: ChatId) {
        self.hanging.lock().unwrap().push(chat_id);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: ChatId) -> Vec<Sent> {
        self.sent().into_iter().filter(|s| s.chat_id == chat_id).collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, chat_id: ChatId, text: &str, mode: TextMode) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let hangs = self.hanging.lock().unwrap().contains(&chat_id);
        if hangs {
            std::future::pending::<()>().await;
        }
        if self.failing.lock().unwrap().contains(&chat_id) {
            anyhow::bail!("chat {} is unreachable", chat_id);
        }
        self.sent.lock().unwrap().push(Sent {
            chat_id,
            text: text.to_string(),
            mode,
        });
        Ok(())
    }
}

pub struct Harness {
    pub state: BotState,
    pub store: Arc<MemoryStore>,
    pub weather: Arc<StubWeather>,
    pub messenger: Arc<RecordingMessenger>,
}

impl Harness {
    pub fn new(subscriptions: Vec<Subscription>) -> Self {
        Self::with_weather(subscriptions, reading("Kyiv", 20.6, 18.6, 3.2, "clear sky"))
    }

    pub fn with_weather(subscriptions: Vec<Subscription>, weather: CurrentWeather) -> Self {
        let store = Arc::new(MemoryStore::with(subscriptions));
        let weather = Arc::new(StubWeather::new(weather));
        let messenger = Arc::new(RecordingMessenger::default());
        let conversations = Arc::new(MemoryConversations::new(Duration::from_secs(1800)));
        let state = BotState::new(
            store.clone(),
            weather.clone(),
            messenger.clone(),
            conversations,
        );

        Self {
            state,
            store,
            weather,
            messenger,
        }
    }
}
