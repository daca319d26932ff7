use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::FromRow;
use teloxide::types::ChatId;

/// Две цифры, двоеточие, две цифры. Диапазон часов и минут не проверяется.
static NOTIFICATION_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{2}:[0-9]{2}$").expect("notification time pattern is valid")
});

pub fn is_valid_notification_time(text: &str) -> bool {
    NOTIFICATION_TIME.is_match(text)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Подписка пользователя, одна на чат.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub chat_id: ChatId,
    pub username: Option<String>,
    pub location: Location,
    /// "HH:MM" в UTC, сравнивается с текущей минутой как строка
    pub notification_time: String,
    pub is_active: bool,
}

impl Subscription {
    pub fn new(
        chat_id: ChatId,
        username: Option<String>,
        location: Location,
        notification_time: impl Into<String>,
    ) -> Self {
        Self {
            chat_id,
            username,
            location,
            notification_time: notification_time.into(),
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub chat_id: i64,
    pub username: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub notification_time: String,
    pub is_active: bool,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            chat_id: ChatId(row.chat_id),
            username: row.username,
            location: Location::new(row.latitude, row.longitude),
            notification_time: row.notification_time,
            is_active: row.is_active,
        }
    }
}
