use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use teloxide::types::ChatId;
use thiserror::Error;

use crate::models::{Subscription, SubscriptionRow};

const SUBSCRIPTION_COLUMNS: &str =
    "chat_id, username, latitude, longitude, notification_time, is_active";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Хранилище подписок. Одна подписка на chat_id.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Активные подписки с указанным временем уведомления.
    async fn find_due(&self, notification_time: &str) -> Result<Vec<Subscription>, StoreError>;

    async fn find_active(&self, chat_id: ChatId) -> Result<Vec<Subscription>, StoreError>;

    async fn find_one(&self, chat_id: ChatId) -> Result<Option<Subscription>, StoreError>;

    /// Создает подписку или целиком перезаписывает существующую.
    async fn upsert(&self, subscription: &Subscription) -> Result<Subscription, StoreError>;

    /// Удаляет подписку и возвращает ее, если она была.
    async fn delete_one(&self, chat_id: ChatId) -> Result<Option<Subscription>, StoreError>;
}

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscriptions (
                chat_id BIGINT PRIMARY KEY,
                username TEXT,
                latitude DOUBLE PRECISION NOT NULL,
                longitude DOUBLE PRECISION NOT NULL,
                notification_time TEXT NOT NULL CHECK (notification_time ~ '^[0-9]{2}:[0-9]{2}$'),
                is_active BOOLEAN NOT NULL DEFAULT true,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Выборка планировщика каждую минуту
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_subscriptions_due ON subscriptions (notification_time, is_active)"
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for Database {
    async fn find_due(&self, notification_time: &str) -> Result<Vec<Subscription>, StoreError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE notification_time = $1 AND is_active = true",
            SUBSCRIPTION_COLUMNS
        );
        let rows = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(notification_time)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    async fn find_active(&self, chat_id: ChatId) -> Result<Vec<Subscription>, StoreError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE chat_id = $1 AND is_active = true",
            SUBSCRIPTION_COLUMNS
        );
        let rows = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(chat_id.0)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    async fn find_one(&self, chat_id: ChatId) -> Result<Option<Subscription>, StoreError> {
        let sql = format!("SELECT {} FROM subscriptions WHERE chat_id = $1", SUBSCRIPTION_COLUMNS);
        let row = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(chat_id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Subscription::from))
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<Subscription, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO subscriptions
            (chat_id, username, latitude, longitude, notification_time, is_active, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (chat_id)
            DO UPDATE SET
                username = EXCLUDED.username,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                notification_time = EXCLUDED.notification_time,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(subscription.chat_id.0)
            .bind(&subscription.username)
            .bind(subscription.location.latitude)
            .bind(subscription.location.longitude)
            .bind(&subscription.notification_time)
            .bind(subscription.is_active)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn delete_one(&self, chat_id: ChatId) -> Result<Option<Subscription>, StoreError> {
        let sql = format!(
            "DELETE FROM subscriptions WHERE chat_id = $1 RETURNING {}",
            SUBSCRIPTION_COLUMNS
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(chat_id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Subscription::from))
    }
}
