use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use teloxide::types::ChatId;
use tokio::sync::RwLock;

use crate::database::SubscriptionStore;
use crate::messenger::{Messenger, TextMode};
use crate::models::ConversationState;
use crate::weather::WeatherProvider;

type ConversationCache = Arc<RwLock<HashMap<ChatId, (ConversationState, SystemTime)>>>;

/// Незавершенные диалоги подписки по пользователям.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get(&self, chat_id: ChatId) -> Option<ConversationState>;
    async fn set(&self, chat_id: ChatId, state: ConversationState);
    async fn remove(&self, chat_id: ChatId) -> Option<ConversationState>;
    /// Удаляет просроченные записи, возвращает количество оставшихся.
    async fn cleanup(&self) -> usize;
}

/// Диалоги в памяти процесса. Запись старше `ttl` считается отсутствующей.
#[derive(Clone)]
pub struct MemoryConversations {
    cache: ConversationCache,
    ttl: Duration,
}

impl MemoryConversations {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    fn is_fresh(&self, timestamp: &SystemTime) -> bool {
        timestamp.elapsed().unwrap_or_default() < self.ttl
    }
}

#[async_trait]
impl ConversationStore for MemoryConversations {
    async fn get(&self, chat_id: ChatId) -> Option<ConversationState> {
        let cache = self.cache.read().await;
        match cache.get(&chat_id) {
            Some((state, timestamp)) if self.is_fresh(timestamp) => Some(state.clone()),
            _ => None,
        }
    }

    async fn set(&self, chat_id: ChatId, state: ConversationState) {
        let mut cache = self.cache.write().await;
        cache.insert(chat_id, (state, SystemTime::now()));
    }

    async fn remove(&self, chat_id: ChatId) -> Option<ConversationState> {
        let mut cache = self.cache.write().await;
        cache.remove(&chat_id).map(|(state, _)| state)
    }

    async fn cleanup(&self) -> usize {
        let mut cache = self.cache.write().await;
        let previous_count = cache.len();

        cache.retain(|_, (_, timestamp)| self.is_fresh(timestamp));

        let current_count = cache.len();
        log::debug!("🧹 Conversations cleaned: {} -> {} entries", previous_count, current_count);
        current_count
    }
}

#[derive(Clone)]
pub struct BotState {
    pub store: Arc<dyn SubscriptionStore>,
    pub weather: Arc<dyn WeatherProvider>,
    pub messenger: Arc<dyn Messenger>,
    pub conversations: Arc<dyn ConversationStore>,
}

impl BotState {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        weather: Arc<dyn WeatherProvider>,
        messenger: Arc<dyn Messenger>,
        conversations: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            store,
            weather,
            messenger,
            conversations,
        }
    }

    pub async fn reply(&self, chat_id: ChatId, text: &str) -> anyhow::Result<()> {
        self.messenger.send(chat_id, text, TextMode::Plain).await
    }

    pub async fn reply_markdown(&self, chat_id: ChatId, text: &str) -> anyhow::Result<()> {
        self.messenger.send(chat_id, text, TextMode::Markdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;

    #[tokio::test]
    async fn stores_and_removes_conversation_per_user() {
        let conversations = MemoryConversations::new(Duration::from_secs(60));
        let awaiting_time = ConversationState::AwaitingTime {
            location: Location::new(50.45, 30.52),
        };

        conversations.set(ChatId(1), ConversationState::AwaitingLocation).await;
        conversations.set(ChatId(2), awaiting_time.clone()).await;

        assert_eq!(conversations.get(ChatId(1)).await, Some(ConversationState::AwaitingLocation));
        assert_eq!(conversations.get(ChatId(2)).await, Some(awaiting_time.clone()));
        assert_eq!(conversations.get(ChatId(3)).await, None);

        assert_eq!(conversations.remove(ChatId(2)).await, Some(awaiting_time));
        assert_eq!(conversations.get(ChatId(2)).await, None);
        assert_eq!(conversations.get(ChatId(1)).await, Some(ConversationState::AwaitingLocation));
    }

    #[tokio::test]
    async fn expired_conversation_is_treated_as_absent_and_swept() {
        let conversations = MemoryConversations::new(Duration::ZERO);
        conversations.set(ChatId(7), ConversationState::AwaitingLocation).await;

        assert_eq!(conversations.get(ChatId(7)).await, None);
        assert_eq!(conversations.cleanup().await, 0);
        assert_eq!(conversations.remove(ChatId(7)).await, None);
    }

    #[tokio::test]
    async fn cleanup_keeps_fresh_conversations() {
        let conversations = MemoryConversations::new(Duration::from_secs(600));
        conversations.set(ChatId(7), ConversationState::AwaitingLocation).await;

        assert_eq!(conversations.cleanup().await, 1);
        assert_eq!(conversations.get(ChatId(7)).await, Some(ConversationState::AwaitingLocation));
    }
}
