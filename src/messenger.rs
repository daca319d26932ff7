use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    Plain,
    /// MarkdownV2, динамические значения экранируются через `escape_markdown_v2`
    Markdown,
}

/// Исходящие сообщения пользователю.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, chat_id: ChatId, text: &str, mode: TextMode) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, chat_id: ChatId, text: &str, mode: TextMode) -> anyhow::Result<()> {
        let request = self.bot.send_message(chat_id, text);
        let request = match mode {
            TextMode::Plain => request,
            TextMode::Markdown => request.parse_mode(ParseMode::MarkdownV2),
        };
        request.await?;
        Ok(())
    }
}
