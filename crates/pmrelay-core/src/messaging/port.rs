use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::{InlineKeyboard, MediaRef},
    Result,
};

/// Outbound side of the messaging platform.
///
/// Every call blocks the caller until the platform acknowledges it. There is no
/// retry and no queueing: a failed call surfaces as `Error::Transport`.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// MarkdownV2 message with link previews disabled, optionally with buttons.
    async fn send_markdown(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageRef>;

    /// Resend media the platform already stores, by its file reference.
    async fn send_reference(&self, chat_id: ChatId, media: &MediaRef) -> Result<MessageRef>;

    /// Copy `message_id` from `from` into `to`; the returned ref is scoped to `to`.
    async fn forward(&self, to: ChatId, from: ChatId, message_id: MessageId)
        -> Result<MessageRef>;

    /// Stop the client-side spinner on a pressed button.
    async fn answer_callback_query(&self, callback_id: &str) -> Result<()>;
}
