//! Telegram adapter (teloxide).
//!
//! This crate implements the `pmrelay-core` MessagingPort over the Telegram
//! Bot API, turns teloxide updates into core events, and runs the dispatcher.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode},
};

pub mod normalize;
pub mod router;

use pmrelay_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{InlineKeyboard, MediaKind, MediaRef},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    fn sent(chat_id: ChatId, msg: &Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }

    fn markup(keyboard: InlineKeyboard) -> InlineKeyboardMarkup {
        let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|b| InlineKeyboardButton::callback(b.label, b.callback_data))
                    .collect()
            })
            .collect();
        InlineKeyboardMarkup::new(rows)
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(Self::sent(chat_id, &msg))
    }

    async fn send_markdown(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageRef> {
        let mut req = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .parse_mode(ParseMode::MarkdownV2)
            .disable_web_page_preview(true);
        if let Some(keyboard) = keyboard {
            req = req.reply_markup(Self::markup(keyboard));
        }
        let msg = req.await.map_err(Self::map_err)?;
        Ok(Self::sent(chat_id, &msg))
    }

    async fn send_reference(&self, chat_id: ChatId, media: &MediaRef) -> Result<MessageRef> {
        let chat = Self::tg_chat(chat_id);
        let file = InputFile::file_id(media.file_id.clone());
        let caption = media.caption.clone();

        let msg = match media.kind {
            MediaKind::Photo => {
                let mut req = self.bot.send_photo(chat, file);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                req.await
            }
            MediaKind::Video => {
                let mut req = self.bot.send_video(chat, file);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                req.await
            }
            MediaKind::Document => {
                let mut req = self.bot.send_document(chat, file);
                if let Some(c) = caption.or_else(|| media.file_name.clone()) {
                    req = req.caption(c);
                }
                req.await
            }
        }
        .map_err(Self::map_err)?;

        Ok(Self::sent(chat_id, &msg))
    }

    async fn forward(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<MessageRef> {
        let msg = self
            .bot
            .forward_message(
                Self::tg_chat(to),
                Self::tg_chat(from),
                Self::tg_msg_id(message_id),
            )
            .await
            .map_err(Self::map_err)?;
        Ok(Self::sent(to, &msg))
    }

    async fn answer_callback_query(&self, callback_id: &str) -> Result<()> {
        self.bot
            .answer_callback_query(callback_id.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}
