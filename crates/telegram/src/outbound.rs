//! The outbound `Transport` implementation over teloxide.
//!
//! Telegram's RetryAfter responses are honored a bounded number of times;
//! every other error surfaces to the caller, which treats delivery as
//! best-effort.

use std::time::Duration;

use {
    anyhow::Result,
    async_trait::async_trait,
    teloxide::{
        Bot, RequestError,
        payloads::{
            AnswerCallbackQuerySetters, EditMessageTextSetters, SendMessageSetters,
            SendPhotoSetters,
        },
        prelude::Requester,
        types::{
            ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton,
            KeyboardMarkup, MessageId, ReplyMarkup,
        },
    },
    tracing::warn,
};

use festa_common::{
    transport::{Button, Keyboard, KeyboardKind, Transport},
    types::MessageHandle,
};

const RETRY_AFTER_MAX_RETRIES: usize = 3;

pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut request: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;
        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(RequestError::RetryAfter(wait)) if retries < RETRY_AFTER_MAX_RETRIES => {
                    retries += 1;
                    warn!(
                        operation,
                        retries,
                        retry_after_secs = wait.duration().as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait.duration()).await;
                },
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Map the transport-neutral keyboard onto Telegram reply markup.
fn to_reply_markup(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard.kind {
        KeyboardKind::Inline => ReplyMarkup::InlineKeyboard(to_inline_markup(keyboard)),
        KeyboardKind::Reply => {
            let rows: Vec<Vec<KeyboardButton>> = keyboard
                .rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|button| {
                            let label = match button {
                                Button::Action { label, .. } | Button::Url { label, .. } => label,
                            };
                            KeyboardButton::new(label)
                        })
                        .collect()
                })
                .collect();
            let mut markup = KeyboardMarkup::new(rows);
            markup.resize_keyboard = true;
            ReplyMarkup::Keyboard(markup)
        },
    }
}

fn to_inline_markup(keyboard: Keyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .filter_map(|button| match button {
                    Button::Action { label, action } => {
                        Some(InlineKeyboardButton::callback(label, action))
                    },
                    Button::Url { label, url } => match reqwest::Url::parse(&url) {
                        Ok(url) => Some(InlineKeyboardButton::url(label, url)),
                        Err(e) => {
                            warn!(url, error = %e, "dropping button with invalid url");
                            None
                        },
                    },
                })
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(
        &self,
        to: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageHandle> {
        let markup = keyboard.map(to_reply_markup);
        let message = self
            .with_retry("send_text", || {
                let mut req = self.bot.send_message(ChatId(to), text);
                if let Some(markup) = markup.clone() {
                    req = req.reply_markup(markup);
                }
                async move { req.await }
            })
            .await?;
        Ok(MessageHandle(message.id.0))
    }

    async fn send_image(
        &self,
        to: i64,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<MessageHandle> {
        let file_id = file_id.to_owned();
        let message = self
            .with_retry("send_image", || {
                let mut req = self
                    .bot
                    .send_photo(ChatId(to), InputFile::file_id(file_id.clone()));
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                async move { req.await }
            })
            .await?;
        Ok(MessageHandle(message.id.0))
    }

    async fn edit_text(
        &self,
        to: i64,
        message: MessageHandle,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        // Only inline keyboards can ride along on an edit.
        let markup = keyboard.map(to_inline_markup);
        self.with_retry("edit_text", || {
            let mut req = self
                .bot
                .edit_message_text(ChatId(to), MessageId(message.0), text);
            if let Some(markup) = markup.clone() {
                req = req.reply_markup(markup);
            }
            async move { req.await }
        })
        .await?;
        Ok(())
    }

    async fn delete_message(&self, to: i64, message: MessageHandle) -> Result<()> {
        self.with_retry("delete_message", || {
            let req = self.bot.delete_message(ChatId(to), MessageId(message.0));
            async move { req.await }
        })
        .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let callback_id = callback_id.to_owned();
        self.with_retry("answer_callback", || {
            let mut req = self.bot.answer_callback_query(callback_id.clone());
            if let Some(text) = text {
                req = req.text(text);
            }
            async move { req.await }
        })
        .await?;
        Ok(())
    }
}
