//! Chat transport abstraction.
//!
//! The bot only needs a handful of primitives from a chat platform: a stream
//! of inbound events, plain text replies, a persistent menu keyboard, inline
//! buttons that come back as click events, message edits and image uploads.

pub mod telegram;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;

pub use telegram::TelegramChannel;

/// Platform user identifier.
pub type UserId = i64;

/// Platform conversation identifier.
pub type ChatId = i64;

/// Rows of menu button labels.
pub type Keyboard = Vec<Vec<String>>;

/// Stream of inbound events from a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingEvent> + Send>>;

/// Something the user did.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingEvent {
    Message(IncomingMessage),
    Click(ButtonClick),
}

impl IncomingEvent {
    pub fn user_id(&self) -> UserId {
        match self {
            IncomingEvent::Message(m) => m.user_id,
            IncomingEvent::Click(c) => c.user_id,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            IncomingEvent::Message(m) => m.chat_id,
            IncomingEvent::Click(c) => c.chat_id,
        }
    }
}

/// A text message.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
}

impl IncomingMessage {
    pub fn new(chat_id: ChatId, user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            user_id,
            text: text.into(),
        }
    }
}

/// A click on an inline button.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonClick {
    /// Platform id used to acknowledge the click.
    pub id: String,
    pub chat_id: ChatId,
    pub user_id: UserId,
    /// Message carrying the button, when the platform reports it.
    pub message_id: Option<i64>,
    /// Opaque payload attached to the button.
    pub payload: String,
}

/// An inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// A chat platform the bot can talk through.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start receiving events.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), ChannelError>;

    /// Send text and replace the user's reply keyboard.
    async fn send_menu(&self, chat: ChatId, text: &str, keyboard: &Keyboard)
    -> Result<(), ChannelError>;

    /// Send text with one inline button per row.
    async fn send_choices(
        &self,
        chat: ChatId,
        text: &str,
        buttons: &[Button],
    ) -> Result<(), ChannelError>;

    /// Replace the text of a message the bot sent earlier.
    async fn edit_text(&self, chat: ChatId, message_id: i64, text: &str)
    -> Result<(), ChannelError>;

    async fn send_photo(
        &self,
        chat: ChatId,
        png: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<(), ChannelError>;

    /// Tell the platform a button click was handled.
    async fn acknowledge(&self, click_id: &str) -> Result<(), ChannelError>;
}
