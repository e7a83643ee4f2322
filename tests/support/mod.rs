//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use psybot::channels::{
    Button, ButtonClick, Channel, ChatId, IncomingEvent, IncomingMessage, Keyboard, MessageStream,
};
use psybot::error::ChannelError;

/// Everything the bot sent, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat: ChatId,
        text: String,
    },
    Menu {
        chat: ChatId,
        text: String,
        keyboard: Keyboard,
    },
    Choices {
        chat: ChatId,
        text: String,
        buttons: Vec<Button>,
    },
    Edit {
        chat: ChatId,
        message_id: i64,
        text: String,
    },
    Photo {
        chat: ChatId,
        bytes: usize,
        caption: Option<String>,
    },
}

impl Sent {
    pub fn text(&self) -> &str {
        match self {
            Sent::Text { text, .. }
            | Sent::Menu { text, .. }
            | Sent::Choices { text, .. }
            | Sent::Edit { text, .. } => text,
            Sent::Photo { caption, .. } => caption.as_deref().unwrap_or_default(),
        }
    }
}

/// Channel that records outgoing calls instead of talking to a platform.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<Sent>>,
    acknowledged: Mutex<Vec<String>>,
    fail_edits: bool,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A channel whose `edit_text` always fails.
    pub fn without_edits() -> Arc<Self> {
        Arc::new(Self {
            fail_edits: true,
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub fn last(&self) -> Option<Sent> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().unwrap().clone()
    }

    fn push(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), ChannelError> {
        self.push(Sent::Text {
            chat,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_menu(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: &Keyboard,
    ) -> Result<(), ChannelError> {
        self.push(Sent::Menu {
            chat,
            text: text.to_string(),
            keyboard: keyboard.clone(),
        });
        Ok(())
    }

    async fn send_choices(
        &self,
        chat: ChatId,
        text: &str,
        buttons: &[Button],
    ) -> Result<(), ChannelError> {
        self.push(Sent::Choices {
            chat,
            text: text.to_string(),
            buttons: buttons.to_vec(),
        });
        Ok(())
    }

    async fn edit_text(
        &self,
        chat: ChatId,
        message_id: i64,
        text: &str,
    ) -> Result<(), ChannelError> {
        if self.fail_edits {
            return Err(ChannelError::SendFailed {
                name: "recording".to_string(),
                reason: "message can't be edited".to_string(),
            });
        }
        self.push(Sent::Edit {
            chat,
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        png: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<(), ChannelError> {
        self.push(Sent::Photo {
            chat,
            bytes: png.len(),
            caption: caption.map(str::to_string),
        });
        Ok(())
    }

    async fn acknowledge(&self, click_id: &str) -> Result<(), ChannelError> {
        self.acknowledged.lock().unwrap().push(click_id.to_string());
        Ok(())
    }
}

pub fn message(user: i64, text: &str) -> IncomingEvent {
    IncomingEvent::Message(IncomingMessage::new(user, user, text))
}

pub fn click(user: i64, payload: &str) -> IncomingEvent {
    IncomingEvent::Click(ButtonClick {
        id: format!("cb-{user}"),
        chat_id: user,
        user_id: user,
        message_id: Some(77),
        payload: payload.to_string(),
    })
}
