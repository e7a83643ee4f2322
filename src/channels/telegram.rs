//! Telegram Bot API channel.
//!
//! Receives updates through `getUpdates` long polling and replies through the
//! plain HTTP methods. Only the fields the bot uses are modelled.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::channels::{
    Button, ButtonClick, Channel, ChatId, IncomingEvent, IncomingMessage, Keyboard, MessageStream,
};
use crate::config::TelegramConfig;
use crate::error::ChannelError;

const CHANNEL_NAME: &str = "telegram";

/// Pause after a failed poll before trying again.
const POLL_BACKOFF: Duration = Duration::from_secs(5);

/// Envelope every Bot API method returns.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    #[serde(default)]
    from: Option<User>,
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    data: Option<String>,
}

/// Telegram channel over the Bot API.
pub struct TelegramChannel {
    client: Client,
    config: TelegramConfig,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        // Long polls hold the connection open for `poll_timeout`.
        let client = Client::builder()
            .timeout(config.poll_timeout + Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    fn api_url(config: &TelegramConfig, method: &str) -> String {
        format!("{}/bot{}/{}", config.api_url, config.token(), method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, ChannelError> {
        let response = self
            .client
            .post(Self::api_url(&self.config, method))
            .json(&body)
            .send()
            .await?;
        parse_response(method, response).await
    }

    /// Confirm the token is accepted before starting to poll.
    async fn get_me(&self) -> Result<(), ChannelError> {
        let _: serde_json::Value = self.call("getMe", json!({})).await?;
        Ok(())
    }
}

async fn parse_response<T: DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> Result<T, ChannelError> {
    let status = response.status();
    let body = response.text().await?;
    let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
        ChannelError::InvalidMessage(format!("{method}: HTTP {status}, undecodable body: {e}"))
    })?;

    if parsed.ok
        && let Some(result) = parsed.result
    {
        return Ok(result);
    }

    let reason = parsed
        .description
        .unwrap_or_else(|| format!("HTTP {status}"));
    if matches!(parsed.error_code, Some(401) | Some(404)) {
        return Err(ChannelError::AuthFailed {
            name: CHANNEL_NAME.to_string(),
            reason,
        });
    }
    Err(ChannelError::SendFailed {
        name: CHANNEL_NAME.to_string(),
        reason: format!("{method}: {reason}"),
    })
}

/// Translate an update into an event. Updates the bot does not care about
/// (stickers, edits, channel posts...) yield `None`.
fn convert_update(update: Update) -> Option<IncomingEvent> {
    if let Some(query) = update.callback_query {
        let payload = query.data?;
        let (chat_id, message_id) = match &query.message {
            Some(m) => (m.chat.id, Some(m.message_id)),
            None => (query.from.id, None),
        };
        return Some(IncomingEvent::Click(ButtonClick {
            id: query.id,
            chat_id,
            user_id: query.from.id,
            message_id,
            payload,
        }));
    }

    let message = update.message?;
    let text = message.text?;
    let user_id = message.from.map(|u| u.id).unwrap_or(message.chat.id);
    Some(IncomingEvent::Message(IncomingMessage {
        chat_id: message.chat.id,
        user_id,
        text,
    }))
}

fn reply_keyboard(keyboard: &Keyboard) -> serde_json::Value {
    let rows: Vec<Vec<serde_json::Value>> = keyboard
        .iter()
        .map(|row| row.iter().map(|label| json!({ "text": label })).collect())
        .collect();
    json!({ "keyboard": rows, "resize_keyboard": true })
}

fn inline_keyboard(buttons: &[Button]) -> serde_json::Value {
    let rows: Vec<Vec<serde_json::Value>> = buttons
        .iter()
        .map(|b| vec![json!({ "text": b.label, "callback_data": b.payload })])
        .collect();
    json!({ "inline_keyboard": rows })
}

async fn poll_loop(client: Client, config: TelegramConfig, tx: mpsc::Sender<IncomingEvent>) {
    let mut offset: i64 = 0;
    let url = TelegramChannel::api_url(&config, "getUpdates");

    loop {
        let body = json!({
            "offset": offset,
            "timeout": config.poll_timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });

        let updates: Vec<Update> = match client.post(&url).json(&body).send().await {
            Ok(response) => match parse_response("getUpdates", response).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "Telegram getUpdates failed");
                    tokio::time::sleep(POLL_BACKOFF).await;
                    continue;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Telegram getUpdates request failed");
                tokio::time::sleep(POLL_BACKOFF).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(event) = convert_update(update) else {
                continue;
            };
            if tx.send(event).await.is_err() {
                tracing::info!("Telegram event receiver dropped, stopping poller");
                return;
            }
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        self.get_me().await.map_err(|e| ChannelError::StartupFailed {
            name: CHANNEL_NAME.to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!(bot_id = self.config.bot_id(), "Telegram channel started");

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(poll_loop(self.client.clone(), self.config.clone(), tx));
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), ChannelError> {
        let _: serde_json::Value = self
            .call("sendMessage", json!({ "chat_id": chat, "text": text }))
            .await?;
        Ok(())
    }

    async fn send_menu(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: &Keyboard,
    ) -> Result<(), ChannelError> {
        let body = json!({
            "chat_id": chat,
            "text": text,
            "reply_markup": reply_keyboard(keyboard),
        });
        let _: serde_json::Value = self.call("sendMessage", body).await?;
        Ok(())
    }

    async fn send_choices(
        &self,
        chat: ChatId,
        text: &str,
        buttons: &[Button],
    ) -> Result<(), ChannelError> {
        let body = json!({
            "chat_id": chat,
            "text": text,
            "reply_markup": inline_keyboard(buttons),
        });
        let _: serde_json::Value = self.call("sendMessage", body).await?;
        Ok(())
    }

    async fn edit_text(
        &self,
        chat: ChatId,
        message_id: i64,
        text: &str,
    ) -> Result<(), ChannelError> {
        let body = json!({ "chat_id": chat, "message_id": message_id, "text": text });
        let _: serde_json::Value = self.call("editMessageText", body).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        png: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<(), ChannelError> {
        let part = Part::bytes(png)
            .file_name("progress.png")
            .mime_str("image/png")?;
        let mut form = Form::new().text("chat_id", chat.to_string()).part("photo", part);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response = self
            .client
            .post(Self::api_url(&self.config, "sendPhoto"))
            .multipart(form)
            .send()
            .await?;
        let _: serde_json::Value = parse_response("sendPhoto", response).await?;
        Ok(())
    }

    async fn acknowledge(&self, click_id: &str) -> Result<(), ChannelError> {
        let _: bool = self
            .call("answerCallbackQuery", json!({ "callback_query_id": click_id }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(raw: serde_json::Value) -> Update {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn text_message_becomes_message_event() {
        let event = convert_update(update(json!({
            "update_id": 10,
            "message": {
                "message_id": 5,
                "from": { "id": 111, "first_name": "Ира", "is_bot": false },
                "chat": { "id": 222, "type": "private" },
                "date": 1700000000,
                "text": "/start"
            }
        })));
        assert_eq!(
            event,
            Some(IncomingEvent::Message(IncomingMessage::new(222, 111, "/start")))
        );
    }

    #[test]
    fn callback_becomes_click_event() {
        let event = convert_update(update(json!({
            "update_id": 11,
            "callback_query": {
                "id": "cb-1",
                "from": { "id": 111, "first_name": "Ира", "is_bot": false },
                "message": {
                    "message_id": 77,
                    "chat": { "id": 222, "type": "private" },
                    "date": 1700000000,
                    "text": "question"
                },
                "chat_instance": "x",
                "data": "answer:111:0:2"
            }
        })));
        let Some(IncomingEvent::Click(click)) = event else {
            panic!("expected click, got {event:?}");
        };
        assert_eq!(click.id, "cb-1");
        assert_eq!(click.chat_id, 222);
        assert_eq!(click.user_id, 111);
        assert_eq!(click.message_id, Some(77));
        assert_eq!(click.payload, "answer:111:0:2");
    }

    #[test]
    fn non_text_updates_are_skipped() {
        let sticker = update(json!({
            "update_id": 12,
            "message": {
                "message_id": 6,
                "chat": { "id": 1, "type": "private" },
                "date": 1700000000,
                "sticker": { "file_id": "abc" }
            }
        }));
        assert!(convert_update(sticker).is_none());

        let edited = update(json!({ "update_id": 13, "edited_message": {} }));
        assert!(convert_update(edited).is_none());
    }

    #[test]
    fn keyboards_serialize_to_bot_api_shape() {
        let reply = reply_keyboard(&vec![vec!["a".to_string(), "b".to_string()]]);
        assert_eq!(reply["keyboard"][0][1]["text"], "b");
        assert_eq!(reply["resize_keyboard"], true);

        let inline = inline_keyboard(&[Button::new("Никогда", "answer:1:0:0")]);
        assert_eq!(inline["inline_keyboard"][0][0]["callback_data"], "answer:1:0:0");
    }

    #[test]
    fn error_envelope_is_decoded() {
        let raw = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let parsed: ApiResponse<serde_json::Value> = serde_json::from_str(raw).unwrap();
        assert!(!parsed.ok);
        assert_eq!(parsed.error_code, Some(401));
        assert_eq!(parsed.description.as_deref(), Some("Unauthorized"));
    }
}
