//! Telegram Bot API transport.

use std::future::Future;

use log::debug;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::error::{BotError, Result};
use crate::types::{
    ButtonOption, CallbackPress, ChatId, TextMessage, Update, UpdatePayload, UserId,
};

const TELEGRAM_API_URL: &str = "https://api.telegram.org/";

/// Update kinds requested from `getUpdates`.
const ALLOWED_UPDATES: [&str; 2] = ["message", "callback_query"];

/// Outbound side of the bot: everything the core needs from the messaging platform.
pub trait Messenger {
    /// Long-poll for updates starting at `offset` (`None`: oldest unconfirmed update).
    fn fetch_updates(
        &self,
        offset: Option<i64>,
    ) -> impl Future<Output = Result<Vec<Update>>> + Send;

    /// Dismiss the loading indicator on a pressed button.
    fn acknowledge_callback(&self, callback_id: &str) -> impl Future<Output = Result<()>> + Send;

    fn send_text(&self, chat_id: ChatId, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Send an image with a caption and optional inline buttons, one per row.
    fn send_image(
        &self,
        chat_id: ChatId,
        image: &[u8],
        caption: &str,
        options: &[ButtonOption],
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Envelope shared by every Bot API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 2],
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct AnswerCallbackRequest<'a> {
    callback_query_id: &'a str,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardMarkup<'a> {
    inline_keyboard: Vec<Vec<InlineKeyboardButton<'a>>>,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardButton<'a> {
    text: &'a str,
    callback_data: &'a str,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    callback_query: Option<RawCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    chat: RawChat,
    #[serde(default)]
    from: Option<RawUser>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCallbackQuery {
    id: String,
    from: RawUser,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: i64,
}

impl From<RawUpdate> for Update {
    fn from(raw: RawUpdate) -> Self {
        let payload = if let Some(callback) = raw.callback_query {
            // Callbacks on messages too old for Telegram to include carry no chat
            match (callback.message, callback.data) {
                (Some(message), Some(data)) => UpdatePayload::Callback(CallbackPress {
                    chat_id: ChatId(message.chat.id),
                    user_id: UserId(callback.from.id),
                    data,
                    callback_id: callback.id,
                }),
                _ => UpdatePayload::StaleCallback {
                    callback_id: callback.id,
                },
            }
        } else if let Some(RawMessage {
            chat,
            from: Some(from),
            text: Some(text),
        }) = raw.message
        {
            UpdatePayload::Message(TextMessage {
                chat_id: ChatId(chat.id),
                user_id: UserId(from.id),
                text,
            })
        } else {
            UpdatePayload::Unsupported
        };

        Update {
            id: raw.update_id,
            payload,
        }
    }
}

fn build_keyboard(options: &[ButtonOption]) -> InlineKeyboardMarkup<'_> {
    InlineKeyboardMarkup {
        inline_keyboard: options
            .iter()
            .map(|option| {
                vec![InlineKeyboardButton {
                    text: &option.label,
                    callback_data: &option.value,
                }]
            })
            .collect(),
    }
}

/// Bot API client over `reqwest`.
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: Url,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(token: &str, poll_timeout_secs: u64) -> Result<Self> {
        let base_url = Url::parse(&format!("{TELEGRAM_API_URL}bot{token}/"))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            poll_timeout_secs,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        debug!("Calling Telegram method {method}");
        let response = request.send().await?;
        let status = response.status();
        let body: ApiResponse<T> = response.json().await?;

        match body {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(BotError::TelegramApi {
                status,
                description: description
                    .unwrap_or_else(|| format!("{method} returned no result")),
            }),
        }
    }

    fn endpoint(&self, method: &str) -> Result<Url> {
        Ok(self.base_url.join(method)?)
    }
}

impl Messenger for TelegramClient {
    async fn fetch_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout_secs,
            allowed_updates: ALLOWED_UPDATES,
        };
        let builder = self.client.post(self.endpoint("getUpdates")?).json(&request);
        let raw: Vec<RawUpdate> = self.call("getUpdates", builder).await?;

        debug!("Received {} updates from Telegram", raw.len());
        Ok(raw.into_iter().map(Update::from).collect())
    }

    async fn acknowledge_callback(&self, callback_id: &str) -> Result<()> {
        let request = AnswerCallbackRequest {
            callback_query_id: callback_id,
        };
        let builder = self
            .client
            .post(self.endpoint("answerCallbackQuery")?)
            .json(&request);
        let _: bool = self.call("answerCallbackQuery", builder).await?;
        Ok(())
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        let request = SendMessageRequest {
            chat_id: chat_id.0,
            text,
        };
        let builder = self.client.post(self.endpoint("sendMessage")?).json(&request);
        let _: serde_json::Value = self.call("sendMessage", builder).await?;
        Ok(())
    }

    async fn send_image(
        &self,
        chat_id: ChatId,
        image: &[u8],
        caption: &str,
        options: &[ButtonOption],
    ) -> Result<()> {
        let photo = Part::bytes(image.to_vec())
            .file_name("illusion.png")
            .mime_str("image/png")?;

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("photo", photo);
        if !options.is_empty() {
            form = form.text("reply_markup", serde_json::to_string(&build_keyboard(options))?);
        }

        debug!("Uploading {} byte image to chat {chat_id}", image.len());
        let builder = self.client.post(self.endpoint("sendPhoto")?).multipart(form);
        let _: serde_json::Value = self.call("sendPhoto", builder).await?;
        Ok(())
    }
}
