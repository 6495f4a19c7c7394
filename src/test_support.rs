//! In-memory collaborators for dispatcher and poll loop tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::StatusCode;

use crate::error::{BotError, Result};
use crate::openrouter::IllusionGenerator;
use crate::telegram::Messenger;
use crate::types::{
    Answer, ButtonOption, CallbackPress, ChatId, GeneratedPrompt, TextMessage, Update,
    UpdatePayload, UserId,
};

pub fn text_message(id: i64, chat: i64, user: i64, text: &str) -> Update {
    Update {
        id,
        payload: UpdatePayload::Message(TextMessage {
            chat_id: ChatId(chat),
            user_id: UserId(user),
            text: text.to_string(),
        }),
    }
}

pub fn callback(id: i64, chat: i64, user: i64, data: &str, callback_id: &str) -> Update {
    Update {
        id,
        payload: UpdatePayload::Callback(CallbackPress {
            chat_id: ChatId(chat),
            user_id: UserId(user),
            data: data.to_string(),
            callback_id: callback_id.to_string(),
        }),
    }
}

/// Everything the fake messenger was asked to deliver, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Ack(String),
    Text(ChatId, String),
    Image {
        chat_id: ChatId,
        image: Vec<u8>,
        caption: String,
        options: Vec<ButtonOption>,
    },
}

#[derive(Default)]
pub struct FakeMessenger {
    batches: Mutex<VecDeque<Result<Vec<Update>>>>,
    offsets: Mutex<Vec<Option<i64>>>,
    sent: Mutex<Vec<Sent>>,
    fail_acks: bool,
    fail_sends: bool,
    idle_poll: Option<Duration>,
}

impl FakeMessenger {
    /// Queue the responses of successive `fetch_updates` calls.
    /// Once drained, every fetch returns an empty batch.
    pub fn with_batches(batches: Vec<Result<Vec<Update>>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            ..Self::default()
        }
    }

    /// Make fetches on a drained queue block like a real long poll.
    pub fn idle_poll(mut self, wait: Duration) -> Self {
        self.idle_poll = Some(wait);
        self
    }

    pub fn failing_acks(mut self) -> Self {
        self.fail_acks = true;
        self
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn offsets(&self) -> Vec<Option<i64>> {
        self.offsets.lock().unwrap().clone()
    }

    fn record(&self, sent: Sent) -> Result<()> {
        if self.fail_sends {
            return Err(BotError::Config("send disabled".to_string()));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

impl Messenger for FakeMessenger {
    async fn fetch_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        self.offsets.lock().unwrap().push(offset);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => {
                if let Some(wait) = self.idle_poll {
                    tokio::time::sleep(wait).await;
                }
                Ok(Vec::new())
            }
        }
    }

    async fn acknowledge_callback(&self, callback_id: &str) -> Result<()> {
        if self.fail_acks {
            return Err(BotError::Config("ack disabled".to_string()));
        }
        self.record(Sent::Ack(callback_id.to_string()))
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.record(Sent::Text(chat_id, text.to_string()))
    }

    async fn send_image(
        &self,
        chat_id: ChatId,
        image: &[u8],
        caption: &str,
        options: &[ButtonOption],
    ) -> Result<()> {
        self.record(Sent::Image {
            chat_id,
            image: image.to_vec(),
            caption: caption.to_string(),
            options: options.to_vec(),
        })
    }
}

/// How a failing generator fails.
pub enum Failure {
    Response(String),
    Api(StatusCode),
}

impl Failure {
    fn to_error(&self) -> BotError {
        match self {
            Failure::Response(reason) => BotError::OpenRouterResponse(reason.clone()),
            Failure::Api(status) => BotError::OpenRouterApi {
                status: *status,
                message: r#"{"error":{"message":"Provider returned error"}}"#.to_string(),
            },
        }
    }
}

pub struct FakeGenerator {
    pub prompt_text: String,
    pub answer: Answer,
    pub explanation: String,
    pub image: Vec<u8>,
    pub failure: Option<Failure>,
    prompt_calls: Mutex<usize>,
    image_calls: Mutex<usize>,
}

impl FakeGenerator {
    fn new(prompt_text: &str, answer: Answer, image: &[u8], failure: Option<Failure>) -> Self {
        Self {
            prompt_text: prompt_text.to_string(),
            answer,
            explanation: String::new(),
            image: image.to_vec(),
            failure,
            prompt_calls: Mutex::new(0),
            image_calls: Mutex::new(0),
        }
    }

    pub fn ready(answer: Answer) -> Self {
        Self::new("Two circles side by side", answer, b"\x89PNG", None)
    }

    pub fn empty_prompt() -> Self {
        Self::new("", Answer::Equal, b"\x89PNG", None)
    }

    pub fn empty_image() -> Self {
        Self::new("Two squares", Answer::Equal, b"", None)
    }

    pub fn failing(reason: &str) -> Self {
        Self::new(
            "Two squares",
            Answer::Equal,
            b"\x89PNG",
            Some(Failure::Response(reason.to_string())),
        )
    }

    pub fn rate_limited() -> Self {
        Self::new(
            "Two squares",
            Answer::Equal,
            b"\x89PNG",
            Some(Failure::Api(StatusCode::TOO_MANY_REQUESTS)),
        )
    }

    pub fn with_explanation(mut self, explanation: &str) -> Self {
        self.explanation = explanation.to_string();
        self
    }

    pub fn prompt_calls(&self) -> usize {
        *self.prompt_calls.lock().unwrap()
    }

    pub fn image_calls(&self) -> usize {
        *self.image_calls.lock().unwrap()
    }
}

impl IllusionGenerator for FakeGenerator {
    async fn generate_prompt(&self) -> Result<GeneratedPrompt> {
        *self.prompt_calls.lock().unwrap() += 1;
        if let Some(failure) = &self.failure {
            return Err(failure.to_error());
        }
        Ok(GeneratedPrompt {
            text: self.prompt_text.clone(),
            answer: self.answer,
            explanation: self.explanation.clone(),
        })
    }

    async fn generate_image(&self, _prompt: &str) -> Result<Vec<u8>> {
        *self.image_calls.lock().unwrap() += 1;
        Ok(self.image.clone())
    }
}
