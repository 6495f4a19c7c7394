//! Routing of updates to command handlers and the answer check.

use log::{debug, error, info, warn};
use strum::EnumString;

use crate::challenge::{ChallengeStore, Verdict};
use crate::error::Result;
use crate::openrouter::IllusionGenerator;
use crate::telegram::Messenger;
use crate::types::{
    CallbackPress, ChatId, GeneratedPrompt, TextMessage, Update, UpdatePayload, UserId,
    answer_options,
};

pub const WELCOME_TEXT: &str =
    "Welcome! Available commands:\n/illusion - Generate an optical illusion\n/help - Show help";
pub const HELP_TEXT: &str = "Available commands:\n/illusion - Generate an optical illusion and \
     guess which object is larger\n/help - Show help";
pub const UNKNOWN_COMMAND_TEXT: &str = "Unknown command. Type /help for available commands.";
pub const EMPTY_PROMPT_TEXT: &str =
    "Sorry, I couldn't generate a proper prompt for the illusion. Please try again.";
pub const EMPTY_IMAGE_TEXT: &str =
    "Sorry, I couldn't generate the illusion image. Please try again.";
pub const CORRECT_TEXT: &str = "Correct! Well done.";
pub const INCORRECT_TEXT: &str = "Incorrect. Try again!";
pub const ILLUSION_CAPTION: &str = "Which object appears larger?";

/// Commands are matched against the whole message text, exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
enum Command {
    #[strum(serialize = "/start")]
    Start,
    #[strum(serialize = "/help")]
    Help,
    #[strum(serialize = "/illusion")]
    Illusion,
}

/// Result of a generation attempt that did not fail outright.
enum Illusion {
    Ready {
        prompt: GeneratedPrompt,
        image: Vec<u8>,
    },
    EmptyPrompt,
    EmptyImage,
}

/// Stateless router. Challenge state is borrowed per call.
pub struct Dispatcher<'a, M, G> {
    messenger: &'a M,
    generator: &'a G,
}

impl<'a, M: Messenger, G: IllusionGenerator> Dispatcher<'a, M, G> {
    pub fn new(messenger: &'a M, generator: &'a G) -> Self {
        Self {
            messenger,
            generator,
        }
    }

    /// Handle one update.
    ///
    /// Generation failures are answered with an apology and never returned;
    /// errors from the messenger are.
    pub async fn dispatch(&self, challenges: &mut ChallengeStore, update: Update) -> Result<()> {
        match update.payload {
            UpdatePayload::Message(message) => self.handle_message(challenges, message).await,
            UpdatePayload::Callback(press) => self.handle_callback(challenges, press).await,
            UpdatePayload::StaleCallback { callback_id } => {
                debug!("Acknowledging callback {callback_id} without chat or data");
                self.messenger.acknowledge_callback(&callback_id).await
            }
            UpdatePayload::Unsupported => {
                debug!("Ignoring unsupported update {}", update.id);
                Ok(())
            }
        }
    }

    async fn handle_message(
        &self,
        challenges: &mut ChallengeStore,
        message: TextMessage,
    ) -> Result<()> {
        info!(
            "Received message from user {} in chat {}: {}",
            message.user_id, message.chat_id, message.text
        );

        match message.text.parse::<Command>() {
            Ok(Command::Start) => self.messenger.send_text(message.chat_id, WELCOME_TEXT).await,
            Ok(Command::Help) => self.messenger.send_text(message.chat_id, HELP_TEXT).await,
            Ok(Command::Illusion) => {
                self.send_illusion(challenges, message.chat_id, message.user_id)
                    .await
            }
            Err(_) => {
                debug!("Unknown command: {}", message.text);
                self.messenger
                    .send_text(message.chat_id, UNKNOWN_COMMAND_TEXT)
                    .await
            }
        }
    }

    async fn handle_callback(
        &self,
        challenges: &mut ChallengeStore,
        press: CallbackPress,
    ) -> Result<()> {
        info!(
            "Received callback from user {} in chat {}: {}",
            press.user_id, press.chat_id, press.data
        );

        if let Err(e) = self.messenger.acknowledge_callback(&press.callback_id).await {
            warn!("Failed to acknowledge callback {}: {e}", press.callback_id);
        }

        let reply = match challenges.judge_answer(press.user_id, &press.data) {
            Verdict::Correct { explanation } if !explanation.is_empty() => {
                format!("{CORRECT_TEXT}\n\n{explanation}")
            }
            Verdict::Correct { .. } => CORRECT_TEXT.to_string(),
            Verdict::Incorrect => INCORRECT_TEXT.to_string(),
        };
        self.messenger.send_text(press.chat_id, &reply).await
    }

    async fn generate(&self) -> Result<Illusion> {
        let prompt = self.generator.generate_prompt().await?;
        debug!("Received prompt: {}", prompt.text);
        if prompt.text.is_empty() {
            return Ok(Illusion::EmptyPrompt);
        }

        let image = self.generator.generate_image(&prompt.text).await?;
        if image.is_empty() {
            return Ok(Illusion::EmptyImage);
        }

        Ok(Illusion::Ready { prompt, image })
    }

    async fn send_illusion(
        &self,
        challenges: &mut ChallengeStore,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<()> {
        info!("Generating illusion challenge for user {user_id} in chat {chat_id}");

        let (prompt, image) = match self.generate().await {
            Ok(Illusion::Ready { prompt, image }) => (prompt, image),
            Ok(Illusion::EmptyPrompt) => {
                warn!("Empty prompt received from AI service");
                return self.messenger.send_text(chat_id, EMPTY_PROMPT_TEXT).await;
            }
            Ok(Illusion::EmptyImage) => {
                warn!("Empty image data received from AI service");
                return self.messenger.send_text(chat_id, EMPTY_IMAGE_TEXT).await;
            }
            Err(e) => {
                error!("Error generating illusion for user {user_id}: {e}");
                let apology = format!(
                    "Sorry, I encountered an error while generating the illusion: {}",
                    e.user_message()
                );
                return self.messenger.send_text(chat_id, &apology).await;
            }
        };

        challenges.start_challenge(
            user_id,
            prompt.text,
            prompt.answer,
            prompt.explanation,
            image.clone(),
        );

        self.messenger
            .send_image(chat_id, &image, ILLUSION_CAPTION, &answer_options())
            .await?;
        info!("Sent illusion challenge to chat {chat_id}");
        Ok(())
    }
}
