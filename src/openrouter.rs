//! Illusion generation through `OpenRouter`: a chat model writes the prompt,
//! an image model draws it.

use std::future::Future;

use base64::{Engine, engine::general_purpose::STANDARD};
use data_url::DataUrl;
use log::{debug, warn};
use rand::prelude::IndexedRandom;
use serde::{Deserialize, Serialize};
use strum::VariantArray;

use crate::error::{BotError, Result};
use crate::types::{Answer, GeneratedPrompt};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

// Reasoning models spend most of the budget before answering
const PROMPT_MAX_TOKENS: u32 = 8192;

/// AI side of the bot.
pub trait IllusionGenerator {
    /// Produce an image prompt together with its ground-truth answer.
    fn generate_prompt(&self) -> impl Future<Output = Result<GeneratedPrompt>> + Send;

    /// Render `prompt`. An empty payload means the model produced no image.
    fn generate_image(&self, prompt: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modalities: Option<Vec<&'static str>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Vec<ImageOutput>,
}

#[derive(Debug, Deserialize)]
struct ImageOutput {
    image_url: ImageUrlOutput,
}

#[derive(Debug, Deserialize)]
struct ImageUrlOutput {
    url: String,
}

/// Fields the prompt model is asked to return.
#[derive(Debug, Default, Deserialize)]
struct PromptReply {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    explanation: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PromptReplyShape {
    Single(PromptReply),
    List(Vec<PromptReply>),
}

/// Ground truth for the next illusion, drawn uniformly.
fn pick_answer() -> Answer {
    Answer::VARIANTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(Answer::Equal)
}

fn image_request<'a>(model: &'a str, prompt: &str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![RequestMessage {
            role: "user",
            content: prompt.to_string(),
        }],
        max_tokens: None,
        modalities: Some(vec!["image"]),
    }
}

fn build_instruction(answer: Answer) -> String {
    format!(
        "Create one optical illusion prompt with two objects where one appears larger than the \
         other. The correct answer is '{answer}' - this means: {}. The objects might be the same \
         size but appear different due to context, or they might actually be different sizes. \
         The correct answer must be true by actual pixel size, not just appearance. Refer to the \
         objects as the first (left) and the second (right) object. Respond only with JSON like \
         this: {{\"prompt\": \"prompt for image generation\", \"explanation\": \"brief \
         explanation of how the illusion works\"}}",
        answer.description()
    )
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

fn parse_reply_json(candidate: &str) -> Option<PromptReply> {
    match serde_json::from_str::<PromptReplyShape>(candidate).ok()? {
        PromptReplyShape::Single(reply) => Some(reply),
        PromptReplyShape::List(replies) => replies.into_iter().next(),
    }
}

/// Extract prompt and explanation from whatever the chat model answered.
///
/// Falls back to the outermost `{...}` slice, then to the raw text as the prompt.
fn parse_prompt_reply(content: &str) -> PromptReply {
    let content = strip_code_fence(content);

    if let Some(reply) = parse_reply_json(content) {
        return reply;
    }

    warn!("Failed to parse prompt reply as JSON, trying to extract an object");
    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}'))
        && start < end
        && let Some(reply) = parse_reply_json(&content[start..=end])
    {
        return reply;
    }

    warn!("No JSON found in prompt reply, using raw content");
    PromptReply {
        prompt: content.to_string(),
        explanation: String::new(),
    }
}

/// Decode an image given either as a `data:` URL or as bare base64.
fn decode_image(url: &str) -> Result<Vec<u8>> {
    if url.starts_with("data:") {
        let data_url = DataUrl::process(url)?;
        let (body, _fragment) = data_url.decode_to_vec()?;
        return Ok(body);
    }
    Ok(STANDARD.decode(url.trim())?)
}

fn extract_image(response: ChatResponse) -> Result<Vec<u8>> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| BotError::OpenRouterResponse("No response from image model".into()))?;

    let Some(image) = choice.message.images.into_iter().next() else {
        if let Some(text) = choice.message.content {
            warn!(
                "Image model returned text instead of image: {}",
                text.chars().take(200).collect::<String>()
            );
        } else {
            warn!("Image model returned no image");
        }
        return Ok(Vec::new());
    };

    decode_image(&image.image_url.url)
}

pub struct OpenRouterClient {
    api_key: String,
    client: reqwest::Client,
    prompt_model: String,
    image_model: String,
}

impl OpenRouterClient {
    pub fn new(api_key: String, prompt_model: String, image_model: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            prompt_model,
            image_model,
        }
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatResponse> {
        debug!("Sending request to OpenRouter API with model {}", request.model);

        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            return Err(BotError::OpenRouterApi { status, message });
        }

        Ok(response.json().await?)
    }
}

impl IllusionGenerator for OpenRouterClient {
    async fn generate_prompt(&self) -> Result<GeneratedPrompt> {
        let answer = pick_answer();
        debug!("Generating prompt for answer '{answer}'");

        let request = ChatRequest {
            model: &self.prompt_model,
            messages: vec![RequestMessage {
                role: "user",
                content: build_instruction(answer),
            }],
            max_tokens: Some(PROMPT_MAX_TOKENS),
            modalities: None,
        };

        let response = self.complete(&request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BotError::OpenRouterResponse("No choices in response".into()))?
            .message
            .content
            .unwrap_or_default();
        debug!("Received prompt reply: {content}");

        let reply = parse_prompt_reply(&content);
        Ok(GeneratedPrompt {
            text: reply.prompt.trim().to_string(),
            answer,
            explanation: reply.explanation,
        })
    }

    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>> {
        debug!("Generating image with {}", self.image_model);

        let request = image_request(&self.image_model, prompt);
        let response = self.complete(&request).await?;
        let image = extract_image(response)?;
        debug!("Received image data, {} bytes", image.len());
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_reply() {
        let reply = parse_prompt_reply(r#"{"prompt": "two circles", "explanation": "context"}"#);
        assert_eq!(reply.prompt, "two circles");
        assert_eq!(reply.explanation, "context");
    }

    #[test]
    fn parses_fenced_array_reply() {
        let reply = parse_prompt_reply(
            "```json\n[{\"prompt\": \"two squares\", \"explanation\": \"same size\"}]\n```",
        );
        assert_eq!(reply.prompt, "two squares");
        assert_eq!(reply.explanation, "same size");
    }

    #[test]
    fn extracts_object_from_surrounding_text() {
        let reply = parse_prompt_reply(
            "Sure! Here it is: {\"prompt\": \"two lines\", \"explanation\": \"arrows\"} Enjoy.",
        );
        assert_eq!(reply.prompt, "two lines");
    }

    #[test]
    fn falls_back_to_raw_text() {
        let reply = parse_prompt_reply("  Two circles of equal size  ");
        assert_eq!(reply.prompt, "Two circles of equal size");
        assert!(reply.explanation.is_empty());
    }

    #[test]
    fn empty_reply_gives_empty_prompt() {
        assert!(parse_prompt_reply("").prompt.is_empty());
    }

    #[test]
    fn instruction_names_the_answer() {
        let instruction = build_instruction(Answer::Second);
        assert!(instruction.contains("'second'"));
        assert!(instruction.contains(Answer::Second.description()));
    }

    #[test]
    fn decodes_data_url_and_bare_base64() {
        assert_eq!(decode_image("data:image/png;base64,aGk=").unwrap(), b"hi");
        assert_eq!(decode_image("aGk=").unwrap(), b"hi");
        assert!(decode_image("not base64!").is_err());
    }

    #[test]
    fn text_only_image_reply_is_empty_payload() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "I cannot draw that"}}]}"#,
        )
        .unwrap();
        assert!(extract_image(response).unwrap().is_empty());
    }

    #[test]
    fn picked_answer_is_a_known_variant() {
        for _ in 0..20 {
            assert!(Answer::VARIANTS.contains(&pick_answer()));
        }
    }

    #[test]
    fn image_request_asks_for_image_modality_only() {
        let request = serde_json::to_value(image_request("image-model", "two circles")).unwrap();
        assert_eq!(
            request,
            serde_json::json!({
                "model": "image-model",
                "messages": [{ "role": "user", "content": "two circles" }],
                "modalities": ["image"]
            })
        );
    }

    #[test]
    fn missing_choices_is_an_error() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            extract_image(response),
            Err(BotError::OpenRouterResponse(_))
        ));
    }
}
