use std::env;

use log::{debug, error, info};

use crate::error::{BotError, Result};

const DEFAULT_PROMPT_MODEL: &str = "deepseek/deepseek-r1";
const DEFAULT_IMAGE_MODEL: &str = "google/gemini-2.5-flash-image";
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub openrouter_api_key: String,
    pub prompt_model: String,
    pub image_model: String,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        debug!("Loading configuration from environment");
        dotenvy::dotenv().ok();

        let telegram_token = env::var("TELEGRAM_BOT_TOKEN").map_err(|e| {
            error!("Failed to load TELEGRAM_BOT_TOKEN from environment: {e}");
            e
        })?;

        let openrouter_api_key = env::var("OPENROUTER_API_KEY").map_err(|e| {
            error!("Failed to load OPENROUTER_API_KEY from environment: {e}");
            e
        })?;

        let prompt_model = env::var("OPENROUTER_PROMPT_MODEL")
            .unwrap_or_else(|_| DEFAULT_PROMPT_MODEL.to_string());
        let image_model = env::var("OPENROUTER_IMAGE_MODEL")
            .unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string());
        let poll_timeout_secs = parse_poll_timeout(env::var("POLL_TIMEOUT_SECS").ok())?;

        info!("Configuration loaded successfully");
        debug!(
            "Telegram token length: {} characters",
            telegram_token.len()
        );
        debug!(
            "OpenRouter API key length: {} characters",
            openrouter_api_key.len()
        );
        debug!("Prompt model: {prompt_model}, image model: {image_model}");
        debug!("Poll timeout: {poll_timeout_secs}s");

        Ok(Self {
            telegram_token,
            openrouter_api_key,
            prompt_model,
            image_model,
            poll_timeout_secs,
        })
    }
}

fn parse_poll_timeout(raw: Option<String>) -> Result<u64> {
    match raw {
        None => Ok(DEFAULT_POLL_TIMEOUT_SECS),
        Some(value) => value.trim().parse().map_err(|_| {
            error!("Invalid POLL_TIMEOUT_SECS value: '{value}'");
            BotError::Config(format!(
                "POLL_TIMEOUT_SECS must be a whole number of seconds, got '{value}'"
            ))
        }),
    }
}
