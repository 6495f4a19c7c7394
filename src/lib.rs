pub mod challenge;
pub mod config;
pub mod cursor;
pub mod dispatcher;
pub mod error;
pub mod openrouter;
pub mod poll_loop;
pub mod telegram;
pub mod types;

#[cfg(test)]
mod test_support;

use log::{debug, info};

use config::Config;
use error::Result;
use openrouter::OpenRouterClient;
use poll_loop::{BotContext, PollLoop};
use telegram::TelegramClient;

/// Run the Telegram bot until Ctrl-C.
pub async fn run() -> Result<()> {
    info!("Initializing bot");
    let config = Config::from_env()?;

    debug!("Initializing Telegram client");
    let telegram = TelegramClient::new(&config.telegram_token, config.poll_timeout_secs)?;

    debug!("Initializing OpenRouter client");
    let openrouter = OpenRouterClient::new(
        config.openrouter_api_key,
        config.prompt_model,
        config.image_model,
    );

    let mut poll_loop = PollLoop::with_context(telegram, openrouter, BotContext::default());

    info!("Starting poll loop");
    tokio::select! {
        () = poll_loop.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down...");
        }
    }

    Ok(())
}
