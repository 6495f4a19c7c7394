#[tokio::main]
async fn main() -> illusionbot::error::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("illusionbot=info,reqwest=warn"),
    )
    .init();
    log::info!("Starting illusionbot Telegram bot");

    match illusionbot::run().await {
        Ok(()) => {
            log::info!("Bot shut down successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Bot encountered an error: {e}");
            Err(e)
        }
    }
}
