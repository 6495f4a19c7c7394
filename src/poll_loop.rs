//! The long-poll loop driving the bot.

use std::time::Duration;

use chrono::Utc;
use log::{debug, error, warn};

use crate::challenge::ChallengeStore;
use crate::cursor::UpdateCursor;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::openrouter::IllusionGenerator;
use crate::telegram::Messenger;

/// Expired challenges are swept once every this many successful polls.
pub const SWEEP_INTERVAL: u64 = 10;

/// Pause before polling again after a failed iteration.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// All mutable state of the bot. Lives for the whole process, never persisted.
#[derive(Debug, Default)]
pub struct BotContext {
    pub challenges: ChallengeStore,
    pub cursor: UpdateCursor,
}

pub struct PollLoop<M, G> {
    messenger: M,
    generator: G,
    context: BotContext,
    iterations: u64,
    retry_delay: Duration,
}

impl<M: Messenger, G: IllusionGenerator> PollLoop<M, G> {
    pub fn new(messenger: M, generator: G) -> Self {
        Self::with_context(messenger, generator, BotContext::default())
    }

    /// Drive the loop from an already built context.
    pub fn with_context(messenger: M, generator: G, context: BotContext) -> Self {
        Self {
            messenger,
            generator,
            context,
            iterations: 0,
            retry_delay: RETRY_DELAY,
        }
    }

    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn context(&self) -> &BotContext {
        &self.context
    }

    /// Poll forever. Failed iterations are logged and retried after the retry delay.
    pub async fn run(&mut self) {
        loop {
            if let Err(e) = self.poll_once().await {
                error!("Error in poll loop: {e}");
                tokio::time::sleep(self.retry_delay).await;
            }
        }
    }

    /// Fetch one batch, dispatch it in arrival order and sweep when due.
    ///
    /// Returns the number of updates in the batch. Only a failed fetch is an
    /// error; a failed dispatch is logged and the batch goes on.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let offset = self.context.cursor.next_offset();
        let updates = self.messenger.fetch_updates(offset).await?;
        let count = updates.len();
        if count > 0 {
            debug!("Processing {count} updates from offset {offset:?}");
        }

        let dispatcher = Dispatcher::new(&self.messenger, &self.generator);
        for update in updates {
            let update_id = update.id;
            self.context.cursor.advance(update_id);
            if let Err(e) = dispatcher
                .dispatch(&mut self.context.challenges, update)
                .await
            {
                warn!("Failed to handle update {update_id}: {e}");
            }
        }

        self.iterations += 1;
        if self.iterations % SWEEP_INTERVAL == 0 {
            self.context.challenges.sweep_expired(Utc::now());
        }

        Ok(count)
    }
}
