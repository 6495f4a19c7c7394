//! Per-user challenge bookkeeping: start, answer check and expiry.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info};

use crate::types::{Answer, UserId};

/// How long a challenge may stay unanswered before the sweep drops it.
pub const CHALLENGE_TIMEOUT: TimeDelta = TimeDelta::minutes(10);

/// One pending illusion waiting for its user's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub user_id: UserId,
    pub prompt_text: String,
    pub correct_answer: Answer,
    pub explanation: String,
    pub image: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= CHALLENGE_TIMEOUT
    }
}

/// Outcome of an answer. A wrong answer and a missing challenge look the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Correct { explanation: String },
    Incorrect,
}

/// At most one live challenge per user.
///
/// Expired entries are not removed on read; they only become invisible to
/// [`ChallengeStore::active_challenge`] until [`ChallengeStore::sweep_expired`]
/// drops them.
#[derive(Debug, Default)]
pub struct ChallengeStore {
    challenges: HashMap<UserId, Challenge>,
}

impl ChallengeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a challenge for `user_id`, replacing any previous one.
    pub fn start_challenge(
        &mut self,
        user_id: UserId,
        prompt_text: String,
        correct_answer: Answer,
        explanation: String,
        image: Vec<u8>,
    ) {
        self.start_challenge_at(
            user_id,
            prompt_text,
            correct_answer,
            explanation,
            image,
            Utc::now(),
        );
    }

    pub fn start_challenge_at(
        &mut self,
        user_id: UserId,
        prompt_text: String,
        correct_answer: Answer,
        explanation: String,
        image: Vec<u8>,
        created_at: DateTime<Utc>,
    ) {
        let challenge = Challenge {
            user_id,
            prompt_text,
            correct_answer,
            explanation,
            image,
            created_at,
        };

        if self.challenges.insert(user_id, challenge).is_some() {
            debug!("Replaced previous challenge for user {user_id}");
        }
        info!("Challenge started for user {user_id} with answer: {correct_answer}");
    }

    /// Check `submitted` against the user's challenge and remove it.
    ///
    /// Returns `false` both for a wrong answer and for a user without a
    /// challenge. Comparison is exact: no trimming, no case folding.
    pub fn check_answer(&mut self, user_id: UserId, submitted: &str) -> bool {
        matches!(self.judge_answer(user_id, submitted), Verdict::Correct { .. })
    }

    /// Same as [`ChallengeStore::check_answer`], but a correct answer also
    /// hands back the stored explanation.
    pub fn judge_answer(&mut self, user_id: UserId, submitted: &str) -> Verdict {
        debug!("Checking answer for user {user_id}: {submitted}");

        let Some(challenge) = self.challenges.remove(&user_id) else {
            info!("No active challenge found for user {user_id}");
            return Verdict::Incorrect;
        };

        if challenge.correct_answer.as_ref() == submitted {
            info!("User {user_id} answer is correct");
            Verdict::Correct {
                explanation: challenge.explanation,
            }
        } else {
            info!("User {user_id} answer is incorrect");
            Verdict::Incorrect
        }
    }

    /// The user's challenge, unless it has already expired.
    #[must_use]
    pub fn active_challenge(&self, user_id: UserId) -> Option<&Challenge> {
        self.active_challenge_at(user_id, Utc::now())
    }

    #[must_use]
    pub fn active_challenge_at(&self, user_id: UserId, now: DateTime<Utc>) -> Option<&Challenge> {
        self.challenges
            .get(&user_id)
            .filter(|challenge| !challenge.is_expired_at(now))
    }

    /// Drop every challenge that is at least [`CHALLENGE_TIMEOUT`] old.
    ///
    /// Returns the number of challenges removed.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.challenges.len();
        self.challenges.retain(|user_id, challenge| {
            let expired = challenge.is_expired_at(now);
            if expired {
                debug!("Removing expired challenge for user {user_id}");
            }
            !expired
        });

        let removed = before - self.challenges.len();
        info!("Cleaned up {removed} expired challenges");
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}
