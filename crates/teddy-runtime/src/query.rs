//! [`QueryClient`] – asks the oracle until it gets something speakable.
//!
//! One call to [`QueryClient::query`] makes up to
//! [`RetryPolicy::max_attempts`] requests.  An attempt fails when
//!
//! - the transport fails (network error, timeout, non-200, bad JSON) – the
//!   client then waits [`RetryPolicy::backoff`] before the next attempt, or
//! - the reply survives transport but not the [sanitizer][crate::sanitizer]
//!   (no complete sentence) or is shorter than
//!   [`RetryPolicy::min_chars`] – the client retries immediately.
//!
//! Running out of attempts is an ordinary [`QueryError::Exhausted`]; the
//! session skips the turn.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::oracle::{Oracle, OracleError};
use crate::sanitizer::sanitize;

/// Attempt budget and acceptance threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total requests per query, including the first one.
    pub max_attempts: u32,
    /// Pause after a transport failure before trying again.
    pub backoff: Duration,
    /// Minimum length, in characters, of an acceptable sanitized reply.
    pub min_chars: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
            min_chars: 10,
        }
    }
}

/// Why a single attempt did not produce usable text.
#[derive(Error, Debug)]
pub enum AttemptFailure {
    #[error("transport failure: {0}")]
    Transport(#[from] OracleError),
    #[error("reply contained no complete sentence")]
    Incomplete,
    #[error("reply too short ({chars} < {min} chars)")]
    TooShort { chars: usize, min: usize },
}

/// Why a whole query produced nothing.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("all {attempts} attempts failed; last: {last}")]
    Exhausted { attempts: u32, last: AttemptFailure },
    #[error("query cancelled by shutdown")]
    Cancelled,
}

/// Retrying, sanitizing front-end to an [`Oracle`].
pub struct QueryClient<O> {
    oracle: O,
    policy: RetryPolicy,
}

impl<O: Oracle> QueryClient<O> {
    pub fn new(oracle: O, policy: RetryPolicy) -> Self {
        Self { oracle, policy }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Query the oracle and return sanitized text of acceptable length.
    ///
    /// `shutdown` is checked before every attempt.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Exhausted`] after `max_attempts` failed attempts,
    /// or [`QueryError::Cancelled`] if `shutdown` was raised in between.
    pub async fn query(
        &self,
        prompt: &str,
        intensity: u8,
        shutdown: &AtomicBool,
    ) -> Result<String, QueryError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last = None;

        for attempt in 1..=max_attempts {
            if shutdown.load(Ordering::SeqCst) {
                return Err(QueryError::Cancelled);
            }

            let failure = match self.oracle.generate(prompt, intensity).await {
                Ok(raw) => match self.accept(&raw) {
                    Ok(text) => {
                        info!(attempt, chars = text.chars().count(), "oracle reply accepted");
                        return Ok(text);
                    }
                    Err(rejection) => {
                        warn!(attempt, reason = %rejection, "reply rejected, retrying");
                        rejection
                    }
                },
                Err(e) => {
                    warn!(attempt, error = %e, "oracle request failed");
                    if attempt < max_attempts && !self.policy.backoff.is_zero() {
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                    AttemptFailure::Transport(e)
                }
            };
            last = Some(failure);
        }

        warn!(attempts = max_attempts, "all retry attempts failed, skipping this turn");
        Err(QueryError::Exhausted {
            attempts: max_attempts,
            // At least one attempt always runs, so `last` is set.
            last: last.unwrap_or(AttemptFailure::Incomplete),
        })
    }

    fn accept(&self, raw: &str) -> Result<String, AttemptFailure> {
        debug!(raw, "raw generated text");
        let cleaned = sanitize(raw).ok_or(AttemptFailure::Incomplete)?;
        let chars = cleaned.chars().count();
        let removed = raw.chars().count().saturating_sub(chars);
        if removed > 0 {
            debug!(original = raw.chars().count(), cleaned = chars, "cleaned incomplete sentence");
        }
        if chars < self.policy.min_chars {
            return Err(AttemptFailure::TooShort {
                chars,
                min: self.policy.min_chars,
            });
        }
        Ok(cleaned)
    }
}
