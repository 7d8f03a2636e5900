//! The speech-to-text side of the robot.

use async_trait::async_trait;
use thiserror::Error;

/// Errors a transcript source can report.
#[derive(Error, Debug)]
pub enum SensorError {
    /// The source will never produce another transcript (end of input,
    /// recogniser shut down).  The session treats this as a stop signal.
    #[error("transcript source closed")]
    Closed,
    /// The recogniser failed for this utterance only.
    #[error("speech recognition failed: {0}")]
    Device(String),
}

/// Anything that turns the user's speech into text.
///
/// # Contract
///
/// `next_transcript` suspends until an utterance has been recognised.  It
/// returns `Ok(None)` when the recogniser heard nothing usable; the caller
/// simply asks again.
#[async_trait]
pub trait TranscriptSource: Send {
    async fn next_transcript(&mut self) -> Result<Option<String>, SensorError>;
}
