//! Test doubles shared by the runtime's unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::oracle::{Oracle, OracleError};

/// Replays scripted results, then falls back to a fixed reply (or a
/// transport error when there is none).  Records every request.
pub(crate) struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<(String, u8)>>,
}

impl ScriptedOracle {
    pub(crate) fn new(replies: Vec<Result<String, OracleError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn repeating(reply: &str) -> Self {
        Self::new(vec![]).then_always(reply)
    }

    pub(crate) fn then_always(mut self, reply: &str) -> Self {
        self.fallback = Some(reply.to_string());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<(String, u8)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn generate(&self, prompt: &str, intensity: u8) -> Result<String, OracleError> {
        self.requests
            .lock()
            .unwrap()
            .push((prompt.to_string(), intensity));
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        match &self.fallback {
            Some(text) => Ok(text.clone()),
            None => Err(OracleError::BadResponse("script exhausted".into())),
        }
    }
}

/// A transport-level failure.
pub(crate) fn down() -> Result<String, OracleError> {
    Err(OracleError::BadResponse("connection refused".into()))
}
