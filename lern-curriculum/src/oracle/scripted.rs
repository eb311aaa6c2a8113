//! Scripted oracle for tests and offline rehearsal
//!
//! Answers come from a queue of canned replies, or from a responder
//! closure when the answer depends on the prompt (concurrent batches arrive
//! in no particular order).

use super::{Oracle, OracleError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&str, &str) -> Result<String, OracleError> + Send + Sync>;

/// Prompt pair captured by the scripted oracle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPrompt {
    pub system: String,
    pub user: String,
}

pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    responder: Option<Responder>,
    prompts: Mutex<Vec<CapturedPrompt>>,
    call_count: AtomicU32,
}

impl ScriptedOracle {
    /// Oracle answering from a queue (see [`ScriptedOracle::reply`])
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            responder: None,
            prompts: Mutex::new(Vec::new()),
            call_count: AtomicU32::new(0),
        }
    }

    /// Oracle computing each answer from the prompts
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String, OracleError> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    /// Queue a successful reply
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.lock_replies().push_back(Ok(text.into()));
        self
    }

    /// Queue a failure
    pub fn fail(self, error: OracleError) -> Self {
        self.lock_replies().push_back(Err(error));
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<CapturedPrompt> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, OracleError>>> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(CapturedPrompt {
                system: system_prompt.to_string(),
                user: user_prompt.to_string(),
            });

        if let Some(responder) = &self.responder {
            return responder(system_prompt, user_prompt);
        }

        self.lock_replies()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Refused("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_order_and_exhaustion() {
        let oracle = ScriptedOracle::new()
            .reply("{}")
            .fail(OracleError::Api(503, "busy".to_string()));

        assert_eq!(oracle.complete("s", "u1").await.unwrap(), "{}");
        assert!(matches!(oracle.complete("s", "u2").await, Err(OracleError::Api(503, _))));
        assert!(matches!(oracle.complete("s", "u3").await, Err(OracleError::Refused(_))));
        assert_eq!(oracle.call_count(), 3);
        assert_eq!(oracle.prompts()[1].user, "u2");
    }

    #[tokio::test]
    async fn test_responder_sees_prompt() {
        let oracle = ScriptedOracle::from_fn(|_, user| Ok(format!("{{\"len\": {}}}", user.len())));
        assert_eq!(oracle.complete("s", "abc").await.unwrap(), r#"{"len": 3}"#);
    }
}
