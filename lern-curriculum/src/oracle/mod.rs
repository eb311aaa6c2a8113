//! Classifier oracle adapter
//!
//! The oracle is an external text-generation model used as a classifier and
//! judge. One call = one system prompt + one user prompt → raw text. The
//! adapter does not retry; each pipeline owns its own retry policy.

pub mod openai;
pub mod response;
pub mod scripted;

pub use openai::OpenAiOracle;
pub use response::{
    extract_json_object, LinkAssignments, OracleContractError, PairVerdict, ReviewOutcome,
    ReviewVerdict,
};
pub use scripted::ScriptedOracle;

use async_trait::async_trait;
use thiserror::Error;

/// Transport-level oracle failures
#[derive(Debug, Error)]
pub enum OracleError {
    /// Connection failure or malformed transport response
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the configured timeout
    #[error("Oracle request timed out after {0}s")]
    Timeout(u64),

    /// Non-2xx response
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Model produced no usable answer (empty, filtered, truncated)
    #[error("Oracle refused: {0}")]
    Refused(String),
}

/// Single-call text oracle
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Identifier for logs (model name)
    fn id(&self) -> &str;

    /// Run one completion
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError>;
}
