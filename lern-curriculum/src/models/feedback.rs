//! Human-review feedback entries

use serde::{Deserialize, Serialize};

/// Error type recorded for entries created by the quality audit
pub const AI_REVIEW_ERROR_TYPE: &str = "ai_review";

/// Feedback row as stored (append-only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: i64,
    pub app_id: String,
    /// Free-form pointer, `contentType:id`
    pub target_id: String,
    pub comment: String,
    pub error_type: String,
    pub resolved: bool,
}

/// Feedback to append
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub app_id: String,
    pub target_id: String,
    pub comment: String,
    pub error_type: String,
}
