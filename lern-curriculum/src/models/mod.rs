//! Data models for the curriculum subsystem
//!
//! - Curriculum taxonomy and content rows (read side)
//! - Mastery state machine
//! - Feedback escalation entries
//! - Per-run pipeline reports returned to the trigger endpoints

pub mod curriculum;
pub mod feedback;
pub mod mastery;
pub mod reports;

pub use curriculum::{ContentItem, ContentLink, CurriculumNode, NodeLevel};
pub use feedback::{FeedbackEntry, NewFeedback};
pub use mastery::{MasteryRecord, MasteryStatus, MAX_MASTERY_LEVEL};
pub use reports::{
    AppLinkingSummary, AuditItemResult, AuditReport, AuditStatus, BatchFailure, LinkingReport,
    PairOutcome, PairVerdictKind, ProposedLink, SkippedApp, ValidationReport,
};
