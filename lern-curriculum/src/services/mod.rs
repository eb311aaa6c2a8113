//! Pipelines of the curriculum subsystem
//!
//! Each pipeline takes its collaborators (pool, oracle, config) as arguments
//! and returns a report; HTTP handlers and CLI subcommands are thin wrappers.

pub mod audit;
pub mod linking;
pub mod mastery;
pub mod prompts;
pub mod validation;

pub use audit::run_audit;
pub use linking::{run_linking, LinkingOptions};
pub use mastery::{record_mastery_event, user_mastery, MasteryEvent};
pub use validation::{run_validation, ValidationOptions};
