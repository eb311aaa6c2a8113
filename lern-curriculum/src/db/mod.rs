//! Store access for the curriculum subsystem
//!
//! Plain functions over a `SqlitePool`, one module per table family. All
//! statements use positional `?` binds; multi-statement units run inside a
//! transaction.

pub mod contents;
pub mod curriculum;
pub mod feedback;
pub mod links;
pub mod mastery;
pub mod settings;

/// `?, ?, ?` for `count` positional binds
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
