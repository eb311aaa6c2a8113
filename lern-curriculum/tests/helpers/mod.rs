//! Test Helper Utilities
//!
//! Shared fixtures for lern-curriculum integration tests

#![allow(dead_code)]

pub mod fixtures;
pub mod oracle;

pub use fixtures::{
    count, create_file_db, create_test_db, seed_app_config, seed_content, seed_link, seed_node, seed_user, test_config,
};
pub use oracle::{assign_all_to, batch_content_ids};
