//! # Lern Common Library
//!
//! Shared code for the learning-platform services:
//! - Error type shared by store and configuration code
//! - TOML configuration loading and config file resolution
//! - Store pool setup and schema bootstrap
//! - Admin role lookup used by the pipeline trigger endpoints

pub mod api;
pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
