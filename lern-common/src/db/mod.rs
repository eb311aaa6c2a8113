//! Store pool setup and schema bootstrap

pub mod init;

pub use init::*;
