//! Configuration for sudoprompt
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > file > defaults. The file is `.sudoprompt/config.toml`, found by
//! searching upward from the working directory.

mod config;

pub use config::*;
