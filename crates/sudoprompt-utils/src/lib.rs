//! Foundation crate shared by every sudoprompt crate.
//!
//! Holds the error taxonomy, the exit code table, logging setup and the small
//! value types (operators, command lines, platforms) that cross crate seams.

pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod types;
