//! Command-line interface for sudoprompt
//!
//! - `args`: argument definitions (clap)
//! - `run`: entry point, configuration and dispatch
//! - `output`: human and JSON rendering

pub mod args;
mod output;
mod run;


pub use args::{Cli, build_cli, parse_env_pair};
pub use run::{run, run_with};
