//! Elevation strategies and process execution for sudoprompt
//!
//! This crate holds everything that touches processes or the filesystem:
//!
//! - [`builder`]: pure construction of the scripts and argv each strategy runs
//! - [`strategy`]: the POSIX prompt, Windows file handshake and macOS strategies
//! - [`stream`]: streaming and detached execution with marker confirmation
//! - [`workspace`]: the per-invocation temp directory used by the handshake
//! - [`dispatch`]: host detection and the [`Elevator`] entry point
//!
//! Process plumbing sits behind [`ProcessRunner`] and timing behind
//! [`Sleeper`], so strategies can be driven without real elevation.

pub mod builder;
mod command_spec;
pub mod context;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod marker;
mod native;
pub mod platform;
pub mod poll;
mod process;
pub mod strategy;
pub mod stream;
pub mod workspace;

pub use command_spec::CommandSpec;
pub use context::EnvContext;
pub use dispatch::{Elevator, StrategyKind};
pub use error::RunnerError;
pub use native::NativeRunner;
pub use poll::{ConfirmPolicy, PollPolicy, Sleeper, TokioSleeper};
pub use process::{ProcessOutput, ProcessRunner};
pub use strategy::{ElevationStrategy, ExecOutput, FileHandshake, NativeMac, PosixPrompt, SpawnOutcome};
pub use stream::{ElevatedChild, StreamEvent};
