//! Process-group setup and termination
//!
//! Spawned elevation front-ends are put in their own process group on Unix so
//! a timed-out prompt can be taken down together with anything it started.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

use std::time::Duration;
use tokio::process::Command;

/// Time between the polite and the forced termination signal.
pub const TERMINATE_GRACE: Duration = Duration::from_millis(200);

/// Make the spawned child lead a new process group.
pub fn set_process_group(cmd: &mut Command) {
    #[cfg(unix)]
    unix::set_process_group(cmd);

    #[cfg(not(unix))]
    let _ = cmd;
}

/// Terminate `pid` and, on Unix, the rest of its process group.
pub async fn terminate_process_tree(pid: u32) {
    #[cfg(unix)]
    unix::terminate_process_group(pid, TERMINATE_GRACE).await;

    #[cfg(windows)]
    windows::terminate_process(pid);

    #[cfg(not(any(unix, windows)))]
    let _ = pid;
}
