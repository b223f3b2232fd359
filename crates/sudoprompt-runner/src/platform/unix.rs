use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

pub(super) fn set_process_group(cmd: &mut Command) {
    // SAFETY: setpgid is async-signal-safe and touches no parent state.
    unsafe {
        cmd.pre_exec(|| {
            if libc::setpgid(0, 0) == 0 {
                Ok(())
            } else {
                Err(std::io::Error::last_os_error())
            }
        });
    }
}

pub(super) async fn terminate_process_group(pid: u32, grace: Duration) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    let pgid = Pid::from_raw(raw);

    if let Err(e) = killpg(pgid, Signal::SIGTERM) {
        debug!(pid, error = %e, "SIGTERM to process group failed");
        return;
    }

    tokio::time::sleep(grace).await;

    // ESRCH here just means everything already exited
    let _ = killpg(pgid, Signal::SIGKILL);
}
