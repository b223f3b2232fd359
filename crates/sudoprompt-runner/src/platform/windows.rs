use tracing::debug;

pub(super) fn terminate_process(pid: u32) {
    use ::windows::Win32::Foundation::CloseHandle;
    use ::windows::Win32::System::Threading::{OpenProcess, PROCESS_TERMINATE, TerminateProcess};

    // SAFETY: the handle is checked by the windows crate and closed before returning.
    unsafe {
        match OpenProcess(PROCESS_TERMINATE, false, pid) {
            Ok(handle) => {
                let _ = TerminateProcess(handle, 1);
                let _ = CloseHandle(handle);
            }
            Err(e) => debug!(pid, error = %e, "Failed to open process for termination"),
        }
    }
}
