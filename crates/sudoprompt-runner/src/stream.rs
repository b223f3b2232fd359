//! Streaming and detached execution
//!
//! A spawned elevation front-end is read by a background task that turns
//! its pipes into ordered [`StreamEvent`]s. The confirmation loop consumes
//! those events until the marker shows up, the process exits, or the
//! bounded wait runs out.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tracing::{debug, warn};

use sudoprompt_utils::error::ElevationError;
use sudoprompt_validation::{Invocation, StdioMode};

use crate::command_spec::CommandSpec;
use crate::marker::strip_marker;
use crate::platform;
use crate::poll::{ConfirmPolicy, Sleeper};
use crate::process::ProcessOutput;
use crate::strategy::{ExecOutput, SpawnOutcome};

/// Classifier applied when the front-end exits before the marker arrives.
pub type Classifier = fn(&ProcessOutput, &str) -> Result<ExecOutput, ElevationError>;

/// One piece of output, or the exit, of an elevated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Stdout(String),
    Stderr(String),
    /// Exit status; `-1` when killed by a signal.
    Exited(i32),
    /// Elevation succeeded but the command's result could not be collected.
    /// Like `Exited`, nothing follows it.
    Failed(ElevationError),
}

/// Handle to an elevated command whose elevation has been confirmed.
#[derive(Debug)]
pub struct ElevatedChild {
    pid: Option<u32>,
    command: String,
    backlog: VecDeque<StreamEvent>,
    events: UnboundedReceiver<StreamEvent>,
    stdin: Option<ChildStdin>,
}

impl ElevatedChild {
    pub(crate) fn new(
        pid: Option<u32>,
        command: String,
        backlog: VecDeque<StreamEvent>,
        events: UnboundedReceiver<StreamEvent>,
        stdin: Option<ChildStdin>,
    ) -> Self {
        Self {
            pid,
            command,
            backlog,
            events,
            stdin,
        }
    }

    /// Next output chunk or the final status. `None` after `Exited` or `Failed`.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        self.events.recv().await
    }

    /// Writable stdin, present only when the command was spawned with stdin kept open.
    pub fn stdin(&mut self) -> Option<&mut ChildStdin> {
        self.stdin.as_mut()
    }

    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Pid of the elevation front-end, when one is known.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Close stdin, collect the remaining output and classify the exit status.
    pub async fn wait(mut self) -> Result<ExecOutput, ElevationError> {
        drop(self.stdin.take());

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut code = None;
        while let Some(event) = self.next_event().await {
            match event {
                StreamEvent::Stdout(chunk) => stdout.push_str(&chunk),
                StreamEvent::Stderr(chunk) => stderr.push_str(&chunk),
                StreamEvent::Exited(status) => {
                    code = Some(status);
                    break;
                }
                StreamEvent::Failed(err) => return Err(err),
            }
        }

        match code {
            Some(0) => Ok(ExecOutput { stdout, stderr }),
            Some(code) => Err(ElevationError::CommandFailed {
                command: self.command,
                code,
                stdout,
                stderr,
            }),
            None => Err(ElevationError::internal(
                "elevated command output ended without an exit status",
            )),
        }
    }
}

/// Incremental UTF-8 decoding that never splits a multi-byte character.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let out = text.to_string();
                self.pending.clear();
                out
            }
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                let out = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                out
            }
            Err(_) => self.finish(),
        }
    }

    fn finish(&mut self) -> String {
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }
}

fn send_text(tx: &UnboundedSender<StreamEvent>, text: String, wrap: fn(String) -> StreamEvent) {
    if !text.is_empty() {
        let _ = tx.send(wrap(text));
    }
}

/// Move `child` into a reader task and return its event stream.
///
/// Events arrive in the order the chunks were read; the last one is always
/// `Exited`.
fn start_reader(mut child: Child) -> UnboundedReceiver<StreamEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let mut out_buf = vec![0u8; 8192];
        let mut err_buf = vec![0u8; 8192];
        let mut out_dec = Utf8Decoder::default();
        let mut err_dec = Utf8Decoder::default();

        loop {
            tokio::select! {
                read = async { stdout_pipe.as_mut()?.read(&mut out_buf).await.ok() }, if stdout_pipe.is_some() => {
                    match read {
                        Some(n) if n > 0 => send_text(&tx, out_dec.push(&out_buf[..n]), StreamEvent::Stdout),
                        _ => {
                            send_text(&tx, out_dec.finish(), StreamEvent::Stdout);
                            stdout_pipe = None;
                        }
                    }
                }
                read = async { stderr_pipe.as_mut()?.read(&mut err_buf).await.ok() }, if stderr_pipe.is_some() => {
                    match read {
                        Some(n) if n > 0 => send_text(&tx, err_dec.push(&err_buf[..n]), StreamEvent::Stderr),
                        _ => {
                            send_text(&tx, err_dec.finish(), StreamEvent::Stderr);
                            stderr_pipe = None;
                        }
                    }
                }
                else => break,
            }
        }

        let code = match child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                warn!(error = %e, "Failed to wait for elevated process");
                -1
            }
        };
        let _ = tx.send(StreamEvent::Exited(code));
    });

    rx
}

/// Consume events until the marker arrives.
///
/// Returns the events that followed the marker. Before the marker, stdout
/// is buffered for matching; stderr read so far is handed on with the rest.
pub(crate) async fn await_marker(
    events: &mut UnboundedReceiver<StreamEvent>,
    pid: Option<u32>,
    sleeper: &dyn Sleeper,
    policy: ConfirmPolicy,
    command: &str,
    classify: Classifier,
) -> Result<VecDeque<StreamEvent>, ElevationError> {
    let mut backlog = VecDeque::new();
    let mut pre_stdout = String::new();
    let mut pre_stderr = String::new();
    let mut confirmed = false;
    let mut sleeps = 0u32;

    loop {
        loop {
            let event = match events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => break,
                // The reader always sends Exited last, so this only happens after it panicked
                Err(TryRecvError::Disconnected) if confirmed => break,
                Err(TryRecvError::Disconnected) => StreamEvent::Exited(-1),
            };

            if confirmed {
                backlog.push_back(event);
                continue;
            }

            match event {
                StreamEvent::Stdout(chunk) => {
                    pre_stdout.push_str(&chunk);
                    if let Some(rest) = strip_marker(&pre_stdout) {
                        debug!(attempt = sleeps, "Elevation confirmed");
                        // Pipes are read independently, so stderr may have been read first
                        if !pre_stderr.is_empty() {
                            backlog.push_back(StreamEvent::Stderr(std::mem::take(&mut pre_stderr)));
                        }
                        if !rest.is_empty() {
                            backlog.push_back(StreamEvent::Stdout(rest.to_string()));
                        }
                        confirmed = true;
                    }
                }
                StreamEvent::Stderr(chunk) => pre_stderr.push_str(&chunk),
                StreamEvent::Failed(err) => return Err(err),
                StreamEvent::Exited(code) => {
                    let output = ProcessOutput::new(
                        pre_stdout.into_bytes(),
                        pre_stderr.into_bytes(),
                        Some(code),
                    );
                    let out = classify(&output, command)?;
                    let mut finished = VecDeque::new();
                    if !out.stdout.is_empty() {
                        finished.push_back(StreamEvent::Stdout(out.stdout));
                    }
                    if !out.stderr.is_empty() {
                        finished.push_back(StreamEvent::Stderr(out.stderr));
                    }
                    finished.push_back(StreamEvent::Exited(code));
                    return Ok(finished);
                }
            }
        }

        if confirmed {
            return Ok(backlog);
        }

        if sleeps >= policy.attempts {
            warn!(attempts = sleeps, "No elevation confirmation in time, terminating");
            if let Some(pid) = pid {
                platform::terminate_process_tree(pid).await;
            }
            let waited_ms = u64::try_from(policy.budget().as_millis()).unwrap_or(u64::MAX);
            return Err(ElevationError::PromptTimedOut { waited_ms });
        }

        sleeper.sleep(policy.delay).await;
        sleeps += 1;
    }
}

/// Deliver events after confirmation when nobody holds a handle.
async fn drain_detached(
    backlog: VecDeque<StreamEvent>,
    mut events: UnboundedReceiver<StreamEvent>,
    stdio: StdioMode,
) {
    let mut pending = backlog;
    loop {
        let event = match pending.pop_front() {
            Some(event) => event,
            None => match events.recv().await {
                Some(event) => event,
                None => break,
            },
        };
        match (stdio, event) {
            (StdioMode::Inherit, StreamEvent::Stdout(text)) => write_stdout(&text).await,
            (StdioMode::Inherit, StreamEvent::Stderr(text)) => write_stderr(&text).await,
            (_, StreamEvent::Exited(code)) => {
                debug!(exit_code = code, "Detached elevated command exited");
                break;
            }
            (_, StreamEvent::Failed(err)) => {
                warn!(error = %err, "Detached elevated command result lost");
                break;
            }
            (StdioMode::Piped, StreamEvent::Stdout(text) | StreamEvent::Stderr(text)) => {
                debug!(bytes = text.len(), "Discarding detached output");
            }
        }
    }
}

/// Relay output to this process's stdio and forward only the final status.
async fn relay_inherited(
    backlog: VecDeque<StreamEvent>,
    mut events: UnboundedReceiver<StreamEvent>,
    exit_tx: UnboundedSender<StreamEvent>,
) {
    let mut pending = backlog;
    loop {
        let event = match pending.pop_front() {
            Some(event) => event,
            None => match events.recv().await {
                Some(event) => event,
                None => break,
            },
        };
        match event {
            StreamEvent::Stdout(text) => write_stdout(&text).await,
            StreamEvent::Stderr(text) => write_stderr(&text).await,
            last @ (StreamEvent::Exited(_) | StreamEvent::Failed(_)) => {
                let _ = exit_tx.send(last);
                break;
            }
        }
    }
}

async fn write_stdout(text: &str) {
    let mut out = tokio::io::stdout();
    let _ = out.write_all(text.as_bytes()).await;
    let _ = out.flush().await;
}

async fn write_stderr(text: &str) {
    let mut err = tokio::io::stderr();
    let _ = err.write_all(text.as_bytes()).await;
    let _ = err.flush().await;
}

/// Turn a confirmed event stream into the caller-facing outcome.
pub(crate) fn into_outcome(
    invocation: &Invocation,
    pid: Option<u32>,
    backlog: VecDeque<StreamEvent>,
    events: UnboundedReceiver<StreamEvent>,
    stdin: Option<ChildStdin>,
) -> SpawnOutcome {
    let options = invocation.spawn_options();
    let command = invocation.joined_command();

    if options.detached {
        drop(stdin);
        tokio::spawn(drain_detached(backlog, events, options.stdio));
        return SpawnOutcome::Detached { pid };
    }

    match options.stdio {
        StdioMode::Piped => {
            SpawnOutcome::Attached(ElevatedChild::new(pid, command, backlog, events, stdin))
        }
        StdioMode::Inherit => {
            let (exit_tx, exit_rx) = mpsc::unbounded_channel();
            tokio::spawn(relay_inherited(backlog, events, exit_tx));
            SpawnOutcome::Attached(ElevatedChild::new(
                pid,
                command,
                VecDeque::new(),
                exit_rx,
                stdin,
            ))
        }
    }
}

/// Spawn an elevation front-end that speaks the marker protocol and wait for confirmation.
pub(crate) async fn spawn_with_marker(
    spec: &CommandSpec,
    invocation: &Invocation,
    sleeper: &dyn Sleeper,
    policy: ConfirmPolicy,
    classify: Classifier,
) -> Result<SpawnOutcome, ElevationError> {
    let options = invocation.spawn_options();
    let command = invocation.joined_command();
    let started = Instant::now();

    let mut cmd = spec.to_tokio_command();
    cmd.stdin(if options.keep_stdin_open {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());
    platform::set_process_group(&mut cmd);

    let mut child = cmd.spawn().map_err(|e| {
        debug!(program = %spec.program.to_string_lossy(), error = %e, "Failed to spawn elevation front-end");
        ElevationError::PermissionDenied
    })?;
    let pid = child.id();
    let stdin = child.stdin.take();
    let mut events = start_reader(child);

    let backlog = await_marker(&mut events, pid, sleeper, policy, &command, classify).await?;
    debug!(
        pid = ?pid,
        duration_ms = %started.elapsed().as_millis(),
        "Elevated command running"
    );

    Ok(into_outcome(invocation, pid, backlog, events, stdin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::classify;
    use crate::poll::testing::CountingSleeper;
    use std::time::Duration;

    fn policy(attempts: u32) -> ConfirmPolicy {
        ConfirmPolicy {
            delay: Duration::from_millis(5),
            attempts,
        }
    }

    #[test]
    fn test_utf8_decoder_keeps_split_characters() {
        let mut dec = Utf8Decoder::default();
        let bytes = "h\u{e9}llo".as_bytes();
        assert_eq!(dec.push(&bytes[..2]), "h");
        assert_eq!(dec.push(&bytes[2..]), "\u{e9}llo");
        assert_eq!(dec.finish(), "");
    }

    #[test]
    fn test_utf8_decoder_lossy_on_invalid_bytes() {
        let mut dec = Utf8Decoder::default();
        assert_eq!(dec.push(&[b'a', 0xff, b'b']), "a\u{fffd}b");
    }

    #[tokio::test]
    async fn test_marker_split_across_chunks_confirms() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(StreamEvent::Stderr("noise".to_string())).unwrap();
        tx.send(StreamEvent::Stdout("SUDO".to_string())).unwrap();
        tx.send(StreamEvent::Stdout("PROMPT\nfirst".to_string())).unwrap();
        tx.send(StreamEvent::Stderr("warn".to_string())).unwrap();

        let sleeper = CountingSleeper::default();
        let backlog = await_marker(&mut rx, None, &sleeper, policy(3), "cmd", classify)
            .await
            .unwrap();
        assert_eq!(
            Vec::from(backlog),
            vec![
                StreamEvent::Stderr("noise".to_string()),
                StreamEvent::Stdout("first".to_string()),
                StreamEvent::Stderr("warn".to_string())
            ]
        );
        assert_eq!(sleeper.count(), 0);
    }

    #[tokio::test]
    async fn test_exit_without_marker_is_classified() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(StreamEvent::Stderr("No authentication agent found.".to_string()))
            .unwrap();
        tx.send(StreamEvent::Exited(127)).unwrap();

        let sleeper = CountingSleeper::default();
        let result = await_marker(&mut rx, None, &sleeper, policy(3), "cmd", classify).await;
        assert_eq!(result, Err(ElevationError::NoPolkitAgent));
    }

    #[tokio::test]
    async fn test_times_out_after_exact_attempts() {
        let (_tx, mut rx) = mpsc::unbounded_channel::<StreamEvent>();
        let sleeper = CountingSleeper::default();
        let result = await_marker(&mut rx, None, &sleeper, policy(4), "cmd", classify).await;
        assert_eq!(result, Err(ElevationError::PromptTimedOut { waited_ms: 20 }));
        assert_eq!(sleeper.count(), 4);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_silent_process_is_terminated_on_timeout() {
        use crate::poll::TokioSleeper;
        use sudoprompt_validation::Options;

        let inv = Invocation::with_process_title("sleep 30", Options::new().name("T"), None).unwrap();
        let spec = CommandSpec::new("sleep").arg("30");
        let started = Instant::now();
        let result = spawn_with_marker(&spec, &inv, &TokioSleeper, policy(2), classify).await;
        assert!(matches!(result, Err(ElevationError::PromptTimedOut { waited_ms: 10 })));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_wait_collects_and_classifies() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(StreamEvent::Stdout("b".to_string())).unwrap();
        tx.send(StreamEvent::Stderr("e".to_string())).unwrap();
        tx.send(StreamEvent::Exited(2)).unwrap();
        let backlog = VecDeque::from(vec![StreamEvent::Stdout("a".to_string())]);

        let child = ElevatedChild::new(Some(1), "run".to_string(), backlog, rx, None);
        assert_eq!(child.pid(), Some(1));
        assert_eq!(
            child.wait().await,
            Err(ElevationError::CommandFailed {
                command: "run".to_string(),
                code: 2,
                stdout: "ab".to_string(),
                stderr: "e".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_wait_returns_failure_unchanged() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(StreamEvent::Stdout("partial".to_string())).unwrap();
        tx.send(StreamEvent::Failed(ElevationError::PromptTimedOut { waited_ms: 30 }))
            .unwrap();
        let child = ElevatedChild::new(None, "run".to_string(), VecDeque::new(), rx, None);
        assert_eq!(
            child.wait().await,
            Err(ElevationError::PromptTimedOut { waited_ms: 30 })
        );
    }

    #[tokio::test]
    async fn test_wait_without_exit_is_internal() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(StreamEvent::Stdout("x".to_string())).unwrap();
        drop(tx);
        let child = ElevatedChild::new(None, "run".to_string(), VecDeque::new(), rx, None);
        assert!(matches!(child.wait().await, Err(ElevationError::Internal { .. })));
    }
}
