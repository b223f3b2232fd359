use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use sudoprompt_config::Config;
use sudoprompt_utils::error::ElevationError;
use sudoprompt_validation::Invocation;

use super::{ElevationStrategy, ExecOutput, SpawnOutcome};
use crate::builder::{
    build_windows_command_script, build_windows_elevate_command, build_windows_execute_script,
};
use crate::context::EnvContext;
use crate::dispatch::StrategyKind;
use crate::native::NativeRunner;
use crate::poll::{HandshakePoll, PollDecision, PollPolicy, Sleeper, TokioSleeper};
use crate::process::ProcessRunner;
use crate::stream::{self, StreamEvent};
use crate::workspace::{TempWorkspace, generate_id};

/// Elevation through UAC with results handed back in sidecar files.
///
/// The elevated process cannot share pipes with the caller, so it writes
/// `stdout`, `stderr` and `status` into a per-invocation workspace that is
/// polled until the status file holds at least two bytes.
pub struct FileHandshake {
    runner: Arc<dyn ProcessRunner>,
    sleeper: Arc<dyn Sleeper>,
    policy: PollPolicy,
}

impl FileHandshake {
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>, sleeper: Arc<dyn Sleeper>, policy: PollPolicy) -> Self {
        Self {
            runner,
            sleeper,
            policy,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(NativeRunner::new(config.max_buffer_bytes())),
            Arc::new(TokioSleeper),
            PollPolicy::from_config(config),
        )
    }

    #[must_use]
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Write both scripts and ask for elevation. Any failure to elevate is a denial.
    async fn launch(
        &self,
        workspace: &TempWorkspace,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<(), ElevationError> {
        write_file(&workspace.command_script(), &build_windows_command_script(invocation, ctx)?).await?;
        write_file(&workspace.execute_script(), &build_windows_execute_script(workspace)).await?;

        let elevate = build_windows_elevate_command(workspace);
        match self.runner.run(&elevate).await {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => {
                debug!(
                    exit_code = output.code(),
                    stderr = %output.stderr_string().trim(),
                    "Elevation request refused"
                );
                Err(ElevationError::PermissionDenied)
            }
            Err(e) => {
                debug!(error = %e, "Elevation request did not run");
                Err(ElevationError::PermissionDenied)
            }
        }
    }

    async fn run_in_workspace(
        &self,
        workspace: &TempWorkspace,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<(i32, ExecOutput), ElevationError> {
        self.launch(workspace, invocation, ctx).await?;
        let mut poll = HandshakePoll::new(self.policy);
        wait_for_status(workspace, self.sleeper.as_ref(), &mut poll, None).await?;
        read_result(workspace).await
    }
}

impl std::fmt::Debug for FileHandshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandshake")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

async fn write_file(path: &Path, contents: &str) -> Result<(), ElevationError> {
    tokio::fs::write(path, contents).await.map_err(|e| {
        ElevationError::internal(format!("failed to write {}: {e}", path.display()))
    })
}

async fn exists(path: &Path) -> Result<bool, ElevationError> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ElevationError::internal(format!(
            "failed to stat {}: {e}",
            path.display()
        ))),
    }
}

/// True once the status file holds the exit code and its line break.
async fn status_complete(workspace: &TempWorkspace) -> Result<bool, ElevationError> {
    match tokio::fs::metadata(workspace.status_path()).await {
        Ok(meta) => Ok(meta.len() >= 2),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ElevationError::internal(format!(
            "failed to stat status file: {e}"
        ))),
    }
}

/// Poll until the status file is complete.
///
/// `confirmed` fires the first time the command is known to be running,
/// either through its stdout sidecar or a completed status file.
async fn wait_for_status(
    workspace: &TempWorkspace,
    sleeper: &dyn Sleeper,
    poll: &mut HandshakePoll,
    mut confirmed: Option<oneshot::Sender<()>>,
) -> Result<(), ElevationError> {
    loop {
        if status_complete(workspace).await? {
            poll.confirm();
            notify(poll, &mut confirmed);
            debug!(attempts = poll.attempts(), "Status file complete");
            return Ok(());
        }

        sleeper.sleep(poll.policy().interval).await;
        let stdout_exists = exists(&workspace.stdout_path()).await?;
        let decision = poll.after_sleep(stdout_exists);
        notify(poll, &mut confirmed);

        match decision {
            PollDecision::Continue => {}
            PollDecision::Denied => {
                debug!(attempts = poll.attempts(), "No stdout sidecar, treating as denied");
                return Err(ElevationError::PermissionDenied);
            }
            PollDecision::TimedOut => {
                warn!(attempts = poll.attempts(), "Elevated command did not finish in time");
                let waited_ms = u64::try_from(poll.waited().as_millis()).unwrap_or(u64::MAX);
                return Err(ElevationError::PromptTimedOut { waited_ms });
            }
        }
    }
}

fn notify(poll: &HandshakePoll, confirmed: &mut Option<oneshot::Sender<()>>) {
    if poll.is_confirmed()
        && let Some(tx) = confirmed.take()
    {
        let _ = tx.send(());
    }
}

async fn read_sidecar(path: &Path) -> Result<String, ElevationError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(ElevationError::internal(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}

/// Exit code and output recorded by a completed run.
async fn read_result(workspace: &TempWorkspace) -> Result<(i32, ExecOutput), ElevationError> {
    let status = read_sidecar(&workspace.status_path()).await?;
    let code = status.trim().parse::<i32>().map_err(|_| {
        ElevationError::internal(format!("unreadable status file contents '{}'", status.trim()))
    })?;
    let stdout = read_sidecar(&workspace.stdout_path()).await?;
    let stderr = read_sidecar(&workspace.stderr_path()).await?;
    Ok((code, ExecOutput { stdout, stderr }))
}

fn to_outcome(command: String, code: i32, output: ExecOutput) -> Result<ExecOutput, ElevationError> {
    if code == 0 {
        Ok(output)
    } else {
        Err(ElevationError::CommandFailed {
            command,
            code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Remove the workspace. A cleanup failure only surfaces when nothing else went wrong.
async fn finish<T>(workspace: TempWorkspace, result: Result<T, ElevationError>) -> Result<T, ElevationError> {
    let cleanup = workspace.remove().await;
    match (result, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup)) => {
            warn!(error = %cleanup, "Workspace cleanup failed after an earlier error");
            Err(e)
        }
    }
}

#[async_trait]
impl ElevationStrategy for FileHandshake {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FileHandshake
    }

    async fn exec(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<ExecOutput, ElevationError> {
        let command = invocation.joined_command();
        let workspace =
            TempWorkspace::create(&ctx.temp_dir, invocation.name().as_str(), &command).await?;
        let result = self.run_in_workspace(&workspace, invocation, ctx).await;
        let (code, output) = finish(workspace, result).await?;
        to_outcome(command, code, output)
    }

    async fn spawn(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<SpawnOutcome, ElevationError> {
        let command = invocation.joined_command();
        let workspace =
            TempWorkspace::create(&ctx.temp_dir, invocation.name().as_str(), &command).await?;
        if let Err(e) = self.launch(&workspace, invocation, ctx).await {
            return finish(workspace, Err(e)).await;
        }

        let (confirm_tx, confirm_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();
        let sleeper = Arc::clone(&self.sleeper);
        let policy = self.policy;
        let background = workspace.clone();

        // The file handshake has no live pipes: output arrives once, after the status file completes
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut poll = HandshakePoll::new(policy);
            let waited =
                wait_for_status(&background, sleeper.as_ref(), &mut poll, Some(confirm_tx)).await;
            let result = match waited {
                Ok(()) => read_result(&background).await,
                Err(e) => Err(e),
            };
            let result = finish(background, result).await;
            match result {
                Ok((code, output)) => {
                    if !output.stdout.is_empty() {
                        let _ = events_tx.send(StreamEvent::Stdout(output.stdout));
                    }
                    if !output.stderr.is_empty() {
                        let _ = events_tx.send(StreamEvent::Stderr(output.stderr));
                    }
                    let _ = events_tx.send(StreamEvent::Exited(code));
                    let _ = result_tx.send(Ok(()));
                }
                Err(e) => {
                    // Before confirmation the caller reads result_rx, after it the event stream
                    let _ = events_tx.send(StreamEvent::Failed(e.clone()));
                    let _ = result_tx.send(Err(e));
                }
            }
        });

        // The sender is dropped without firing only when the poll failed first
        if confirm_rx.await.is_err() {
            return match result_rx.await {
                Ok(Err(e)) => Err(e),
                _ => Err(ElevationError::internal(
                    "handshake poll ended without confirmation",
                )),
            };
        }
        info!(workspace = %workspace.path().display(), "Elevated command running");

        Ok(stream::into_outcome(
            invocation,
            None,
            Default::default(),
            events_rx,
            None,
        ))
    }

    async fn describe(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<String, ElevationError> {
        let command = invocation.joined_command();
        let workspace = TempWorkspace::locate(
            &ctx.temp_dir,
            &generate_id(invocation.name().as_str(), &command),
        )?;
        let script = build_windows_command_script(invocation, ctx)?;
        Ok(format!(
            "{}\n\n{}:\n{}\n\n{}:\n{}",
            build_windows_elevate_command(&workspace).display(),
            workspace.execute_script().display(),
            build_windows_execute_script(&workspace),
            workspace.command_script().display(),
            script
        ))
    }
}
