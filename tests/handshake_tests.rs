//! File-handshake strategy driven through the public API
//!
//! A scripted `ProcessRunner` plays the part of UAC and the elevated
//! `execute.bat`, writing the sidecar files itself, so these tests run on
//! every OS.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sudoprompt::runner::{
    CommandSpec, FileHandshake, PollPolicy, ProcessOutput, ProcessRunner, RunnerError, Sleeper,
};
use sudoprompt::types::HostPlatform;
use sudoprompt::{
    Config, ElevationError, Elevator, EnvContext, Invocation, Options, SpawnOptions, SpawnOutcome,
};
use tempfile::TempDir;

#[derive(Default)]
struct NoSleep {
    count: AtomicUsize,
}

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {
        self.count.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}

/// Writes `stdout` right away and the status only after `delay_polls` more sleeps.
struct SlowElevation {
    sleeper: Arc<NoSleep>,
    status: &'static str,
    delay_polls: usize,
}

fn workspace_of(cmd: &CommandSpec) -> PathBuf {
    let last = cmd.args.last().unwrap().to_string_lossy().into_owned();
    let start = last.find('\'').unwrap() + 1;
    let end = last.rfind('\'').unwrap();
    PathBuf::from(&last[start..end]).parent().unwrap().to_path_buf()
}

#[async_trait]
impl ProcessRunner for SlowElevation {
    async fn run(&self, cmd: &CommandSpec) -> Result<ProcessOutput, RunnerError> {
        let dir = workspace_of(cmd);
        assert!(dir.join("execute.bat").is_file());
        assert!(dir.join("command.bat").is_file());
        std::fs::write(dir.join("stdout"), "working\r\n").unwrap();

        let sleeper = Arc::clone(&self.sleeper);
        let status = self.status;
        let target = self.delay_polls;
        tokio::spawn(async move {
            while sleeper.count.load(Ordering::SeqCst) < target {
                tokio::task::yield_now().await;
            }
            let _ = std::fs::write(dir.join("status"), status);
        });
        Ok(ProcessOutput::new(Vec::new(), Vec::new(), Some(0)))
    }
}

fn elevator(root: &TempDir, runner: SlowElevation, sleeper: Arc<NoSleep>) -> Elevator {
    let strategy = FileHandshake::new(
        Arc::new(runner),
        sleeper,
        PollPolicy {
            interval: Duration::from_millis(1),
            stdout_grace_attempts: 3,
            max_attempts: None,
        },
    );
    Elevator::with_strategy(Arc::new(strategy), &Config::default()).with_context(EnvContext::new(
        r"C:\Users\me",
        HostPlatform::Windows,
        root.path(),
    ))
}

fn inv(options: Options) -> Invocation {
    Invocation::with_process_title("dir", options.name("Handshake Test"), None).unwrap()
}

fn is_empty(root: &TempDir) -> bool {
    std::fs::read_dir(root.path()).unwrap().count() == 0
}

#[tokio::test]
async fn exec_waits_past_grace_window_once_stdout_exists() {
    let root = TempDir::new().unwrap();
    let sleeper = Arc::new(NoSleep::default());
    let runner = SlowElevation {
        sleeper: sleeper.clone(),
        status: "0\r\n",
        delay_polls: 10,
    };
    let out = elevator(&root, runner, sleeper.clone())
        .exec(&inv(Options::new()))
        .await
        .unwrap();
    assert_eq!(out.stdout, "working\r\n");
    assert!(sleeper.count.load(Ordering::SeqCst) >= 10);
    assert!(is_empty(&root));
}

#[tokio::test]
async fn exec_reports_command_failure() {
    let root = TempDir::new().unwrap();
    let sleeper = Arc::new(NoSleep::default());
    let runner = SlowElevation {
        sleeper: sleeper.clone(),
        status: "2\r\n",
        delay_polls: 1,
    };
    let result = elevator(&root, runner, sleeper).exec(&inv(Options::new())).await;
    assert!(matches!(
        result,
        Err(ElevationError::CommandFailed { code: 2, .. })
    ));
    assert!(is_empty(&root));
}

#[tokio::test]
async fn detached_spawn_confirms_on_stdout_and_cleans_up_later() {
    let root = TempDir::new().unwrap();
    let sleeper = Arc::new(NoSleep::default());
    let runner = SlowElevation {
        sleeper: sleeper.clone(),
        status: "0\r\n",
        delay_polls: 5,
    };
    let options = Options::new().spawn(SpawnOptions {
        detached: true,
        ..SpawnOptions::default()
    });
    let outcome = elevator(&root, runner, sleeper)
        .spawn(&inv(options))
        .await
        .unwrap();
    assert!(matches!(outcome, SpawnOutcome::Detached { pid: None }));

    for _ in 0..1000 {
        if is_empty(&root) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("workspace was not removed");
}
