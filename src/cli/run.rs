//! CLI entry point
//!
//! `run()` parses arguments, discovers configuration, builds the runtime and
//! prints every result or error itself. It only returns the exit code.

use clap::Parser;
use std::collections::BTreeMap;
use tracing::debug;

use super::args::Cli;
use super::output::{self, ConfigEntry, DryRunReport, RunReport};

use crate::logging::init_tracing;
use crate::{
    CliArgs, CommandLine, Config, ConfigError, ElevationError, Elevator, ExecOutput, ExitCode,
    Options, SpawnOptions, SpawnOutcome, StdioMode, StreamEvent, SudoPromptError,
};

/// Main CLI execution function.
///
/// Returns `Ok(())` when the elevated command succeeded, otherwise the exit
/// code to terminate with. All output is printed here.
pub fn run() -> Result<(), ExitCode> {
    run_with(Cli::parse())
}

pub fn run_with(cli: Cli) -> Result<(), ExitCode> {
    // A subscriber installed by an embedding process is fine
    let _ = init_tracing(cli.verbose);

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        name: cli.name.clone(),
        operator: cli.operator,
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => return Err(report_error(&config_error(err), cli.json)),
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    rt.block_on(execute(cli, config))
}

/// Recover the typed configuration error from discovery's `anyhow` chain.
fn config_error(err: anyhow::Error) -> SudoPromptError {
    match err.downcast::<ConfigError>() {
        Ok(config) => SudoPromptError::Config(config),
        Err(other) => SudoPromptError::Config(ConfigError::InvalidFile(format!("{other:#}"))),
    }
}

fn report_error(err: &SudoPromptError, json: bool) -> ExitCode {
    if json {
        output::print_json(&serde_json::json!({
            "status": "error",
            "error": err.to_string(),
        }));
    } else {
        eprintln!("{}", err.display_for_user());
    }
    err.to_exit_code()
}

fn build_options(cli: &Cli, config: &Config) -> Options {
    let mut options = Options::new().operator(config.operator()).spawn(SpawnOptions {
        detached: cli.detach,
        stdio: StdioMode::Piped,
        keep_stdin_open: false,
    });
    if let Some(icon) = &cli.icon {
        options = options.icon(icon.clone());
    }
    if let Some(env) = cli.env_map() {
        options = options.env(env);
    }
    options
}

fn command_line(cli: &Cli) -> CommandLine {
    if cli.sequence {
        CommandLine::Sequence(cli.command.clone())
    } else {
        CommandLine::Single(cli.command.join(" "))
    }
}

async fn execute(cli: Cli, config: Config) -> Result<(), ExitCode> {
    let invocation = match crate::invocation(command_line(&cli), build_options(&cli, &config), &config) {
        Ok(invocation) => invocation,
        Err(err) => return Err(report_error(&err, cli.json)),
    };
    let elevator = match Elevator::new(&config) {
        Ok(elevator) => elevator,
        Err(err) => return Err(report_error(&err.into(), cli.json)),
    };

    debug!(
        strategy = %elevator.kind(),
        command = %invocation.joined_command(),
        dry_run = cli.dry_run,
        "Dispatching invocation"
    );

    if cli.dry_run {
        return dry_run(&elevator, &invocation, &config, cli.json).await;
    }

    if cli.spawn || cli.detach {
        return spawn(&elevator, &invocation, cli.json).await;
    }

    let result = elevator.exec(&invocation).await;
    finish(&elevator, result, cli.json)
}

async fn dry_run(
    elevator: &Elevator,
    invocation: &crate::Invocation,
    config: &Config,
    json: bool,
) -> Result<(), ExitCode> {
    let command = match elevator.describe(invocation).await {
        Ok(command) => command,
        Err(err) => return Err(report_error(&err.into(), json)),
    };

    let effective: BTreeMap<String, ConfigEntry> = config
        .effective_config()
        .into_iter()
        .map(|(key, (value, source))| (key, ConfigEntry { value, source }))
        .collect();

    if json {
        output::print_json(&DryRunReport {
            strategy: elevator.kind(),
            command,
            config: effective,
        });
    } else {
        println!("Strategy: {}", elevator.kind());
        println!("{command}");
        println!();
        println!("Effective configuration:");
        for (key, entry) in &effective {
            println!("  {key} = {} ({})", entry.value, entry.source);
        }
    }
    Ok(())
}

async fn spawn(
    elevator: &Elevator,
    invocation: &crate::Invocation,
    json: bool,
) -> Result<(), ExitCode> {
    let outcome = match elevator.spawn(invocation).await {
        Ok(outcome) => outcome,
        Err(err) => return finish(elevator, Err(err), json),
    };

    match outcome {
        SpawnOutcome::Detached { pid } => {
            if json {
                output::print_json(&RunReport::started(elevator.kind(), pid));
            } else {
                match pid {
                    Some(pid) => eprintln!("Elevated command started (pid {pid})"),
                    None => eprintln!("Elevated command started"),
                }
            }
            Ok(())
        }
        SpawnOutcome::Attached(child) if json => {
            let result = child.wait().await;
            finish(elevator, result, json)
        }
        SpawnOutcome::Attached(mut child) => {
            let mut code = None;
            while let Some(event) = child.next_event().await {
                match event {
                    StreamEvent::Stdout(text) => output::write_stdout(&text),
                    StreamEvent::Stderr(text) => output::write_stderr(&text),
                    StreamEvent::Exited(status) => {
                        code = Some(status);
                        break;
                    }
                    StreamEvent::Failed(err) => return Err(report_error(&err.into(), false)),
                }
            }
            match code {
                Some(0) => Ok(()),
                Some(status) => Err(ExitCode::from_command_status(status)),
                None => Err(report_error(
                    &ElevationError::internal("elevated command ended without an exit status").into(),
                    false,
                )),
            }
        }
    }
}

fn finish(
    elevator: &Elevator,
    result: Result<ExecOutput, ElevationError>,
    json: bool,
) -> Result<(), ExitCode> {
    if json {
        output::print_json(&RunReport::from_result(elevator.kind(), &result));
        return match result {
            Ok(_) => Ok(()),
            Err(err) => Err(err.to_exit_code()),
        };
    }

    match result {
        Ok(out) => {
            output::write_streams(&out.stdout, &out.stderr);
            Ok(())
        }
        Err(ElevationError::CommandFailed {
            code,
            stdout,
            stderr,
            ..
        }) => {
            output::write_streams(&stdout, &stderr);
            Err(ExitCode::from_command_status(code))
        }
        Err(err) => Err(report_error(&err.into(), false)),
    }
}
