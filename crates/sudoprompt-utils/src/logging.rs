//! Logging and observability for sudoprompt
//!
//! Structured logging through `tracing`. Library crates only emit events;
//! the CLI installs the subscriber with [`init_tracing`].
//!
//! Environment variable values passed to an elevated command are never
//! logged, only their names.

use std::time::Duration;
use tracing::{Level, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the filter is `sudoprompt=info,warn`,
/// or `sudoprompt=debug,info` when `verbose` is set. Logs go to stderr so the
/// elevated command's stdout stays clean.
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("sudoprompt=debug,info")
            } else {
                EnvFilter::try_new("sudoprompt=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span covering one elevation attempt.
pub fn invocation_span(name: &str, strategy: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "elevation",
        name = %name,
        strategy = %strategy,
    )
}

/// Log the start of an elevation attempt with the names (not values) of exported variables.
pub fn log_invocation_start<'a>(strategy: &str, env_keys: impl Iterator<Item = &'a str>) {
    let keys: Vec<&str> = env_keys.collect();
    info!(
        strategy = %strategy,
        env_keys = %keys.join(","),
        "Requesting elevation"
    );
}

/// Log the terminal outcome of an elevation attempt.
pub fn log_invocation_outcome(outcome: &str, exit_code: Option<i32>, elapsed: Duration) {
    let duration_ms = elapsed.as_millis();
    match exit_code {
        Some(code) if code != 0 => warn!(
            outcome = %outcome,
            exit_code = code,
            duration_ms = %duration_ms,
            "Elevation finished"
        ),
        _ => info!(
            outcome = %outcome,
            duration_ms = %duration_ms,
            "Elevation finished"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_span_is_constructible_without_subscriber() {
        let span = invocation_span("My App", "posix-prompt");
        let _guard = span.enter();
        log_invocation_start("posix-prompt", ["FOO", "BAR"].into_iter());
        log_invocation_outcome("succeeded", Some(0), Duration::from_millis(5));
    }

    #[test]
    fn test_init_tracing_twice_errors_instead_of_panicking() {
        let first = init_tracing(false);
        let second = init_tracing(true);
        // Another test may already have installed a subscriber, so only the
        // second call is guaranteed to fail.
        let _ = first;
        assert!(second.is_err());
    }
}
