//! Bounded waiting
//!
//! Both waits in sudoprompt (the Windows status poll and the spawn
//! confirmation loop) sleep through an injected [`Sleeper`] and count
//! attempts explicitly, so tests can drive them without real time passing.

use async_trait::async_trait;
use std::time::Duration;

use sudoprompt_config::Config;

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeping on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Timing of the Windows status-file poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Consecutive polls without a stdout sidecar before giving up as denied.
    pub stdout_grace_attempts: u32,
    /// Total polls allowed once the command is known to be running.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            stdout_grace_attempts: config.stdout_grace_attempts(),
            max_attempts: config.max_poll_attempts(),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Timing of the spawn confirmation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPolicy {
    pub delay: Duration,
    pub attempts: u32,
}

impl ConfirmPolicy {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            delay: config.confirm_delay(),
            attempts: config.confirm_attempts(),
        }
    }

    /// Total time the loop sleeps before giving up.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.delay.saturating_mul(self.attempts)
    }
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What to do after one poll sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Check the status file again.
    Continue,
    /// The stdout sidecar never appeared: the prompt was refused.
    Denied,
    /// The command is running but the attempt ceiling was reached.
    TimedOut,
}

/// State of the handshake between the status check and the next sleep.
///
/// ```text
/// Waiting --stdout seen--> Running --attempts == max--> TimedOut
///    |
///    +--grace misses exhausted--> Denied
/// ```
#[derive(Debug, Clone)]
pub struct HandshakePoll {
    policy: PollPolicy,
    attempts: u32,
    misses: u32,
    confirmed: bool,
}

impl HandshakePoll {
    #[must_use]
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            misses: 0,
            confirmed: false,
        }
    }

    #[must_use]
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// True once the stdout sidecar has been seen or the status file completed.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn confirm(&mut self) {
        self.confirmed = true;
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Time spent sleeping so far.
    #[must_use]
    pub fn waited(&self) -> Duration {
        self.policy.interval.saturating_mul(self.attempts)
    }

    /// Record one sleep and whether the stdout sidecar exists afterwards.
    pub fn after_sleep(&mut self, stdout_exists: bool) -> PollDecision {
        self.attempts = self.attempts.saturating_add(1);

        if stdout_exists {
            self.confirmed = true;
        }

        if !self.confirmed {
            self.misses += 1;
            if self.misses >= self.policy.stdout_grace_attempts {
                return PollDecision::Denied;
            }
            return PollDecision::Continue;
        }

        match self.policy.max_attempts {
            Some(max) if self.attempts >= max => PollDecision::TimedOut,
            _ => PollDecision::Continue,
        }
    }
}
