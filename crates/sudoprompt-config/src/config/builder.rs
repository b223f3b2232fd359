use std::path::PathBuf;
use std::time::Duration;

use sudoprompt_utils::error::ConfigError;
use sudoprompt_utils::types::Operator;

use super::{Config, ConfigSource};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding sudoprompt and config files should play no part.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sudoprompt_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .name("Disk Tool")
    ///     .poll_interval(Duration::from_millis(250))
    ///     .confirm_attempts(30)
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.confirm_attempts(), 30);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Fluent builder for [`Config`].
///
/// # Source Attribution
///
/// All values set via the builder are attributed to `ConfigSource::Programmatic`
/// in the resulting `Config`'s source attribution map; everything else keeps
/// `ConfigSource::Default`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
    set_keys: Vec<&'static str>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn mark(&mut self, key: &'static str) {
        if !self.set_keys.contains(&key) {
            self.set_keys.push(key);
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.defaults.name = Some(name.into());
        self.mark("name");
        self
    }

    #[must_use]
    pub fn operator(mut self, operator: Operator) -> Self {
        self.config.defaults.operator = Some(operator);
        self.mark("operator");
        self
    }

    #[must_use]
    pub fn max_buffer_bytes(mut self, bytes: usize) -> Self {
        self.config.defaults.max_buffer_bytes = Some(bytes);
        self.mark("max_buffer_bytes");
        self
    }

    /// Replace the list of candidate elevation binaries.
    #[must_use]
    pub fn posix_binaries<I, P>(mut self, binaries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config.posix.binaries = Some(binaries.into_iter().map(Into::into).collect());
        self.mark("posix_binaries");
        self
    }

    /// Set the status-file poll interval.
    ///
    /// Sub-millisecond precision is discarded.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.windows.poll_interval_ms = Some(duration_ms(interval));
        self.mark("poll_interval_ms");
        self
    }

    #[must_use]
    pub fn stdout_grace_attempts(mut self, attempts: u32) -> Self {
        self.config.windows.stdout_grace_attempts = Some(attempts);
        self.mark("stdout_grace_attempts");
        self
    }

    /// Set the ceiling on polls once the command is running. `0` removes it.
    #[must_use]
    pub fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.config.windows.max_poll_attempts = Some(attempts);
        self.mark("max_poll_attempts");
        self
    }

    #[must_use]
    pub fn temp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.windows.temp_dir = Some(path.into());
        self.mark("temp_dir");
        self
    }

    #[must_use]
    pub fn confirm_delay(mut self, delay: Duration) -> Self {
        self.config.spawn.confirm_delay_ms = Some(duration_ms(delay));
        self.mark("confirm_delay_ms");
        self
    }

    #[must_use]
    pub fn confirm_attempts(mut self, attempts: u32) -> Self {
        self.config.spawn.confirm_attempts = Some(attempts);
        self.mark("confirm_attempts");
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut config = self.config;
        for key in [
            "operator",
            "max_buffer_bytes",
            "posix_binaries",
            "poll_interval_ms",
            "stdout_grace_attempts",
            "max_poll_attempts",
            "confirm_delay_ms",
            "confirm_attempts",
        ] {
            config
                .source_attribution
                .insert(key.to_string(), ConfigSource::Default);
        }
        for key in self.set_keys {
            config
                .source_attribution
                .insert(key.to_string(), ConfigSource::Programmatic);
        }

        config.validate()?;
        Ok(config)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
