use sudoprompt_utils::error::ConfigError;
use sudoprompt_validation::is_valid_display_name;

use super::Config;

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = &self.defaults.name
            && !is_valid_display_name(name)
        {
            return Err(invalid(
                "name",
                "must be 1-70 letters, digits or spaces and not blank",
            ));
        }

        if self.defaults.max_buffer_bytes == Some(0) {
            return Err(invalid("max_buffer_bytes", "must be greater than 0"));
        }

        if let Some(binaries) = &self.posix.binaries {
            if binaries.is_empty() {
                return Err(invalid("posix_binaries", "must list at least one binary"));
            }
            if let Some(relative) = binaries.iter().find(|b| !b.is_absolute()) {
                return Err(invalid(
                    "posix_binaries",
                    &format!("'{}' is not an absolute path", relative.display()),
                ));
            }
        }

        if let Some(interval) = self.windows.poll_interval_ms {
            if interval < 10 {
                return Err(invalid("poll_interval_ms", "must be at least 10 ms"));
            }
            if interval > 60_000 {
                return Err(invalid(
                    "poll_interval_ms",
                    "exceeds maximum limit of 60000 ms",
                ));
            }
        }

        if self.windows.stdout_grace_attempts == Some(0) {
            return Err(invalid("stdout_grace_attempts", "must be greater than 0"));
        }

        if let Some(temp_dir) = &self.windows.temp_dir {
            let text = temp_dir.to_string_lossy();
            if text.trim().is_empty() {
                return Err(invalid("temp_dir", "must not be empty"));
            }
            // Paths are embedded in double-quoted batch script lines.
            if text.contains('"') {
                return Err(invalid("temp_dir", "must not contain '\"'"));
            }
        }

        if let Some(delay) = self.spawn.confirm_delay_ms
            && delay > 60_000
        {
            return Err(invalid(
                "confirm_delay_ms",
                "exceeds maximum limit of 60000 ms",
            ));
        }

        if self.spawn.confirm_attempts == Some(0) {
            return Err(invalid("confirm_attempts", "must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn key_of(result: Result<(), ConfigError>) -> String {
        match result {
            Err(ConfigError::InvalidValue { key, .. }) => key,
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_default_name() {
        let mut config = Config::default();
        config.defaults.name = Some("my-app".to_string());
        assert_eq!(key_of(config.validate()), "name");
    }

    #[test]
    fn test_binaries_must_be_absolute_and_non_empty() {
        let mut config = Config::default();
        config.posix.binaries = Some(vec![]);
        assert_eq!(key_of(config.validate()), "posix_binaries");

        config.posix.binaries = Some(vec![PathBuf::from("pkexec")]);
        assert_eq!(key_of(config.validate()), "posix_binaries");
    }

    #[test]
    fn test_poll_interval_bounds() {
        let mut config = Config::default();
        config.windows.poll_interval_ms = Some(5);
        assert_eq!(key_of(config.validate()), "poll_interval_ms");
        config.windows.poll_interval_ms = Some(60_001);
        assert_eq!(key_of(config.validate()), "poll_interval_ms");
        config.windows.poll_interval_ms = Some(10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_temp_dir_with_quote_rejected() {
        let mut config = Config::default();
        config.windows.temp_dir = Some(PathBuf::from("C:/a\"b"));
        assert_eq!(key_of(config.validate()), "temp_dir");
    }

    #[test]
    fn test_zero_counts_rejected() {
        let mut config = Config::default();
        config.windows.stdout_grace_attempts = Some(0);
        assert_eq!(key_of(config.validate()), "stdout_grace_attempts");

        let mut config = Config::default();
        config.defaults.max_buffer_bytes = Some(0);
        assert_eq!(key_of(config.validate()), "max_buffer_bytes");
    }
}
