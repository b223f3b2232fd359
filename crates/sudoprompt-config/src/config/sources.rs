use std::collections::HashMap;

use super::{Config, ConfigSource};

fn stable_source_label(source: &ConfigSource) -> &'static str {
    match source {
        ConfigSource::Cli => "cli",
        ConfigSource::Config => "config",
        ConfigSource::Programmatic => "programmatic",
        ConfigSource::Default => "default",
    }
}

fn source_label(source: Option<&ConfigSource>) -> String {
    stable_source_label(source.unwrap_or(&ConfigSource::Default)).to_string()
}

impl Config {
    /// Get effective configuration as key-value pairs with source attribution
    #[must_use]
    pub fn effective_config(&self) -> HashMap<String, (String, String)> {
        let mut config = HashMap::new();

        let mut add_config = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key));
            config.insert(key.to_string(), (value, source));
        };

        if let Some(name) = self.default_name() {
            add_config("name", name.to_string());
        }
        add_config("operator", self.operator().to_string());
        add_config("max_buffer_bytes", self.max_buffer_bytes().to_string());

        let binaries: Vec<String> = self
            .posix_binaries()
            .iter()
            .map(|b| b.display().to_string())
            .collect();
        add_config("posix_binaries", binaries.join(", "));

        add_config(
            "poll_interval_ms",
            self.poll_interval().as_millis().to_string(),
        );
        add_config(
            "stdout_grace_attempts",
            self.stdout_grace_attempts().to_string(),
        );
        add_config(
            "max_poll_attempts",
            self.max_poll_attempts()
                .map_or_else(|| "unbounded".to_string(), |n| n.to_string()),
        );
        if let Some(temp_dir) = self.temp_dir() {
            add_config("temp_dir", temp_dir.display().to_string());
        }

        add_config(
            "confirm_delay_ms",
            self.confirm_delay().as_millis().to_string(),
        );
        add_config("confirm_attempts", self.confirm_attempts().to_string());

        config
    }
}
