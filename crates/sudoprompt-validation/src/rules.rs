//! Validation rules for display names and environment entries

use regex::Regex;
use std::sync::LazyLock;
use sudoprompt_utils::error::ValidationError;

/// Longest accepted display name.
///
/// Kept well below filesystem name limits so Unicode normalization of the
/// name can never push a derived path over 255 bytes.
pub const MAX_NAME_LEN: usize = 70;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9 ]+$").expect("valid name regex"));

// POSIX portable environment variable names
static ENV_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid env key regex"));

/// True if `name` can be shown in a native consent dialog.
///
/// ```rust
/// use sudoprompt_validation::is_valid_display_name;
///
/// assert!(is_valid_display_name("Disk Utility 2"));
/// assert!(!is_valid_display_name("rm -rf"));
/// assert!(!is_valid_display_name("   "));
/// ```
#[must_use]
pub fn is_valid_display_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name) && !name.trim().is_empty() && name.len() <= MAX_NAME_LEN
}

#[must_use]
pub fn is_valid_env_key(key: &str) -> bool {
    ENV_KEY_PATTERN.is_match(key)
}

/// Check one environment override.
///
/// Values may not contain CR or LF: each entry becomes one line of a generated
/// script, and a line break would start a new command.
pub fn validate_env_entry(key: &str, value: &str) -> Result<(), ValidationError> {
    if !is_valid_env_key(key) {
        return Err(ValidationError::InvalidEnvName {
            key: key.to_string(),
        });
    }
    if value.contains(['\r', '\n']) {
        return Err(ValidationError::InvalidEnvValue {
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_display_names() {
        assert!(is_valid_display_name("Electron"));
        assert!(is_valid_display_name("My App 2"));
        assert!(is_valid_display_name(" padded "));
        assert!(is_valid_display_name(&"a".repeat(70)));
    }

    #[test]
    fn test_invalid_display_names() {
        assert!(!is_valid_display_name(""));
        assert!(!is_valid_display_name("   "));
        assert!(!is_valid_display_name(&"a".repeat(71)));
        assert!(!is_valid_display_name("my-app"));
        assert!(!is_valid_display_name("app\"; rm"));
        assert!(!is_valid_display_name("caf\u{e9}"));
        assert!(!is_valid_display_name("tab\there"));
    }

    #[test]
    fn test_env_keys() {
        assert!(is_valid_env_key("FOO"));
        assert!(is_valid_env_key("_private"));
        assert!(is_valid_env_key("a1_B2"));
        assert!(!is_valid_env_key("1FOO"));
        assert!(!is_valid_env_key("FOO-BAR"));
        assert!(!is_valid_env_key(""));
        assert!(!is_valid_env_key("FOO BAR"));
    }

    #[test]
    fn test_env_values_reject_line_breaks() {
        assert!(validate_env_entry("FOO", "bar").is_ok());
        assert!(validate_env_entry("FOO", "").is_ok());
        assert!(validate_env_entry("FOO", "with \"quotes\" & $vars").is_ok());
        assert_eq!(
            validate_env_entry("FOO", "a\nb"),
            Err(ValidationError::InvalidEnvValue {
                value: "a\nb".to_string()
            })
        );
        assert!(validate_env_entry("FOO", "a\rb").is_err());
    }

    #[test]
    fn test_env_key_checked_before_value() {
        assert_eq!(
            validate_env_entry("9X", "a\nb"),
            Err(ValidationError::InvalidEnvName {
                key: "9X".to_string()
            })
        );
    }
}
