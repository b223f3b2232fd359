//! Property-based tests for sudoprompt
//!
//! **WHITE-BOX TEST**: uses the escaping functions and the command builder
//! directly and may break with internal refactors.
//!
//! Covered invariants:
//! - display-name validation accepts exactly `[A-Za-z0-9 ]{1,70}`
//! - escaping leaves no unescaped metacharacter behind
//! - operator joining puts exactly one space around the operator
//! - the POSIX script always starts with the marker echo
//!
//! Case counts follow `PROPTEST_CASES` (default 64).

use proptest::prelude::*;
use std::env;

use sudoprompt::runner::builder::{build_posix_script, build_windows_command_script};
use sudoprompt::types::HostPlatform;
use sudoprompt::validation::{
    escape_cmd_value, escape_double_quotes, escape_powershell_single_quoted, is_valid_display_name,
    is_valid_env_key,
};
use sudoprompt::{CommandLine, EnvContext, Invocation, Operator, Options};

const DEFAULT_PROPTEST_CASES: u32 = 64;

fn proptest_config() -> ProptestConfig {
    let cases = env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_PROPTEST_CASES);
    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}

/// Strip escapes left to right; true when every `target` char was preceded by `escape`.
fn all_escaped(escaped: &str, escape: char, targets: &[char]) -> bool {
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == escape {
            if chars.next().is_none() {
                return false;
            }
        } else if targets.contains(&c) {
            return false;
        }
    }
    true
}

fn operator() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::Sequential),
        Just(Operator::And),
        Just(Operator::Or)
    ]
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn prop_valid_names_are_accepted(name in "[A-Za-z0-9 ]{1,70}") {
        prop_assert!(is_valid_display_name(&name));
    }

    #[test]
    fn prop_names_over_70_are_rejected(name in "[A-Za-z0-9 ]{71,120}") {
        prop_assert!(!is_valid_display_name(&name));
    }

    #[test]
    fn prop_names_with_other_chars_are_rejected(
        prefix in "[A-Za-z0-9]{0,10}",
        bad in "[-!@#$%^&*()_+=/\\\\.,;:'\"<>?]",
    ) {
        let name = format!("{prefix}{bad}");
        prop_assert!(!is_valid_display_name(&name));
    }

    #[test]
    fn prop_env_keys(key in "[A-Za-z_][A-Za-z0-9_]{0,20}") {
        prop_assert!(is_valid_env_key(&key));
    }

    #[test]
    fn prop_env_keys_starting_with_digit_rejected(key in "[0-9][A-Za-z0-9_]{0,20}") {
        prop_assert!(!is_valid_env_key(&key));
    }

    #[test]
    fn prop_double_quote_escaping(input in ".{0,64}") {
        let escaped = escape_double_quotes(&input);
        prop_assert_eq!(escaped.replace("\\\"", "\""), input.clone());
        prop_assert_eq!(escaped.len(), input.len() + input.matches('"').count());
    }

    #[test]
    fn prop_cmd_value_escaping(input in ".{0,64}") {
        let escaped = escape_cmd_value(&input);
        prop_assert!(all_escaped(&escaped, '^', &['<', '>', '\\', '|', '&']));
    }

    #[test]
    fn prop_powershell_quotes_are_doubled(input in ".{0,64}") {
        let escaped = escape_powershell_single_quoted(&input);
        prop_assert_eq!(escaped.replace("''", "'"), input.clone());
        prop_assert_eq!(escaped.matches('\'').count(), 2 * input.matches('\'').count());
    }

    #[test]
    fn prop_operator_join_spacing(
        parts in prop::collection::vec("[a-z]{1,8}", 1..6),
        op in operator(),
    ) {
        let joined = CommandLine::from(parts.clone()).joined(op);
        let separator = format!(" {} ", op.as_str());
        let split: Vec<&str> = joined.split(separator.as_str()).collect();
        prop_assert_eq!(split, parts.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn prop_posix_script_starts_with_marker(
        command in "[a-r][a-z ]{0,30}",
        value in ".{0,30}",
    ) {
        let inv = Invocation::with_process_title(
            command.as_str(),
            Options::new().name("Prop Test").env_var("VALUE", value.replace(['\r', '\n'], "")),
            None,
        )
        .unwrap();
        let ctx = EnvContext::new("/tmp", HostPlatform::Linux, "/tmp");
        let script = build_posix_script(&inv, &ctx);
        prop_assert!(script.starts_with("echo SUDOPROMPT; cd \"/tmp\"; export VALUE=\""));
        prop_assert!(script.ends_with(command.as_str()));
    }

    #[test]
    fn prop_windows_script_lines_are_crlf(command in "[a-r][a-z ]{0,30}") {
        let inv = Invocation::with_process_title(command.as_str(), Options::new().name("Prop Test"), None)
            .unwrap();
        let ctx = EnvContext::new(r"C:\work", HostPlatform::Windows, r"C:\Temp");
        let script = build_windows_command_script(&inv, &ctx).unwrap();
        prop_assert!(!script.replace("\r\n", "").contains('\n'));
        prop_assert!(script.starts_with("@echo off\r\nchcp 65001>nul\r\n"));
    }
}
