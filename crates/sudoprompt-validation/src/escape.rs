//! Quote escaping for the shell dialects the strategies generate.
//!
//! Every function here is one-shot: escaping an already escaped string adds
//! another layer. Apply exactly once, at the point where the value is
//! interpolated.

/// Backslash-escape every `"` so `s` can sit inside a double-quoted POSIX shell word.
///
/// ```rust
/// use sudoprompt_validation::escape_double_quotes;
///
/// assert_eq!(escape_double_quotes(r#"say "hi""#), r#"say \"hi\""#);
/// ```
#[must_use]
pub fn escape_double_quotes(s: &str) -> String {
    s.replace('"', "\\\"")
}

/// Caret-escape the characters `cmd.exe` treats specially in a `set` value.
///
/// `set NAME=value` assigns everything after `=` literally, quotes included, so
/// the value cannot be quoted; `< > \ | & ^` are prefixed with `^` instead.
#[must_use]
pub fn escape_cmd_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '<' | '>' | '\\' | '|' | '&' | '^') {
            out.push('^');
        }
        out.push(c);
    }
    out
}

/// Double every `'` for a PowerShell single-quoted string literal.
#[must_use]
pub fn escape_powershell_single_quoted(s: &str) -> String {
    s.replace('\'', "''")
}

/// Escape `\` and `"` for an AppleScript double-quoted string literal.
#[must_use]
pub fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_double_quotes() {
        assert_eq!(escape_double_quotes("plain"), "plain");
        assert_eq!(escape_double_quotes(r#"a"b"#), r#"a\"b"#);
        assert_eq!(escape_double_quotes(r#""""#), r#"\"\""#);
    }

    #[test]
    fn test_escape_double_quotes_is_not_idempotent() {
        let once = escape_double_quotes(r#"x"y"#);
        let twice = escape_double_quotes(&once);
        assert_ne!(once, twice);
        assert_eq!(twice, r#"x\\"y"#);
    }

    #[test]
    fn test_escape_double_quotes_leaves_other_metacharacters() {
        assert_eq!(escape_double_quotes("$HOME `id`"), "$HOME `id`");
    }

    #[test]
    fn test_escape_cmd_value() {
        assert_eq!(escape_cmd_value("a&b"), "a^&b");
        assert_eq!(escape_cmd_value("<>|^"), "^<^>^|^^");
        assert_eq!(escape_cmd_value(r"C:\dir"), r"C:^\dir");
        assert_eq!(escape_cmd_value("hello world"), "hello world");
    }

    #[test]
    fn test_escape_powershell_single_quoted() {
        assert_eq!(
            escape_powershell_single_quoted(r"C:\Users\o'brien\x.bat"),
            r"C:\Users\o''brien\x.bat"
        );
    }

    #[test]
    fn test_escape_applescript() {
        assert_eq!(escape_applescript(r#"echo "a\b""#), r#"echo \"a\\b\""#);
    }

    /// AppleScript's own reading of a backslash escape.
    fn unescape_applescript(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                out.extend(chars.next());
            } else {
                out.push(c);
            }
        }
        out
    }

    proptest::proptest! {
        #[test]
        fn prop_applescript_escape_is_reversible(input in ".{0,64}") {
            let escaped = escape_applescript(&input);
            proptest::prop_assert_eq!(unescape_applescript(&escaped), input);
        }

        #[test]
        fn prop_cmd_escape_only_adds_carets(input in ".{0,64}") {
            let escaped = escape_cmd_value(&input);
            let added = input.chars().filter(|c| "<>\\|&^".contains(*c)).count();
            proptest::prop_assert_eq!(escaped.chars().count(), input.chars().count() + added);
        }
    }
}
