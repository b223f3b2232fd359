use std::ffi::OsString;
use tokio::process::Command as TokioCommand;

use sudoprompt_validation::escape_double_quotes;

// ============================================================================
// CommandSpec - argv-style elevation command
// ============================================================================

/// Argv description of a command to execute.
///
/// Every process sudoprompt starts goes through this type. Arguments are
/// passed as discrete elements, so the only shell that ever interprets caller
/// text is the one inside the elevated script, where quoting is handled by
/// the builder.
///
/// # Example
///
/// ```rust
/// use sudoprompt_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("/usr/bin/pkexec")
///     .arg("--disable-internal-agent")
///     .args(["/bin/bash", "-c", "echo SUDOPROMPT; id -u"]);
///
/// assert_eq!(cmd.program, OsString::from("/usr/bin/pkexec"));
/// assert_eq!(cmd.args.len(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements (NOT shell strings)
    pub args: Vec<OsString>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Convert this `CommandSpec` into a `tokio::process::Command`.
    ///
    /// Stdio is left at tokio's defaults; callers configure it for their mode.
    #[must_use]
    pub fn to_tokio_command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Render as one shell-ready line for logs and `--dry-run` output.
    ///
    /// Words made only of characters a POSIX shell never treats specially are
    /// printed bare; everything else is double quoted.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|word| render_word(&word.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn render_word(word: &str) -> String {
    let bare = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c));
    if bare {
        word.to_string()
    } else {
        format!("\"{}\"", escape_double_quotes(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_new() {
        let cmd = CommandSpec::new("osascript");
        assert_eq!(cmd.program, OsString::from("osascript"));
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn test_args_preserve_metacharacters_as_single_elements() {
        let cmd = CommandSpec::new("/bin/bash").args(["-c", "echo a; rm -rf $HOME && `id`"]);
        assert_eq!(cmd.args.len(), 2);
        assert_eq!(cmd.args[1], OsString::from("echo a; rm -rf $HOME && `id`"));
    }

    #[test]
    fn test_to_tokio_command_uses_argv() {
        let cmd = CommandSpec::new("echo").arg("a b");
        let tokio_cmd = cmd.to_tokio_command();
        let std_cmd = tokio_cmd.as_std();
        assert_eq!(std_cmd.get_program(), "echo");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(args, vec!["a b"]);
    }

    #[test]
    fn test_display_quotes_only_when_needed() {
        let cmd = CommandSpec::new("/usr/bin/pkexec")
            .arg("--disable-internal-agent")
            .args(["/bin/bash", "-c", r#"echo SUDOPROMPT; cd "/tmp""#]);
        assert_eq!(
            cmd.display(),
            r#"/usr/bin/pkexec --disable-internal-agent /bin/bash -c "echo SUDOPROMPT; cd \"/tmp\"""#
        );
    }

    #[test]
    fn test_display_quotes_empty_words() {
        assert_eq!(CommandSpec::new("x").arg("").display(), r#"x """#);
    }
}
