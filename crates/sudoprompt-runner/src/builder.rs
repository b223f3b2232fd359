//! Command builder
//!
//! Pure functions that turn a validated [`Invocation`] plus an
//! [`EnvContext`] into the exact scripts and argv each strategy runs.
//! Caller text is escaped once here, at the point it is interpolated.

use std::path::Path;

use sudoprompt_utils::error::ElevationError;
use sudoprompt_utils::types::{CommandLine, Operator};
use sudoprompt_validation::{
    DisplayName, Invocation, escape_applescript, escape_cmd_value, escape_double_quotes,
    escape_powershell_single_quoted,
};

use crate::command_spec::CommandSpec;
use crate::context::EnvContext;
use crate::marker::MARKER_WORD;
use crate::workspace::TempWorkspace;

/// Shell the elevation binaries run the script with.
pub const POSIX_SHELL: &str = "/bin/bash";

#[must_use]
pub fn join_commands(command: &CommandLine, operator: Operator) -> String {
    command.joined(operator)
}

/// Flags a known elevation binary needs, chosen by the binary's path.
///
/// `kdesudo` gets a prompt comment and `-d` so the dialog hides the raw
/// command; `pkexec` gets `--disable-internal-agent` so it fails fast with no
/// graphical agent instead of prompting on a terminal nobody is watching.
#[must_use]
pub fn binary_flags(binary: &Path, name: &DisplayName) -> Vec<String> {
    let path = binary.to_string_lossy().to_ascii_lowercase();
    if path.contains("kdesudo") {
        vec![
            "--comment".to_string(),
            format!("{name} wants to make changes. Enter your password to allow this."),
            "-d".to_string(),
            "--".to_string(),
        ]
    } else if path.contains("pkexec") {
        vec!["--disable-internal-agent".to_string()]
    } else {
        Vec::new()
    }
}

/// Script run by the elevated shell: marker first, then cwd, env and the command.
///
/// The marker is echoed before anything that could fail so its presence
/// proves elevation happened. Directory and environment are applied inside the
/// elevated shell because pkexec resets both.
///
/// The cwd and env values only have `"` escaped, so `$`, backticks and `\`
/// in them are still expanded, as root, by the elevated shell. Callers must
/// pass trusted values.
#[must_use]
pub fn build_posix_script(invocation: &Invocation, ctx: &EnvContext) -> String {
    let mut parts = vec![
        format!("echo {MARKER_WORD}"),
        format!(
            "cd \"{}\"",
            escape_double_quotes(&ctx.cwd.to_string_lossy())
        ),
    ];
    for (key, value) in invocation.env().iter() {
        parts.push(format!("export {key}=\"{}\"", escape_double_quotes(value)));
    }
    parts.push(invocation.joined_command());
    parts.join("; ")
}

/// The argv for one POSIX elevation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosixCommand {
    argv: Vec<String>,
}

impl PosixCommand {
    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    #[must_use]
    pub fn to_command_spec(&self) -> CommandSpec {
        let (program, args) = self
            .argv
            .split_first()
            .map_or(("", &[][..]), |(p, a)| (p.as_str(), a));
        CommandSpec::new(program).args(args)
    }

    /// Single shell-ready line, for logs and dry runs.
    #[must_use]
    pub fn to_shell_string(&self) -> String {
        self.to_command_spec().display()
    }
}

#[must_use]
pub fn build_posix_command(binary: &Path, invocation: &Invocation, ctx: &EnvContext) -> PosixCommand {
    let mut argv = vec![binary.to_string_lossy().into_owned()];
    argv.extend(binary_flags(binary, invocation.name()));
    argv.push(POSIX_SHELL.to_string());
    argv.push("-c".to_string());
    argv.push(build_posix_script(invocation, ctx));
    PosixCommand { argv }
}

/// Contents of `command.bat`, CRLF-joined.
///
/// `chcp 65001` switches the console to UTF-8 and `cd /d` also changes drive.
pub fn build_windows_command_script(
    invocation: &Invocation,
    ctx: &EnvContext,
) -> Result<String, ElevationError> {
    let cwd = ctx.cwd.to_string_lossy();
    if cwd.contains('"') {
        return Err(ElevationError::internal(format!(
            "working directory {cwd} contains '\"'"
        )));
    }

    let mut lines = vec![
        "@echo off".to_string(),
        "chcp 65001>nul".to_string(),
        format!("cd /d \"{cwd}\""),
    ];
    for (key, value) in invocation.env().iter() {
        lines.push(format!("set {key}={}", escape_cmd_value(value)));
    }
    lines.push(invocation.joined_command());
    Ok(lines.join("\r\n"))
}

/// Contents of `execute.bat`: run `command.bat` with redirected output, then record the status.
#[must_use]
pub fn build_windows_execute_script(workspace: &TempWorkspace) -> String {
    [
        "@echo off".to_string(),
        format!(
            "call \"{}\" > \"{}\" 2> \"{}\"",
            workspace.command_script().display(),
            workspace.stdout_path().display(),
            workspace.stderr_path().display()
        ),
        format!("(echo %ERRORLEVEL%) > \"{}\"", workspace.status_path().display()),
    ]
    .join("\r\n")
}

/// PowerShell call that asks UAC to run `execute.bat` hidden.
#[must_use]
pub fn build_windows_elevate_command(workspace: &TempWorkspace) -> CommandSpec {
    let script = escape_powershell_single_quoted(&workspace.execute_script().to_string_lossy());
    CommandSpec::new("powershell.exe").args([
        "-NoProfile".to_string(),
        "-NonInteractive".to_string(),
        "-Command".to_string(),
        format!("Start-Process -FilePath '{script}' -WindowStyle hidden -Verb runAs"),
    ])
}

/// `osascript` call that runs the POSIX script through the administrator dialog.
#[must_use]
pub fn build_mac_command(invocation: &Invocation, ctx: &EnvContext) -> CommandSpec {
    let script = escape_applescript(&build_posix_script(invocation, ctx));
    let prompt = escape_applescript(&format!("{} wants to make changes.", invocation.name()));
    CommandSpec::new("/usr/bin/osascript").args([
        "-e".to_string(),
        format!(
            "do shell script \"{script}\" with prompt \"{prompt}\" with administrator privileges without altering line endings"
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use sudoprompt_utils::types::HostPlatform;
    use sudoprompt_validation::Options;

    fn ctx() -> EnvContext {
        EnvContext::new("/home/u/my dir", HostPlatform::Linux, "/tmp")
    }

    fn invocation(command: &str, options: Options) -> Invocation {
        Invocation::with_process_title(command, options.name("Test App"), None).unwrap()
    }

    #[test]
    fn test_join_commands() {
        let seq = CommandLine::from(vec!["a", "b", "c"]);
        assert_eq!(join_commands(&seq, Operator::Sequential), "a ; b ; c");
        assert_eq!(join_commands(&seq, Operator::Or), "a || b || c");
        assert_eq!(
            join_commands(&CommandLine::from("x; y"), Operator::And),
            "x; y"
        );
    }

    #[test]
    fn test_binary_flags_follow_binary_name() {
        let name = DisplayName::parse("Test App").unwrap();
        assert_eq!(
            binary_flags(Path::new("/usr/bin/kdesudo"), &name),
            vec![
                "--comment",
                "Test App wants to make changes. Enter your password to allow this.",
                "-d",
                "--"
            ]
        );
        assert_eq!(
            binary_flags(Path::new("/opt/local/bin/pkexec"), &name),
            vec!["--disable-internal-agent"]
        );
        assert!(binary_flags(Path::new("/usr/bin/env"), &name).is_empty());
    }

    #[test]
    fn test_posix_script_order_and_quoting() {
        let inv = invocation(
            r#"echo "hi""#,
            Options::new().env_var("B", r#"say "x""#).env_var("A", "1"),
        );
        assert_eq!(
            build_posix_script(&inv, &ctx()),
            r#"echo SUDOPROMPT; cd "/home/u/my dir"; export A="1"; export B="say \"x\""; echo "hi""#
        );
    }

    #[test]
    fn test_posix_script_leaves_expansions_to_the_elevated_shell() {
        let inv = invocation("true", Options::new().env_var("P", "$HOME/`id -u`"));
        let script = build_posix_script(&inv, &ctx());
        assert!(script.contains(r#"export P="$HOME/`id -u`";"#));
    }

    #[test]
    fn test_posix_command_argv() {
        let inv = invocation("id -u", Options::new());
        let cmd = build_posix_command(Path::new("/usr/bin/pkexec"), &inv, &ctx());
        assert_eq!(
            cmd.argv(),
            &[
                "/usr/bin/pkexec",
                "--disable-internal-agent",
                "/bin/bash",
                "-c",
                r#"echo SUDOPROMPT; cd "/home/u/my dir"; id -u"#
            ]
        );
        let spec = cmd.to_command_spec();
        assert_eq!(spec.program, "/usr/bin/pkexec");
        assert_eq!(spec.args.len(), 4);
        assert!(cmd.to_shell_string().starts_with("/usr/bin/pkexec --disable-internal-agent /bin/bash -c \"echo SUDOPROMPT;"));
    }

    #[test]
    fn test_windows_command_script() {
        let ctx = EnvContext::new(r"C:\Users\me", HostPlatform::Windows, r"C:\Temp");
        let inv = invocation("dir", Options::new().env_var("K", "a&b|c"));
        assert_eq!(
            build_windows_command_script(&inv, &ctx).unwrap(),
            "@echo off\r\nchcp 65001>nul\r\ncd /d \"C:\\Users\\me\"\r\nset K=a^&b^|c\r\ndir"
        );
    }

    #[test]
    fn test_windows_command_script_rejects_quoted_cwd() {
        let ctx = EnvContext::new("C:\\a\"b", HostPlatform::Windows, r"C:\Temp");
        let inv = invocation("dir", Options::new());
        assert!(matches!(
            build_windows_command_script(&inv, &ctx),
            Err(ElevationError::Internal { .. })
        ));
    }

    #[tokio::test]
    async fn test_windows_execute_and_elevate() {
        let root = tempfile::TempDir::new().unwrap();
        let ws = TempWorkspace::create(root.path(), "Test App", "dir").await.unwrap();
        let execute = build_windows_execute_script(&ws);
        let lines: Vec<&str> = execute.split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "@echo off");
        assert!(lines[1].starts_with("call \""));
        assert!(lines[1].contains("command.bat\" > \""));
        assert!(lines[2].starts_with("(echo %ERRORLEVEL%) > \""));

        let elevate = build_windows_elevate_command(&ws);
        assert_eq!(elevate.program, "powershell.exe");
        let last = elevate.args.last().unwrap().to_string_lossy().into_owned();
        assert!(last.starts_with("Start-Process -FilePath '"));
        assert!(last.ends_with("execute.bat' -WindowStyle hidden -Verb runAs"));
        ws.remove().await.unwrap();
    }

    #[test]
    fn test_mac_command() {
        let inv = invocation(r#"echo "a""#, Options::new());
        let ctx = EnvContext::new("/Users/me", HostPlatform::Macos, "/tmp");
        let cmd = build_mac_command(&inv, &ctx);
        assert_eq!(cmd.program, "/usr/bin/osascript");
        assert_eq!(cmd.args[0], "-e");
        assert_eq!(
            cmd.args[1],
            r#"do shell script "echo SUDOPROMPT; cd \"/Users/me\"; echo \"a\"" with prompt "Test App wants to make changes." with administrator privileges without altering line endings"#
        );
    }
}
