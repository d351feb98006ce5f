//! Vault commands and the argument vectors built from them.
//!
//! Everything here ends up as separate argv entries for the vault tool.
//! Nothing is ever joined into a shell string, so file names with spaces,
//! quotes or `$` go through untouched.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use zeroize::Zeroizing;

use crate::config::ToolSettings;
use crate::errors::{Result, VaultBridgeError};
use crate::vault::credential::CredentialMode;

/// Executable name of the vault tool.
pub const VAULT_TOOL: &str = "ansible-vault";

/// Makes the tool read the password from stdin.
pub const ASK_PASS_FLAG: &str = "--ask-vault-pass";

/// Points the tool at a password file. Takes the path as the next argument.
pub const PASSWORD_FILE_FLAG: &str = "--vault-password-file";

/// Target argument meaning "read the content from stdin".
pub const STDIN_TARGET: &str = "-";

/// Extra flags sending the result to stdout instead of rewriting the file.
const OUTPUT_TO_STDOUT: &str = "--output=-";

/// Vault tool sub-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subcommand {
    View,
    Decrypt,
    Encrypt,
}

impl Subcommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Subcommand::View => "view",
            Subcommand::Decrypt => "decrypt",
            Subcommand::Encrypt => "encrypt",
        }
    }

    /// Flags passed when the caller does not override them.
    pub fn default_extra_flags(self) -> &'static str {
        match self {
            Subcommand::View => "",
            Subcommand::Decrypt | Subcommand::Encrypt => OUTPUT_TO_STDOUT,
        }
    }

    /// `view` output goes to a separate read-only view; the others replace
    /// the buffer.
    pub fn opens_new_tab(self) -> bool {
        matches!(self, Subcommand::View)
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the vault tool operates on.
#[derive(Clone, PartialEq, Eq)]
pub enum Target {
    /// A file on disk, passed by path.
    File(PathBuf),
    /// Selected text, piped through stdin.
    Selection(Zeroizing<String>),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::File(path) => f.debug_tuple("File").field(path).finish(),
            Target::Selection(text) => write!(f, "Selection({} bytes)", text.len()),
        }
    }
}

/// One user action against the vault tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultCommand {
    subcommand: Subcommand,
    extra_flags: Vec<String>,
    target: Target,
}

impl VaultCommand {
    /// Command with the sub-command's default extra flags.
    pub fn new(subcommand: Subcommand, target: Target) -> Self {
        Self {
            subcommand,
            extra_flags: split_flags(subcommand.default_extra_flags()),
            target,
        }
    }

    pub fn file(subcommand: Subcommand, path: impl Into<PathBuf>) -> Self {
        Self::new(subcommand, Target::File(path.into()))
    }

    pub fn selection(subcommand: Subcommand, text: impl Into<String>) -> Self {
        Self::new(subcommand, Target::Selection(Zeroizing::new(text.into())))
    }

    /// Replace the extra flags. The string is split on whitespace; quotes
    /// are not interpreted.
    pub fn with_extra_flags(mut self, flags: &str) -> Self {
        self.extra_flags = split_flags(flags);
        self
    }

    pub fn subcommand(&self) -> Subcommand {
        self.subcommand
    }

    pub fn extra_flags(&self) -> &[String] {
        &self.extra_flags
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Title for the presented output: the file path, or a placeholder for
    /// selections.
    pub fn title(&self) -> String {
        match &self.target {
            Target::File(path) => path.display().to_string(),
            Target::Selection(_) => "selection".to_string(),
        }
    }
}

fn split_flags(flags: &str) -> Vec<String> {
    flags.split_whitespace().map(str::to_string).collect()
}

/// A fully built process launch: program, argv and stdin payload.
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Bytes for the child's stdin; `None` means stdin is closed.
    pub stdin: Option<Zeroizing<Vec<u8>>>,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("stdin_bytes", &self.stdin.as_ref().map(|s| s.len()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Path of the vault tool: `<ansible_path>/ansible-vault`, or the bare name
/// when no directory is configured.
pub fn tool_program(ansible_path: &str) -> PathBuf {
    if ansible_path.is_empty() {
        PathBuf::from(VAULT_TOOL)
    } else {
        Path::new(ansible_path).join(VAULT_TOOL)
    }
}

/// Build the argv and stdin for `command` under `mode`.
///
/// Layout: `<credential flag> <sub-command> <extra flags> <target>`.
/// A password file cannot be combined with a selection target; that is
/// rejected here, before anything is launched.
pub fn build_invocation(
    command: &VaultCommand,
    mode: &CredentialMode,
    tool: &ToolSettings,
) -> Result<Invocation> {
    let mut args: Vec<OsString> = Vec::new();
    let mut stdin = Zeroizing::new(Vec::new());

    match mode {
        CredentialMode::NoPassword => {}
        CredentialMode::InlinePassword(password) => {
            args.push(ASK_PASS_FLAG.into());
            stdin.extend_from_slice(password.as_bytes());
            stdin.push(b'\n');
        }
        CredentialMode::PasswordFile(path) => {
            if matches!(command.target, Target::Selection(_)) {
                return Err(VaultBridgeError::ConfigConflict(
                    "a vault password file cannot be used with a text selection; \
                     unset `password_file` or run on the whole file"
                        .into(),
                ));
            }
            args.push(PASSWORD_FILE_FLAG.into());
            args.push(path.clone().into_os_string());
        }
    }

    args.push(command.subcommand.as_str().into());
    args.extend(command.extra_flags.iter().map(OsString::from));

    match &command.target {
        Target::File(path) => args.push(path.clone().into_os_string()),
        Target::Selection(text) => {
            args.push(STDIN_TARGET.into());
            stdin.extend_from_slice(text.as_bytes());
        }
    }

    Ok(Invocation {
        program: tool_program(&tool.ansible_path),
        args,
        stdin: (!stdin.is_empty()).then_some(stdin),
        timeout: tool.timeout(),
    })
}
