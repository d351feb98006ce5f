//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;
pub mod present;

use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::settings::{ANSIBLE_PATH, DEBUG, PASSWORD, PASSWORD_FILE, TIMEOUT_SECS};
use crate::config::{default_config_dir, LayerSource, LayeredSettings, SettingsLayer, ToolSettings};
use crate::errors::{Result, VaultBridgeError};
use crate::vault::{Session, Started, Subcommand, Target, VaultCommand};

use present::{PresentMode, TerminalPresenter};

/// Environment variable holding an inline vault password (CI, editor hosts).
pub const PASSWORD_ENV: &str = "VAULTBRIDGE_PASSWORD";

/// VaultBridge CLI: view, decrypt and encrypt vault files for editors.
#[derive(Parser)]
#[command(
    name = "vaultbridge",
    about = "Editor bridge for ansible-vault encrypted files",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project directory holding `.vaultbridge.toml` (default: current dir)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Directory with global and platform settings files
    #[arg(long, env = "VAULTBRIDGE_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Vault password file (overrides settings)
    #[arg(long, global = true)]
    pub password_file: Option<String>,

    /// Directory containing the ansible-vault executable
    #[arg(long, global = true)]
    pub ansible_path: Option<String>,

    /// Kill the vault tool after this many seconds (0 = never)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Replace the sub-command's default extra flags (e.g. "--output=-")
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub extra_flags: Option<String>,

    /// Print results as a JSON object for editor integrations
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Show a vault file's decrypted content without changing it
    View {
        /// Encrypted file
        file: PathBuf,
    },

    /// Decrypt a vault file or a selection read from stdin
    Decrypt {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Encrypt a file or a selection read from stdin
    Encrypt {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show the effective settings and where each comes from
    Settings,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Target selection shared by `decrypt` and `encrypt`.
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// File to operate on
    #[arg(required_unless_present = "selection", conflicts_with = "selection")]
    pub file: Option<PathBuf>,

    /// Read the selected text from stdin instead of a file
    #[arg(long)]
    pub selection: bool,

    /// Write the result back into the file instead of printing it
    #[arg(long, conflicts_with = "selection")]
    pub in_place: bool,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Settings given on the command line or through `VAULTBRIDGE_PASSWORD`.
pub fn command_line_layer(cli: &Cli) -> SettingsLayer {
    let mut layer = SettingsLayer::empty(LayerSource::CommandLine);

    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            layer.set(PASSWORD, pw);
        }
    }
    if let Some(path) = &cli.password_file {
        layer.set(PASSWORD_FILE, path.as_str());
    }
    if let Some(dir) = &cli.ansible_path {
        layer.set(ANSIBLE_PATH, dir.as_str());
    }
    if let Some(secs) = cli.timeout {
        layer.set(TIMEOUT_SECS, i64::try_from(secs).unwrap_or(i64::MAX));
    }
    if cli.debug {
        layer.set(DEBUG, true);
    }

    layer
}

/// Load all settings layers and start logging according to `debug`.
pub fn prepare(cli: &Cli) -> Result<LayeredSettings> {
    let project_dir = match &cli.project {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let config_dir = cli.config_dir.clone().or_else(default_config_dir);

    let settings =
        LayeredSettings::load(&project_dir, config_dir.as_deref(), command_line_layer(cli))?;

    let tool = ToolSettings::from_provider(&settings)?;
    crate::logging::init(tool.debug);
    tracing::debug!(project = %project_dir.display(), "settings loaded");

    Ok(settings)
}

/// Ask for the vault password.
///
/// Returns `None` when the user backs out or no terminal is available.
pub fn prompt_password(title: &str) -> Result<Option<Zeroizing<String>>> {
    let result = dialoguer::Password::new()
        .with_prompt(format!("Vault password for {title}"))
        .allow_empty_password(true)
        .interact();

    match result {
        Ok(pw) => Ok(Some(Zeroizing::new(pw))),
        Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
        Err(e) => {
            output::warning(&format!("Cannot prompt for a password: {e}"));
            output::tip(&format!(
                "Set `password_file` in {} or export {PASSWORD_ENV}.",
                crate::config::settings::PROJECT_FILE_NAME
            ));
            Ok(None)
        }
    }
}

/// Read the selected text from stdin.
pub fn read_selection() -> Result<String> {
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    Ok(text)
}

/// Build the vault command for `subcommand` from target arguments.
pub fn build_command(
    cli: &Cli,
    subcommand: Subcommand,
    target: &TargetArgs,
) -> Result<VaultCommand> {
    let command = match (&target.file, target.selection) {
        (_, true) => VaultCommand::selection(subcommand, read_selection()?),
        (Some(file), false) => VaultCommand::file(subcommand, file.clone()),
        (None, false) => {
            return Err(VaultBridgeError::CommandFailed(
                "no file given, pass a path or --selection".into(),
            ))
        }
    };

    Ok(match &cli.extra_flags {
        Some(flags) => command.with_extra_flags(flags),
        None => command,
    })
}

/// Run one vault command end to end: settings, prompt if needed, present.
pub fn run_vault_command(cli: &Cli, command: VaultCommand, in_place: bool) -> Result<()> {
    let settings = prepare(cli)?;

    let mode = if cli.json {
        PresentMode::Json
    } else if in_place {
        match command.target() {
            Target::File(path) => PresentMode::InPlace(path.clone()),
            Target::Selection(_) => {
                return Err(VaultBridgeError::CommandFailed(
                    "--in-place needs a file, not a selection".into(),
                ))
            }
        }
    } else {
        PresentMode::Stdout
    };
    let mut presenter = TerminalPresenter::new(mode);

    let session = Session::new(settings);
    let started = session.start(command, &mut presenter)?;
    match started {
        Started::Finished(_) => Ok(()),
        Started::AwaitingPrompt(pending) => {
            let title = pending.command().title();
            match prompt_password(&title)? {
                Some(password) => pending.resume(password, &mut presenter).map(|_| ()),
                None => {
                    pending.cancel();
                    Ok(())
                }
            }
        }
    }
}
