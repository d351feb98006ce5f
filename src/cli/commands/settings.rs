//! `vaultbridge settings`: show the effective configuration.

use toml::Value;

use crate::cli::output::{self, SettingRow};
use crate::cli::{prepare, Cli};
use crate::config::settings::{KNOWN_KEYS, PASSWORD};
use crate::config::{LayeredSettings, SettingsProvider, ToolSettings};
use crate::errors::{Result, VaultBridgeError};
use crate::vault::command::tool_program;
use crate::vault::{resolve, CredentialMode, Resolution};

/// Shown instead of a configured password.
const REDACTED: &str = "********";

/// Execute the `settings` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = prepare(cli)?;
    let rows = collect_rows(&settings);
    let tool = ToolSettings::from_provider(&settings)?;
    let credential = describe_credential(&resolve(&settings)?);
    let program = tool_program(&tool.ansible_path).display().to_string();

    if cli.json {
        let json = serde_json::json!({
            "settings": rows
                .iter()
                .map(|r| serde_json::json!({ "key": r.key, "value": r.value, "source": r.source }))
                .collect::<Vec<_>>(),
            "credential": credential,
            "program": program,
        });
        let text = serde_json::to_string_pretty(&json)
            .map_err(|e| VaultBridgeError::Serialization(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    output::print_settings_table(&rows);
    output::info(&format!("Credential: {credential}"));
    output::info(&format!("Vault tool: {program}"));
    Ok(())
}

fn collect_rows(settings: &LayeredSettings) -> Vec<SettingRow> {
    KNOWN_KEYS
        .iter()
        .map(|&key| SettingRow {
            key,
            value: settings.lookup(key).map(|v| display_value(key, v)),
            source: settings.source_of(key),
        })
        .collect()
}

fn display_value(key: &str, value: &Value) -> String {
    match value {
        Value::String(s) if key == PASSWORD && !s.is_empty() => REDACTED.to_string(),
        Value::String(s) => format!("{s:?}"),
        other => other.to_string(),
    }
}

fn describe_credential(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Resolved(CredentialMode::PasswordFile(path)) => {
            format!("password file {}", path.display())
        }
        Resolution::Resolved(CredentialMode::InlinePassword(_)) => "configured password".into(),
        Resolution::Resolved(CredentialMode::NoPassword) => "none".into(),
        Resolution::PromptRequired => "prompt".into(),
    }
}
