//! Password resolution: decides how the vault tool gets its secret.

use std::fmt;
use std::path::PathBuf;

use zeroize::Zeroizing;

use crate::config::settings::{PASSWORD, PASSWORD_FILE};
use crate::config::SettingsProvider;
use crate::errors::Result;

/// How the secret reaches the vault tool for one invocation.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialMode {
    /// No credential flag and nothing written for the secret.
    NoPassword,
    /// The password is written to the tool's stdin.
    InlinePassword(Zeroizing<String>),
    /// The tool reads the password from this file itself.
    PasswordFile(PathBuf),
}

impl CredentialMode {
    pub fn inline(password: impl Into<String>) -> Self {
        CredentialMode::InlinePassword(Zeroizing::new(password.into()))
    }

    /// Name for logs; never includes the secret.
    pub fn kind(&self) -> &'static str {
        match self {
            CredentialMode::NoPassword => "none",
            CredentialMode::InlinePassword(_) => "inline",
            CredentialMode::PasswordFile(_) => "password-file",
        }
    }
}

impl fmt::Debug for CredentialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialMode::NoPassword => f.write_str("NoPassword"),
            CredentialMode::InlinePassword(_) => f.write_str("InlinePassword(<redacted>)"),
            CredentialMode::PasswordFile(path) => {
                f.debug_tuple("PasswordFile").field(path).finish()
            }
        }
    }
}

/// Outcome of looking at the configured credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(CredentialMode),
    /// Nothing configured; the user has to be asked.
    PromptRequired,
}

/// Pick the credential mode from settings.
///
/// Order, first match wins:
/// 1. a non-empty `password_file`
/// 2. a non-empty `password`
/// 3. prompt the user
///
/// An empty string counts as unset, so an intentionally empty password
/// cannot be configured.
pub fn resolve(settings: &dyn SettingsProvider) -> Result<Resolution> {
    if let Some(path) = non_empty(settings.string(PASSWORD_FILE)?) {
        tracing::debug!(path = %path, "using vault password file");
        return Ok(Resolution::Resolved(CredentialMode::PasswordFile(
            PathBuf::from(path),
        )));
    }

    if let Some(password) = non_empty(settings.string(PASSWORD)?) {
        tracing::debug!("using configured vault password");
        return Ok(Resolution::Resolved(CredentialMode::inline(password)));
    }

    tracing::debug!("no vault password configured, prompt required");
    Ok(Resolution::PromptRequired)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayerSource, LayeredSettings, SettingsLayer};

    fn settings(toml: &str) -> LayeredSettings {
        LayeredSettings::from_layers(vec![
            SettingsLayer::parse(LayerSource::Project, toml).unwrap()
        ])
    }

    #[test]
    fn password_file_wins_over_password() {
        let s = settings("password_file = \"/tmp/pw\"\npassword = \"hunter2\"");
        assert_eq!(
            resolve(&s).unwrap(),
            Resolution::Resolved(CredentialMode::PasswordFile("/tmp/pw".into()))
        );
    }

    #[test]
    fn password_file_alone() {
        let s = settings("password_file = \"/etc/vault.pw\"");
        assert_eq!(
            resolve(&s).unwrap(),
            Resolution::Resolved(CredentialMode::PasswordFile("/etc/vault.pw".into()))
        );
    }

    #[test]
    fn empty_password_file_falls_through_to_password() {
        let s = settings("password_file = \"\"\npassword = \"hunter2\"");
        assert_eq!(
            resolve(&s).unwrap(),
            Resolution::Resolved(CredentialMode::inline("hunter2"))
        );
    }

    #[test]
    fn unset_password_file_uses_password() {
        let s = settings("password = \"hunter2\"");
        assert_eq!(
            resolve(&s).unwrap(),
            Resolution::Resolved(CredentialMode::inline("hunter2"))
        );
    }

    #[test]
    fn both_empty_requires_prompt() {
        let s = settings("password_file = \"\"\npassword = \"\"");
        assert_eq!(resolve(&s).unwrap(), Resolution::PromptRequired);
    }

    #[test]
    fn nothing_configured_requires_prompt() {
        assert_eq!(
            resolve(&LayeredSettings::default()).unwrap(),
            Resolution::PromptRequired
        );
    }

    #[test]
    fn debug_output_redacts_password() {
        let mode = CredentialMode::inline("super-secret");
        let printed = format!("{mode:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("redacted"));
    }
}
