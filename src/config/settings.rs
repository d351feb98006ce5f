use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use toml::{Table, Value};

use crate::errors::{Result, VaultBridgeError};

// ── Setting keys ─────────────────────────────────────────────────────

/// Inline vault password.
pub const PASSWORD: &str = "password";

/// Path to a vault password file.
pub const PASSWORD_FILE: &str = "password_file";

/// Enable debug logging.
pub const DEBUG: &str = "debug";

/// Directory holding the vault tool executable.
pub const ANSIBLE_PATH: &str = "ansible_path";

/// Upper bound on how long the vault tool may run, in seconds. 0 disables it.
pub const TIMEOUT_SECS: &str = "timeout_secs";

/// Every key we know about, in display order.
pub const KNOWN_KEYS: [&str; 5] = [PASSWORD, PASSWORD_FILE, DEBUG, ANSIBLE_PATH, TIMEOUT_SECS];

const DEFAULT_TIMEOUT_SECS: u64 = 120;

// ── Layers ───────────────────────────────────────────────────────────

/// Where a settings layer came from. Declared from highest to lowest
/// precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerSource {
    CommandLine,
    Project,
    Platform,
    Global,
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayerSource::CommandLine => "command line",
            LayerSource::Project => "project",
            LayerSource::Platform => "platform",
            LayerSource::Global => "global",
        };
        f.write_str(name)
    }
}

/// One TOML table of settings plus the place it was read from.
#[derive(Debug, Clone)]
pub struct SettingsLayer {
    source: LayerSource,
    table: Table,
}

impl SettingsLayer {
    /// A layer with no keys set.
    pub fn empty(source: LayerSource) -> Self {
        Self {
            source,
            table: Table::new(),
        }
    }

    /// Parse a layer from TOML text.
    pub fn parse(source: LayerSource, contents: &str) -> Result<Self> {
        let table: Table = toml::from_str(contents)
            .map_err(|e| VaultBridgeError::Config(format!("invalid {source} settings: {e}")))?;
        Ok(Self { source, table })
    }

    /// Load a layer from a TOML file.
    ///
    /// A missing file yields an empty layer. A file that exists but
    /// cannot be parsed is an error.
    pub fn load(source: LayerSource, path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(%source, path = %path.display(), "settings file not found, skipping");
            return Ok(Self::empty(source));
        }

        let contents = std::fs::read_to_string(path)?;
        let table: Table = toml::from_str(&contents).map_err(|e| {
            VaultBridgeError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;

        tracing::debug!(%source, path = %path.display(), keys = table.len(), "loaded settings");
        Ok(Self { source, table })
    }

    /// Set a key, replacing any existing value.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.table.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.table.get(key)
    }

    pub fn source(&self) -> LayerSource {
        self.source
    }
}

// ── Provider ─────────────────────────────────────────────────────────

/// Read-only key/value view over configuration.
///
/// The vault logic only ever sees settings through this trait, so hosts
/// can plug in their own storage.
pub trait SettingsProvider {
    /// Raw value for `key`, or `None` when no layer defines it.
    fn lookup(&self, key: &str) -> Option<&Value>;

    /// Look up a string setting. Wrong types are a config error.
    fn string(&self, key: &str) -> Result<Option<String>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(type_mismatch(key, "a string", other)),
        }
    }

    /// Look up a boolean setting.
    fn flag(&self, key: &str) -> Result<Option<bool>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(Value::Boolean(b)) => Ok(Some(*b)),
            Some(other) => Err(type_mismatch(key, "a boolean", other)),
        }
    }

    /// Look up an integer setting.
    fn integer(&self, key: &str) -> Result<Option<i64>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(Value::Integer(i)) => Ok(Some(*i)),
            Some(other) => Err(type_mismatch(key, "an integer", other)),
        }
    }
}

fn type_mismatch(key: &str, expected: &str, found: &Value) -> VaultBridgeError {
    VaultBridgeError::Config(format!(
        "setting '{key}' must be {expected}, found {}",
        found.type_str()
    ))
}

/// Settings resolved across several layers, highest precedence first.
///
/// A key defined in a higher layer shadows lower layers even when its
/// value is an empty string.
#[derive(Debug, Clone, Default)]
pub struct LayeredSettings {
    layers: Vec<SettingsLayer>,
}

impl LayeredSettings {
    /// Build from layers in any order; they are sorted by precedence.
    pub fn from_layers(mut layers: Vec<SettingsLayer>) -> Self {
        layers.sort_by_key(SettingsLayer::source);
        Self { layers }
    }

    /// Load the standard stack: `overrides`, then the project file in
    /// `project_dir`, then the platform and global files in `config_dir`.
    pub fn load(
        project_dir: &Path,
        config_dir: Option<&Path>,
        overrides: SettingsLayer,
    ) -> Result<Self> {
        let mut layers = vec![
            overrides,
            SettingsLayer::load(LayerSource::Project, &project_dir.join(PROJECT_FILE_NAME))?,
        ];

        if let Some(dir) = config_dir {
            layers.push(SettingsLayer::load(
                LayerSource::Platform,
                &dir.join(platform_file_name()),
            )?);
            layers.push(SettingsLayer::load(
                LayerSource::Global,
                &dir.join(GLOBAL_FILE_NAME),
            )?);
        }

        Ok(Self::from_layers(layers))
    }

    /// Which layer supplies `key`, if any.
    pub fn source_of(&self, key: &str) -> Option<LayerSource> {
        self.layers
            .iter()
            .find(|layer| layer.get(key).is_some())
            .map(SettingsLayer::source)
    }
}

impl SettingsProvider for LayeredSettings {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }
}

/// Name of the per-project settings file.
pub const PROJECT_FILE_NAME: &str = ".vaultbridge.toml";

/// Name of the global settings file inside the config directory.
pub const GLOBAL_FILE_NAME: &str = "settings.toml";

/// Platform-specific settings file, e.g. `settings.linux.toml`.
pub fn platform_file_name() -> String {
    format!("settings.{}.toml", platform_name())
}

fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "macos",
        "windows" => "windows",
        _ => "linux",
    }
}

/// Default directory for global and platform settings.
///
/// `VAULTBRIDGE_CONFIG_DIR` wins over the OS config directory.
pub fn default_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("VAULTBRIDGE_CONFIG_DIR") {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    dirs::config_dir().map(|d| d.join("vaultbridge"))
}

// ── Typed view ───────────────────────────────────────────────────────

/// The non-secret settings the invoker needs, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub debug: bool,
    pub ansible_path: String,
    pub timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            debug: false,
            ansible_path: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ToolSettings {
    pub fn from_provider(settings: &dyn SettingsProvider) -> Result<Self> {
        let defaults = Self::default();

        let timeout_secs = match settings.integer(TIMEOUT_SECS)? {
            None => defaults.timeout_secs,
            Some(n) if n < 0 => {
                return Err(VaultBridgeError::Config(format!(
                    "setting '{TIMEOUT_SECS}' cannot be negative, found {n}"
                )))
            }
            Some(n) => n as u64,
        };

        Ok(Self {
            debug: settings.flag(DEBUG)?.unwrap_or(defaults.debug),
            ansible_path: settings
                .string(ANSIBLE_PATH)?
                .unwrap_or(defaults.ansible_path),
            timeout_secs,
        })
    }

    /// The process timeout, or `None` when disabled.
    pub fn timeout(&self) -> Option<std::time::Duration> {
        (self.timeout_secs > 0).then(|| std::time::Duration::from_secs(self.timeout_secs))
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn layer(source: LayerSource, toml: &str) -> SettingsLayer {
        SettingsLayer::parse(source, toml).unwrap()
    }

    #[test]
    fn missing_file_is_an_empty_layer() {
        let tmp = TempDir::new().unwrap();
        let layer = SettingsLayer::load(LayerSource::Global, &tmp.path().join("nope.toml")).unwrap();
        assert!(layer.get(PASSWORD).is_none());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.toml");
        fs::write(&path, "not valid {{toml").unwrap();

        let result = SettingsLayer::load(LayerSource::Global, &path);
        assert!(matches!(result, Err(VaultBridgeError::Config(_))));
    }

    #[test]
    fn project_beats_platform_beats_global() {
        let settings = LayeredSettings::from_layers(vec![
            layer(LayerSource::Global, "password = \"global\"\nansible_path = \"/g\"\ndebug = true"),
            layer(LayerSource::Project, "password = \"project\""),
            layer(LayerSource::Platform, "password = \"platform\"\nansible_path = \"/p\""),
        ]);

        assert_eq!(settings.string(PASSWORD).unwrap().as_deref(), Some("project"));
        assert_eq!(settings.string(ANSIBLE_PATH).unwrap().as_deref(), Some("/p"));
        assert_eq!(settings.flag(DEBUG).unwrap(), Some(true));
        assert_eq!(settings.source_of(PASSWORD), Some(LayerSource::Project));
        assert_eq!(settings.source_of(ANSIBLE_PATH), Some(LayerSource::Platform));
        assert_eq!(settings.source_of(DEBUG), Some(LayerSource::Global));
        assert_eq!(settings.source_of(PASSWORD_FILE), None);
    }

    #[test]
    fn command_line_overrides_everything() {
        let mut overrides = SettingsLayer::empty(LayerSource::CommandLine);
        overrides.set(PASSWORD_FILE, "/cli/pw");

        let settings = LayeredSettings::from_layers(vec![
            layer(LayerSource::Project, "password_file = \"/project/pw\""),
            overrides,
        ]);

        assert_eq!(settings.string(PASSWORD_FILE).unwrap().as_deref(), Some("/cli/pw"));
    }

    #[test]
    fn empty_string_in_higher_layer_still_shadows() {
        let settings = LayeredSettings::from_layers(vec![
            layer(LayerSource::Global, "password = \"global\""),
            layer(LayerSource::Project, "password = \"\""),
        ]);
        assert_eq!(settings.string(PASSWORD).unwrap().as_deref(), Some(""));
    }

    #[test]
    fn wrong_type_is_reported() {
        let settings = LayeredSettings::from_layers(vec![layer(LayerSource::Project, "password = 42")]);
        let err = settings.string(PASSWORD).unwrap_err();
        assert!(err.to_string().contains("must be a string"), "{err}");
    }

    #[test]
    fn load_reads_project_platform_and_global_files() {
        let project = TempDir::new().unwrap();
        let config = TempDir::new().unwrap();

        fs::write(project.path().join(PROJECT_FILE_NAME), "debug = true\n").unwrap();
        fs::write(config.path().join(platform_file_name()), "ansible_path = \"/opt/bin\"\n").unwrap();
        fs::write(
            config.path().join(GLOBAL_FILE_NAME),
            "timeout_secs = 30\nansible_path = \"/usr/bin\"\n",
        )
        .unwrap();

        let settings = LayeredSettings::load(
            project.path(),
            Some(config.path()),
            SettingsLayer::empty(LayerSource::CommandLine),
        )
        .unwrap();

        let tool = ToolSettings::from_provider(&settings).unwrap();
        assert!(tool.debug);
        assert_eq!(tool.ansible_path, "/opt/bin");
        assert_eq!(tool.timeout_secs, 30);
    }

    #[test]
    fn tool_settings_defaults() {
        let tool = ToolSettings::from_provider(&LayeredSettings::default()).unwrap();
        assert_eq!(tool, ToolSettings::default());
        assert_eq!(tool.timeout(), Some(std::time::Duration::from_secs(120)));
    }

    #[test]
    fn zero_timeout_disables_it() {
        let settings =
            LayeredSettings::from_layers(vec![layer(LayerSource::Global, "timeout_secs = 0")]);
        let tool = ToolSettings::from_provider(&settings).unwrap();
        assert_eq!(tool.timeout(), None);
    }

    #[test]
    fn negative_timeout_rejected() {
        let settings =
            LayeredSettings::from_layers(vec![layer(LayerSource::Global, "timeout_secs = -5")]);
        assert!(ToolSettings::from_provider(&settings).is_err());
    }
}
