//! Layered configuration: command line, project, platform and global settings.

pub mod settings;

pub use settings::{
    default_config_dir, LayerSource, LayeredSettings, SettingsLayer, SettingsProvider,
    ToolSettings,
};
