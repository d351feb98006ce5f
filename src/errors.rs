use thiserror::Error;

/// All errors that can occur in VaultBridge.
#[derive(Debug, Error)]
pub enum VaultBridgeError {
    // --- Invocation errors ---
    #[error("Configuration conflict: {0}")]
    ConfigConflict(String),

    #[error("Failed to launch '{program}': {reason}")]
    ProcessLaunch { program: String, reason: String },

    #[error("{0}")]
    Process(String),

    #[error("Vault tool did not finish within {0} seconds and was killed")]
    Timeout(u64),

    #[error("Another vault command is still running")]
    Busy,

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Convenience type alias for VaultBridge results.
pub type Result<T> = std::result::Result<T, VaultBridgeError>;
