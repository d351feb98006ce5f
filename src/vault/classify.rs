//! Sorting the vault tool's stderr into noise and real failures.

/// Warning printed by Python's `getpass` when it falls back to reading the
/// password from a pipe.
///
/// Matched verbatim. If a future tool version rewords it, the warning is
/// no longer stripped and every run reports it as an error.
pub const GETPASS_ECHO_WARNING: &str = "Warning: Password input may be echoed.\nVault password:";

/// What a stderr capture amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StderrClass {
    /// Nothing worth showing.
    Benign,
    /// A failure message for the user, already stripped of known noise.
    UserVisible(String),
}

/// Classify the vault tool's stderr.
pub fn classify(stderr: &str) -> StderrClass {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return StderrClass::Benign;
    }

    let remainder = match trimmed.find(GETPASS_ECHO_WARNING) {
        Some(pos) => trimmed[pos + GETPASS_ECHO_WARNING.len()..].trim(),
        None => trimmed,
    };

    if remainder.is_empty() {
        StderrClass::Benign
    } else {
        StderrClass::UserVisible(remainder.to_string())
    }
}
