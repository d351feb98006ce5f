//! Vault module: everything between a user action and the vault tool.
//!
//! This module provides:
//! - Password resolution from settings (`credential`)
//! - Commands and their argument vectors (`command`)
//! - Stderr classification (`classify`)
//! - Process execution (`invoker`)
//! - The per-action state machine (`session`)

pub mod classify;
pub mod command;
pub mod credential;
pub mod invoker;
pub mod session;

// Re-export the most commonly used items.
pub use classify::{classify, StderrClass, GETPASS_ECHO_WARNING};
pub use command::{build_invocation, Invocation, Subcommand, Target, VaultCommand};
pub use credential::{resolve, CredentialMode, Resolution};
pub use invoker::{execute, invoke, ProcessOutput, ProcessRunner, SystemRunner, VaultResult};
pub use session::{PendingPrompt, Presentation, Presenter, Session, SessionState, Started};
