//! `vaultbridge view`: show a vault file's plaintext in a read-only view.

use std::path::Path;

use crate::cli::{run_vault_command, Cli};
use crate::errors::Result;
use crate::vault::{Subcommand, VaultCommand};

/// Execute the `view` command.
pub fn execute(cli: &Cli, file: &Path) -> Result<()> {
    let mut command = VaultCommand::file(Subcommand::View, file);
    if let Some(flags) = &cli.extra_flags {
        command = command.with_extra_flags(flags);
    }
    run_vault_command(cli, command, false)
}
