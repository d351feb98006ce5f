//! `vaultbridge decrypt`: replace a vault file or selection with its plaintext.

use crate::cli::{build_command, run_vault_command, Cli, TargetArgs};
use crate::errors::Result;
use crate::vault::Subcommand;

/// Execute the `decrypt` command.
pub fn execute(cli: &Cli, target: &TargetArgs) -> Result<()> {
    let command = build_command(cli, Subcommand::Decrypt, target)?;
    run_vault_command(cli, command, target.in_place)
}
