//! `vaultbridge encrypt`: replace a file or selection with vault ciphertext.

use crate::cli::{build_command, run_vault_command, Cli, TargetArgs};
use crate::errors::Result;
use crate::vault::Subcommand;

/// Execute the `encrypt` command.
pub fn execute(cli: &Cli, target: &TargetArgs) -> Result<()> {
    let command = build_command(cli, Subcommand::Encrypt, target)?;
    run_vault_command(cli, command, target.in_place)
}
