use clap::Parser;
use vaultbridge::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::View { ref file } => vaultbridge::cli::commands::view::execute(&cli, file),
        Commands::Decrypt { ref target } => {
            vaultbridge::cli::commands::decrypt::execute(&cli, target)
        }
        Commands::Encrypt { ref target } => {
            vaultbridge::cli::commands::encrypt::execute(&cli, target)
        }
        Commands::Settings => vaultbridge::cli::commands::settings::execute(&cli),
        Commands::Completions { shell } => vaultbridge::cli::commands::completions::execute(shell),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        vaultbridge::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
