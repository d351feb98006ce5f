//! Terminal implementations of the presentation surface.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::cli::output;
use crate::errors::{Result, VaultBridgeError};
use crate::vault::{Presentation, Presenter};

/// Where presented output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentMode {
    /// Raw output on stdout; new-view results get a title line on stderr.
    Stdout,
    /// One JSON object per result on stdout.
    Json,
    /// Buffer replacements are written back to this file, but only after a
    /// clean exit. New-view results still go to stdout.
    InPlace(PathBuf),
}

pub struct TerminalPresenter {
    mode: PresentMode,
}

impl TerminalPresenter {
    pub fn new(mode: PresentMode) -> Self {
        Self { mode }
    }
}

impl Presenter for TerminalPresenter {
    fn present(&mut self, presentation: &Presentation) -> Result<()> {
        match &self.mode {
            PresentMode::Json => {
                let json = serde_json::to_string(presentation)
                    .map_err(|e| VaultBridgeError::Serialization(e.to_string()))?;
                println!("{json}");
                Ok(())
            }
            PresentMode::InPlace(path) if !presentation.open_in_new_tab => {
                if let Some(failure) = &presentation.exit_failure {
                    return Err(VaultBridgeError::Process(format!(
                        "vault tool {failure}; {} left unchanged",
                        path.display()
                    )));
                }
                fs::write(path, presentation.output.as_bytes())?;
                output::success(&format!("Updated {}", path.display()));
                Ok(())
            }
            PresentMode::InPlace(_) | PresentMode::Stdout => {
                if presentation.open_in_new_tab {
                    output::heading(&presentation.title);
                }
                write_raw(&presentation.output)
            }
        }
    }
}

/// Write output byte for byte, without adding a newline.
fn write_raw(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
