//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::config::LayerSource;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint on stderr: "arrow {msg}"
pub fn tip(msg: &str) {
    eprintln!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a bold title line on stderr, keeping stdout clean for content.
pub fn heading(title: &str) {
    eprintln!("{} {}", style("\u{1f512}").dim(), style(title).bold().underlined());
}

/// One row of the `settings` table.
pub struct SettingRow {
    pub key: &'static str,
    pub value: Option<String>,
    pub source: Option<LayerSource>,
}

/// Print the effective settings (Key, Value, Source).
pub fn print_settings_table(rows: &[SettingRow]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Key", "Value", "Source"]);

    for row in rows {
        table.add_row(vec![
            row.key.to_string(),
            row.value.clone().unwrap_or_else(|| "-".to_string()),
            row.source
                .map_or_else(|| "default".to_string(), |s| s.to_string()),
        ]);
    }

    println!("{table}");
}
