//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::{IntegrityReport, VaultEntry};

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

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of stored files (Name, Size, Stored as).
pub fn print_entries_table(entries: &[VaultEntry]) {
    if entries.is_empty() {
        info("No files in this vault yet.");
        tip("Run `filevault add <FILE>` to encrypt your first file.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Size", "Stored as"]);

    for e in entries {
        table.add_row(vec![
            e.original_name.clone(),
            human_size(e.plaintext_size),
            e.ciphertext_path.clone(),
        ]);
    }

    println!("{table}");
}

/// Print the three integrity partitions, one table row per entry.
pub fn print_integrity_report(report: &IntegrityReport) {
    if report.total() == 0 {
        info("Nothing to check: the vault is empty.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Result"]);

    let rows = report
        .passed
        .iter()
        .map(|n| (n, style("passed").green()))
        .chain(report.failed.iter().map(|n| (n, style("FAILED").red().bold())))
        .chain(
            report
                .inconclusive
                .iter()
                .map(|n| (n, style("inconclusive").yellow())),
        );
    for (name, verdict) in rows {
        table.add_row(vec![name.clone(), verdict.to_string()]);
    }

    println!("{table}");
}

/// Format a byte count for display (e.g. `1.5 KiB`).
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
