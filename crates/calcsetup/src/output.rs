//! Output formatting helpers for the `calcsetup` CLI.

use std::io::{self, Write};

use serde::Serialize;

use calcsetup_engine::Notice;

use crate::styles::render_level_icon;

/// Print a value as pretty JSON to stdout.
pub fn output_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Ignore broken pipe errors (e.g., piped to `head`)
            let _ = writeln!(handle, "{}", json);
        }
        Err(e) => {
            eprintln!("Error: failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Lays out a table with headers and rows.
///
/// Column widths are computed from the data for alignment. Returns an empty
/// string when there are no rows.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    let cells = |row: &mut dyn Iterator<Item = String>| {
        row.enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                format!("{:<width$}", cell)
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    lines.push(cells(&mut headers.iter().map(|h| h.to_string())));
    lines.push(cells(&mut widths.iter().map(|w| "-".repeat(*w))));
    for row in rows {
        lines.push(cells(&mut row.iter().cloned()));
    }
    lines.join("\n")
}

/// Print a simple table with headers and rows.
pub fn output_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = writeln!(handle, "{}", format_table(headers, rows));
}

/// Print notices one per line, each prefixed with its level icon.
pub fn print_notices(notices: &[Notice]) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for notice in notices {
        let _ = writeln!(handle, "{} {}", render_level_icon(notice.level), notice.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn table_aligns_columns() {
        let rows = vec![
            vec!["2".to_string(), "Essay".to_string(), "50.00".to_string()],
            vec!["13".to_string(), "Quiz".to_string(), "".to_string()],
        ];
        insta::assert_snapshot!(format_table(&["ID", "NAME", "GRADEPASS"], &rows), @r"
        ID  NAME   GRADEPASS
        --  -----  ---------
        2   Essay  50.00
        13  Quiz
        ");
    }

    #[test]
    fn empty_table_is_empty() {
        assert_eq!(format_table(&["ID"], &[]), "");
    }
}
