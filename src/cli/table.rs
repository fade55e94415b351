use std::io::{self, Write};

use chrono::{DateTime, TimeZone};

use crate::{catalog::Kata, ledger::last_completion, utils::time::humanize};

const PADDING: usize = 2;

/// Column-aligned text, like a tab writer: every cell is padded to the widest cell of its column
/// plus [PADDING], except the last one in a line.
#[derive(Debug, Default)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        let mut widths = Vec::<usize>::new();
        for row in &self.rows {
            // The trailing cell never affects alignment.
            for (column, cell) in row.iter().enumerate().take(row.len().saturating_sub(1)) {
                let width = cell.chars().count();
                match widths.get_mut(column) {
                    Some(w) => *w = (*w).max(width),
                    None => widths.push(width),
                }
            }
        }

        for row in &self.rows {
            let mut line = String::new();
            for (column, cell) in row.iter().enumerate() {
                if column + 1 == row.len() {
                    line.push_str(cell);
                } else {
                    let width = widths[column] + PADDING;
                    line.push_str(&format!("{cell:<width$}"));
                }
            }
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

fn underline(headers: &[&str]) -> Vec<String> {
    headers.iter().map(|h| "-".repeat(h.chars().count())).collect()
}

/// Katas as the narrow (`wide == false`) or wide table.
pub fn kata_table<Tz: TimeZone>(katas: &[Kata], wide: bool, now: &DateTime<Tz>) -> Table {
    let mut headers = vec!["Name", "Description", "Lines", "Done", "Last done"];
    if wide {
        headers.extend(["URL", "Topics"]);
    }

    let mut table = Table::default();
    table.push(headers.iter().map(|h| h.to_string()).collect());
    table.push(underline(&headers));

    for kata in katas {
        let last = last_completion(&kata.completions);
        let mut row = vec![
            kata.name.clone(),
            kata.description.clone(),
            kata.lines.to_string(),
            format!("{}x", kata.completions.len()),
            humanize(last.as_ref(), now),
        ];
        if wide {
            row.push(kata.clone_url.clone());
            row.push(kata.topics.join(" "));
        }
        table.push(row);
    }
    table
}
