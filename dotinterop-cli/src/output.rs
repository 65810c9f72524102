use comfy_table::{presets, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::app::GlobalOptions;

/// Print `data` as JSON (if `--json`) or call `display_fn` for human-readable output.
pub fn print_output<T: Serialize>(
    data: &T,
    opts: &GlobalOptions,
    display_fn: impl FnOnce(&T),
) -> anyhow::Result<()> {
    if opts.json {
        println!("{}", serde_json::to_string_pretty(data)?);
    } else {
        display_fn(data);
    }
    Ok(())
}

/// Column alignment for tabular output.
#[derive(Clone, Copy)]
pub enum Align {
    Left,
    Right,
}

/// Whitespace-aligned table for terminal output.
///
/// Columns are sized to the widest entry, without borders.
pub struct TabWriter {
    table: Table,
}

impl TabWriter {
    /// Create a table from `(header, alignment)` pairs.
    pub fn new(columns: &[(&str, Align)]) -> Self {
        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(columns.iter().map(|(name, _)| *name));

        // Two spaces between columns, none at the outer edges.
        let last = columns.len().saturating_sub(1);
        for (i, (_, align)) in columns.iter().enumerate() {
            if let Some(col) = table.column_mut(i) {
                col.set_cell_alignment(match align {
                    Align::Left => CellAlignment::Left,
                    Align::Right => CellAlignment::Right,
                });
                col.set_padding((u16::from(i != 0), u16::from(i != last)));
            }
        }

        Self { table }
    }

    /// Add a row. Values are given in column order.
    pub fn row<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table
            .add_row(values.into_iter().map(Into::into).collect::<Vec<String>>());
    }

    /// Number of rows added so far.
    pub fn len(&self) -> usize {
        self.table.row_iter().count()
    }

    /// Rendered lines without trailing whitespace.
    pub fn lines(&self) -> Vec<String> {
        self.table
            .to_string()
            .lines()
            .map(|line| line.trim_end().to_string())
            .collect()
    }

    /// Print the table to stdout.
    pub fn print(&self) {
        for line in self.lines() {
            println!("{line}");
        }
    }
}

/// `"1 type"` or `"3 types"`
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_aligned() {
        let mut tw = TabWriter::new(&[("Kind", Align::Left), ("Name", Align::Left)]);
        tw.row(["Enum", "Windows.Win32.UI.Shell.SIATTRIBFLAGS"]);
        tw.row(["Interface", "Windows.Win32.UI.Shell.IShellItem"]);

        let lines = tw.lines();
        assert_eq!(tw.len(), 2);
        assert!(lines.iter().all(|line| !line.ends_with(' ')));

        let column = |line: &str| line.find("Windows").unwrap();
        let data: Vec<&String> = lines.iter().filter(|l| l.contains("Windows")).collect();
        assert_eq!(data.len(), 2);
        assert_eq!(column(data[0]), column(data[1]));
    }

    #[test]
    fn plural_nouns() {
        assert_eq!(plural(1, "type"), "1 type");
        assert_eq!(plural(0, "type"), "0 types");
        assert_eq!(plural(12, "file"), "12 files");
    }
}
