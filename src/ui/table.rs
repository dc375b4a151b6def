//! ui::table
//!
//! Plain-text column alignment for result tables.
//!
//! Each column is sized to its widest cell, clamped between a minimum and a
//! cap. Cells over the cap are truncated with an ellipsis. No colors, no
//! box drawing; the output is grep-friendly.

/// A column definition: header plus width clamps.
#[derive(Debug, Clone)]
pub struct Column {
    /// Header text.
    pub header: String,
    /// Width floor, headers included.
    pub min_width: usize,
    /// Width cap; longer cells are truncated.
    pub max_width: usize,
}

impl Column {
    /// Define a column with the given clamps.
    pub fn new(header: impl Into<String>, min_width: usize, max_width: usize) -> Self {
        Self {
            header: header.into(),
            min_width,
            max_width,
        }
    }
}

/// An in-memory table, rendered once all rows are added.
#[derive(Debug)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create a table with the given columns.
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Add a row. Short rows are padded with empty cells; extra cells are
    /// dropped.
    pub fn add_row(&mut self, cells: Vec<String>) {
        let mut cells = cells;
        cells.resize(self.columns.len(), String::new());
        cells.truncate(self.columns.len());
        self.rows.push(cells);
    }

    /// Number of data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render the table: header line, separator, then one line per row.
    pub fn render(&self) -> String {
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let widest_cell = self
                    .rows
                    .iter()
                    .map(|row| row[i].chars().count())
                    .max()
                    .unwrap_or(0);
                widest_cell
                    .max(col.header.chars().count())
                    .max(col.min_width)
                    .min(col.max_width)
            })
            .collect();

        let mut out = String::new();
        render_line(
            &mut out,
            &widths,
            self.columns.iter().map(|c| c.header.as_str()),
        );
        let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        render_line(&mut out, &widths, sep.iter().map(|s| s.as_str()));
        for row in &self.rows {
            render_line(&mut out, &widths, row.iter().map(|s| s.as_str()));
        }
        out
    }
}

fn render_line<'a>(out: &mut String, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
    let mut parts = Vec::with_capacity(widths.len());
    for (cell, width) in cells.zip(widths) {
        parts.push(fit(cell, *width));
    }
    // Trailing spaces on the last column are noise; trim them.
    let line = parts.join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Pad or truncate a cell to exactly `width` characters.
fn fit(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    if len <= width {
        let mut s = cell.to_string();
        s.extend(std::iter::repeat(' ').take(width - len));
        return s;
    }
    // Caps narrower than the ellipsis get a hard cut instead.
    if width < 3 {
        return cell.chars().take(width).collect();
    }
    let keep = width - 3;
    let truncated: String = cell.chars().take(keep).collect();
    format!("{}...", truncated)
}
