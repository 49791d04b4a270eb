//! Plain-text tables.
//!
//! Layout:
//!
//! ```text
//! Title
//!  ID | NAME     | STATUS
//! ----+----------+-----------------
//!  1  | instance | CREATE_SUCCEEDED
//! ----+----------+-----------------
//! ```
//!
//! Columns are laid out by `comfy_table`. On top of that come the title line,
//! rules at separator markers and blanking of repeated values. A separator
//! added after the last row coincides with the closing rule, and consecutive
//! separators collapse into one.

use crate::styles;
use comfy_table::presets::NOTHING;
use comfy_table::{Attribute, Cell, ContentArrangement, TableComponent};
use std::collections::BTreeSet;
use std::fmt;

/// Builds a row from heterogeneous values: `cells![id, name, size]`.
#[macro_export]
macro_rules! cells {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::output::table::cell(&$value)),*]
    };
}

pub fn cell(value: &dyn fmt::Display) -> String {
    value.to_string()
}

/// Stringifies an optional value, empty when absent.
pub fn or_empty<T: fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone)]
enum Row {
    Cells(Vec<String>),
    Separator,
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    title: Option<String>,
    header: Option<Vec<String>>,
    rows: Vec<Row>,
    merge: BTreeSet<usize>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn set_header(&mut self, header: &[&str]) {
        self.header = Some(header.iter().map(|h| h.to_string()).collect());
    }

    pub fn add_row(&mut self, cells: Vec<String>) {
        self.rows.push(Row::Cells(cells));
    }

    pub fn add_separator(&mut self) {
        self.rows.push(Row::Separator);
    }

    /// Blank cells in these columns that repeat the value directly above.
    pub fn enable_auto_merge(&mut self, columns: &[usize]) {
        self.merge.extend(columns.iter().copied());
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.rows.is_empty()
    }

    fn merged_rows(&self) -> Vec<Row> {
        if self.merge.is_empty() {
            return self.rows.clone();
        }
        let mut previous: Option<&Vec<String>> = None;
        let mut out = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            match row {
                Row::Separator => {
                    out.push(Row::Separator);
                }
                Row::Cells(cells) => {
                    let mut merged = cells.clone();
                    if let Some(prev) = previous {
                        for &col in &self.merge {
                            if col < merged.len()
                                && prev.get(col) == cells.get(col)
                                && !cells[col].is_empty()
                            {
                                merged[col].clear();
                            }
                        }
                    }
                    previous = Some(cells);
                    out.push(Row::Cells(merged));
                }
            }
        }
        out
    }

    fn layout(&self, rows: &[&Vec<String>]) -> comfy_table::Table {
        let mut table = comfy_table::Table::new();
        table
            .load_preset(NOTHING)
            .set_style(TableComponent::VerticalLines, '|')
            .set_style(TableComponent::HeaderLines, '-')
            .set_style(TableComponent::MiddleHeaderIntersections, '+')
            .set_style(TableComponent::BottomBorder, '-')
            .set_style(TableComponent::BottomBorderIntersections, '+')
            .set_content_arrangement(ContentArrangement::Disabled);
        if let Some(header) = &self.header {
            let cells: Vec<Cell> = header
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect();
            table.set_header(cells);
        }
        for row in rows {
            let cells: Vec<Cell> = row.iter().map(|c| Cell::new(trim_cell(c))).collect();
            table.add_row(cells);
        }
        table
    }

    pub fn render(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        if let Some(title) = &self.title {
            lines.push(styles::TABLE_TITLE.apply_to(title).to_string());
        }

        let rows = self.merged_rows();
        let cell_rows: Vec<&Vec<String>> = rows
            .iter()
            .filter_map(|r| match r {
                Row::Cells(c) => Some(c),
                Row::Separator => None,
            })
            .collect();
        if self.header.is_none() && cell_rows.is_empty() {
            return join_lines(lines);
        }

        let rendered: Vec<String> = self
            .layout(&cell_rows)
            .lines()
            .map(|l| l.trim_end().to_string())
            .collect();
        // comfy-table ends every table with the bottom border.
        let Some((rule, body)) = rendered.split_last() else {
            return join_lines(lines);
        };

        let mut at = self
            .header
            .as_ref()
            .map_or(0, |h| height(h) + 1)
            .min(body.len());
        lines.extend_from_slice(&body[..at]);

        let mut last_was_rule = true;
        for row in &rows {
            match row {
                Row::Separator => {
                    if !last_was_rule {
                        lines.push(rule.clone());
                        last_was_rule = true;
                    }
                }
                Row::Cells(cells) => {
                    let end = (at + height(cells)).min(body.len());
                    lines.extend_from_slice(&body[at..end]);
                    at = end;
                    last_was_rule = false;
                }
            }
        }
        if lines.last() != Some(rule) {
            lines.push(rule.clone());
        }
        join_lines(lines)
    }
}

fn trim_cell(cell: &str) -> &str {
    cell.trim_end_matches(['\r', '\n'])
}

/// Lines a row occupies: its tallest cell.
fn height(cells: &[String]) -> usize {
    cells
        .iter()
        .map(|c| trim_cell(c).split('\n').count())
        .max()
        .unwrap_or(1)
}

fn join_lines(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
