//! Tabular Input & Column Binding
//!
//! Rows of named string columns. Reserved columns (`id`, `product_id`,
//! `output`) carry bookkeeping only; every other column binds to a slot,
//! and the binding kind is a pure function of the column name.

use std::path::{Path, PathBuf};

use crate::RESERVED_COLUMNS;

/// Prefix marking a nested-text column: the value goes into the first
/// text-capable slot inside the target's sub-document.
pub const NESTED_TEXT_PREFIX: &str = "txt_";

/// One unit of batch work: one output document/video.
#[derive(Debug, Clone)]
pub struct Record {
    /// 1-based input position. `product_id` values may repeat across
    /// rows, so derived-asset paths are scoped by this instead.
    pub row: usize,
    /// Used for output naming; falls back to the row index when the data
    /// set has no `product_id`/`id` column.
    pub product_id: String,
    /// Per-row output directory from the `output` column, if any.
    pub output_dir: Option<PathBuf>,
    /// Non-reserved columns in declaration order.
    pub columns: Vec<(String, String)>,
}

impl Record {
    /// Rewrite a column's value in place (used by the resizer).
    pub fn set_column(&mut self, name: &str, value: String) {
        if let Some(entry) = self.columns.iter_mut().find(|(n, _)| n == name) {
            entry.1 = value;
        }
    }
}

/// How a column maps onto the template, decided by the name alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Name contains "image": value is a source raster path, target slot
    /// is the column name verbatim.
    Image { slot: String },
    /// Name starts with `txt_`: value goes into the first text-capable
    /// slot nested inside the target (name minus prefix).
    NestedText { slot: String },
    /// Anything else: value replaces the slot's own text content, target
    /// slot is the column name verbatim.
    DirectText { slot: String },
}

impl Binding {
    pub fn classify(column_name: &str) -> Self {
        if column_name.to_lowercase().contains("image") {
            Binding::Image {
                slot: column_name.to_string(),
            }
        } else if let Some(stripped) = column_name.strip_prefix(NESTED_TEXT_PREFIX) {
            Binding::NestedText {
                slot: stripped.to_string(),
            }
        } else {
            Binding::DirectText {
                slot: column_name.to_string(),
            }
        }
    }

    pub fn slot(&self) -> &str {
        match self {
            Binding::Image { slot } | Binding::NestedText { slot } | Binding::DirectText { slot } => {
                slot
            }
        }
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED_COLUMNS.contains(&name)
}

/// Load records from a CSV file. Column order within each row and row
/// order across the file are preserved exactly.
pub fn load_records(path: &Path) -> Result<Vec<Record>, csv::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = vec![];
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let mut product_id = None;
        let mut output_dir = None;
        let mut columns = vec![];

        for (header, value) in headers.iter().zip(row.iter()) {
            if !is_reserved(header) {
                columns.push((header.to_string(), value.to_string()));
                continue;
            }
            match header {
                "product_id" | "id" => {
                    if product_id.is_none() && !value.is_empty() {
                        product_id = Some(value.to_string());
                    }
                }
                "output" => {
                    if !value.is_empty() {
                        output_dir = Some(PathBuf::from(value));
                    }
                }
                _ => {}
            }
        }

        records.push(Record {
            row: index + 1,
            product_id: product_id.unwrap_or_else(|| format!("row{}", index + 1)),
            output_dir,
            columns,
        });
    }

    Ok(records)
}

/// Distinct target slot names across all rows, first-occurrence order.
/// This is the required-name set handed to bounds extraction before any
/// single row is processed.
pub fn required_slot_names(records: &[Record]) -> Vec<String> {
    let mut names: Vec<String> = vec![];
    for record in records {
        for (column, _) in &record.columns {
            let slot = Binding::classify(column).slot().to_string();
            if !names.contains(&slot) {
                names.push(slot);
            }
        }
    }
    names
}
