//! CSV parsing into the canonical in-memory table.
//!
//! Layout: a header row whose first label is the identifier column, followed by
//! chronologically ordered date columns and (for the price dataset) one
//! designated volume-summary column, usually last. Parsing is all-or-nothing:
//! the first malformed cell rejects the whole payload.

use std::collections::HashSet;
use thiserror::Error;

/// Default label of the identifier column.
pub const DEFAULT_ID_COLUMN: &str = "stock name";

/// Default label of the volume-summary column.
pub const DEFAULT_VOLUME_COLUMN: &str = "volume_std";

/// Malformed or unexpected table content.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("payload is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("payload has no header row")]
    MissingHeader,

    #[error("identifier column '{expected}' missing (first header label is '{found}')")]
    MissingIdentifierColumn { expected: String, found: String },

    #[error("volume column '{0}' missing from header")]
    MissingVolumeColumn(String),

    #[error("header label at position {position} is empty")]
    EmptyHeader { position: usize },

    #[error("duplicate header label '{0}'")]
    DuplicateHeader(String),

    #[error("row {row}: blank stock identifier")]
    BlankIdentifier { row: usize },

    #[error("row {row}: duplicate stock identifier '{stock}'")]
    DuplicateIdentifier { row: usize, stock: String },

    #[error("row {row}: expected {expected} cells, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}, column '{column}': non-numeric value '{value}'")]
    NonNumeric {
        row: usize,
        column: String,
        value: String,
    },

    #[error("CSV error: {0}")]
    Csv(String),
}

/// Column labels the parser needs to know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub id_column: String,
    pub volume_column: String,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            volume_column: DEFAULT_VOLUME_COLUMN.to_string(),
        }
    }
}

/// Whether the volume-summary column must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryColumn {
    Required,
    Optional,
}

/// One stock's observations, in date-column order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub stock: String,
    /// One entry per date label; `None` for an empty cell.
    pub observations: Vec<Option<f64>>,
    /// Value of the volume-summary column, if the column exists and the cell is non-empty.
    pub summary: Option<f64>,
}

/// The canonical table: ordered date labels plus rows in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    pub date_labels: Vec<String>,
    pub has_summary: bool,
    pub rows: Vec<RawRow>,
}

impl CanonicalTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse raw CSV bytes into a [`CanonicalTable`].
pub fn parse_table(
    bytes: &[u8],
    layout: &TableLayout,
    summary: SummaryColumn,
) -> Result<CanonicalTable, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ParseError::Encoding(e.to_string()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ParseError::Csv(e.to_string()))?
        .clone();

    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(ParseError::MissingHeader);
    }

    let first = headers.get(0).unwrap_or_default();
    if first != layout.id_column {
        return Err(ParseError::MissingIdentifierColumn {
            expected: layout.id_column.clone(),
            found: first.to_string(),
        });
    }

    let mut seen = HashSet::new();
    for (position, label) in headers.iter().enumerate() {
        if label.is_empty() {
            return Err(ParseError::EmptyHeader { position });
        }
        if !seen.insert(label) {
            return Err(ParseError::DuplicateHeader(label.to_string()));
        }
    }

    let summary_idx = headers.iter().position(|h| h == layout.volume_column);
    if summary_idx.is_none() && summary == SummaryColumn::Required {
        return Err(ParseError::MissingVolumeColumn(layout.volume_column.clone()));
    }

    // Date columns: everything after the identifier except the summary column.
    let date_indices: Vec<usize> = (1..headers.len())
        .filter(|&i| Some(i) != summary_idx)
        .collect();
    let date_labels: Vec<String> = date_indices
        .iter()
        .map(|&i| headers[i].to_string())
        .collect();

    let mut rows = Vec::new();
    let mut stocks = HashSet::new();

    for (i, record) in reader.records().enumerate() {
        // Row numbers are 1-based and count the header, matching what a
        // spreadsheet would show.
        let row = i + 2;
        let record = record.map_err(|e| ParseError::Csv(e.to_string()))?;

        if record.len() != headers.len() {
            return Err(ParseError::RaggedRow {
                row,
                expected: headers.len(),
                found: record.len(),
            });
        }

        let stock = record[0].to_string();
        if stock.is_empty() {
            return Err(ParseError::BlankIdentifier { row });
        }
        if !stocks.insert(stock.clone()) {
            return Err(ParseError::DuplicateIdentifier { row, stock });
        }

        let observations = date_indices
            .iter()
            .map(|&c| parse_cell(&record[c], row, &headers[c]))
            .collect::<Result<Vec<_>, _>>()?;

        let summary = match summary_idx {
            Some(c) => parse_cell(&record[c], row, &headers[c])?,
            None => None,
        };

        rows.push(RawRow {
            stock,
            observations,
            summary,
        });
    }

    Ok(CanonicalTable {
        date_labels,
        has_summary: summary_idx.is_some(),
        rows,
    })
}

fn parse_cell(cell: &str, row: usize, column: &str) -> Result<Option<f64>, ParseError> {
    if cell.is_empty() {
        return Ok(None);
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ParseError::NonNumeric {
            row,
            column: column.to_string(),
            value: cell.to_string(),
        }),
    }
}
