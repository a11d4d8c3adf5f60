// CSV import validation - header mapping, row coercion, preview

use std::fmt;
use std::path::Path;

use serde::Serialize;

use tally_core::{Category, NewTransaction, TxType};

use crate::csv::{read_file_as_utf8, tokenize, CSV_HEADER};

/// Row numbers listed in an `InvalidRows` message before truncating.
const MAX_REPORTED_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum ImportError {
    /// No rows at all, not even a header.
    Empty,
    /// Header lacks one or more required columns.
    MissingColumns(Vec<String>),
    /// One or more data rows failed validation. `rows` holds every offending
    /// 1-indexed row number (header is row 1).
    InvalidRows { rows: Vec<usize>, total: usize },
    /// Header present but nothing after it.
    NoDataRows,
    Io(String),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "CSV file is empty"),
            Self::MissingColumns(cols) => {
                write!(f, "Missing required column(s): {}", cols.join(", "))
            }
            Self::InvalidRows { rows, total } => {
                let shown: Vec<String> = rows.iter().take(MAX_REPORTED_ROWS).map(|r| r.to_string()).collect();
                let more = if rows.len() > MAX_REPORTED_ROWS { ", …" } else { "" };
                write!(
                    f,
                    "{} of {total} row(s) are invalid (rows {}{more})",
                    rows.len(),
                    shown.join(", ")
                )
            }
            Self::NoDataRows => write!(f, "CSV file has no data rows"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ImportError {}

/// A validated candidate row awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportPreviewRow {
    pub row_number: usize,
    pub date: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub amount: f64,
    pub category: Category,
    pub description: String,
}

impl ImportPreviewRow {
    pub fn to_new_transaction(&self) -> NewTransaction {
        NewTransaction {
            tx_type: self.tx_type,
            amount: self.amount,
            date: self.date.clone(),
            category: Some(self.category.as_str().to_string()),
            description: if self.description.is_empty() { None } else { Some(self.description.clone()) },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportPreview {
    pub file_name: String,
    pub rows: Vec<ImportPreviewRow>,
}

impl ImportPreview {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse an amount cell. A value with `,` but no `.` uses `,` as the decimal
/// separator. Blank and non-finite values are rejected.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replace(',', ".")
    } else {
        trimmed.to_string()
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Column positions of the required fields.
struct ColumnMap {
    date: usize,
    tx_type: usize,
    category: usize,
    amount: usize,
    description: usize,
}

impl ColumnMap {
    fn from_header(header: &[String]) -> Result<Self, ImportError> {
        let names: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |name: &str| names.iter().position(|n| n == name);

        let mut positions = [0usize; CSV_HEADER.len()];
        let mut missing = Vec::new();
        for (slot, name) in positions.iter_mut().zip(CSV_HEADER) {
            match find(name) {
                Some(idx) => *slot = idx,
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns(missing));
        }

        // Same order as CSV_HEADER.
        let [date, tx_type, category, amount, description] = positions;
        Ok(Self { date, tx_type, category, amount, description })
    }

    fn map_row(&self, row: &[String], row_number: usize) -> Option<ImportPreviewRow> {
        let cell = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");

        let date = cell(self.date);
        if date.is_empty() {
            return None;
        }
        let tx_type = TxType::parse(&cell(self.tx_type).to_lowercase())?;
        let amount = parse_amount(cell(self.amount))?;

        Some(ImportPreviewRow {
            row_number,
            date: date.to_string(),
            tx_type,
            amount,
            category: Category::new(cell(self.category)),
            description: cell(self.description).to_string(),
        })
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// Validate tokenized rows into a preview. All-or-nothing: any invalid
/// non-blank row rejects the whole file.
pub fn build_preview(file_name: &str, rows: &[Vec<String>]) -> Result<ImportPreview, ImportError> {
    let (header, data) = rows.split_first().ok_or(ImportError::Empty)?;
    let columns = ColumnMap::from_header(header)?;

    let mut preview_rows = Vec::new();
    let mut invalid = Vec::new();
    let mut total = 0;

    for (idx, row) in data.iter().enumerate() {
        if is_blank(row) {
            continue;
        }
        total += 1;
        // Header is row 1.
        let row_number = idx + 2;
        match columns.map_row(row, row_number) {
            Some(r) => preview_rows.push(r),
            None => invalid.push(row_number),
        }
    }

    if !invalid.is_empty() {
        return Err(ImportError::InvalidRows { rows: invalid, total });
    }
    if preview_rows.is_empty() {
        return Err(ImportError::NoDataRows);
    }

    log::debug!("{}: {} row(s) ready to import", file_name, preview_rows.len());
    Ok(ImportPreview { file_name: file_name.to_string(), rows: preview_rows })
}

/// Tokenize and validate CSV text.
pub fn parse_import(file_name: &str, text: &str) -> Result<ImportPreview, ImportError> {
    build_preview(file_name, &tokenize(text))
}

/// Read a CSV file from disk and validate it.
pub fn import_file(path: &Path) -> Result<ImportPreview, ImportError> {
    let text = read_file_as_utf8(path).map_err(ImportError::Io)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_import(&file_name, &text)
}
