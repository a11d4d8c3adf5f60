// CSV tokenize / serialize for transaction import and export

use std::io::Read;
use std::path::Path;

use serde::Serialize;

use tally_core::Transaction;

/// Column order for exports; imports accept these names in any order.
pub const CSV_HEADER: [&str; 5] = ["date", "type", "category", "amount", "description"];

/// Split raw CSV text into rows of fields.
///
/// Single pass with an in-quotes flag. Outside quotes `,` ends a field,
/// `\n` ends a row, `\r` is dropped and `"` opens a quoted section.
/// Inside quotes `""` is a literal quote, a lone `"` closes, and everything
/// else (commas and newlines included) is kept. A trailing row without a
/// final newline is still emitted. Fields are not trimmed.
pub fn tokenize(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            '\r' => {}
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

/// One exported line. Numbers are written with their shortest display form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub date: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub category: String,
    pub amount: f64,
    pub description: String,
}

impl From<&Transaction> for ExportRow {
    fn from(tx: &Transaction) -> Self {
        Self {
            date: tx.date.clone(),
            tx_type: tx.tx_type.as_str().to_string(),
            category: tx.category().into_string(),
            amount: tx.amount,
            description: tx.description.clone().unwrap_or_default(),
        }
    }
}

/// Render rows as CSV: fixed header, every field quoted, `\n`
/// between rows, no trailing newline.
pub fn serialize(rows: &[ExportRow]) -> Result<String, String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER).map_err(|e| e.to_string())?;
    for row in rows {
        writer
            .write_record([
                row.date.clone(),
                row.tx_type.clone(),
                row.category.clone(),
                row.amount.to_string(),
                row.description.clone(),
            ])
            .map_err(|e| e.to_string())?;
    }

    let bytes = writer.into_inner().map_err(|e| e.to_string())?;
    let mut text = String::from_utf8(bytes).map_err(|e| e.to_string())?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Write `transactions` to `path` in export format.
pub fn export_transactions(path: &Path, transactions: &[Transaction]) -> Result<usize, String> {
    let rows: Vec<ExportRow> = transactions.iter().map(ExportRow::from).collect();
    let text = serialize(&rows)?;
    std::fs::write(path, text).map_err(|e| format!("{}: {}", path.display(), e))?;
    log::info!("exported {} transaction(s) to {}", rows.len(), path.display());
    Ok(rows.len())
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            log::debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}
