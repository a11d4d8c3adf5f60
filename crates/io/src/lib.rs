// File I/O - CSV import/export of transactions

pub mod csv;
pub mod import;

pub use crate::csv::{export_transactions, read_file_as_utf8, serialize, tokenize, ExportRow, CSV_HEADER};
pub use import::{build_preview, import_file, parse_amount, parse_import, ImportError, ImportPreview, ImportPreviewRow};
