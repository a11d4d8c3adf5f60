//! `tally import`: validate a CSV file, show the preview, and create the
//! transactions once confirmed with `--yes`.

use std::path::PathBuf;

use tally_api_client::confirm_import;
use tally_core::TransactionCache;
use tally_io::{import_file, ImportPreview};

use crate::context::Context;
use crate::util::{format_amount, render_table};
use crate::{print_json, CliError};

pub(crate) fn preview_table(preview: &ImportPreview) -> String {
    let rows: Vec<Vec<String>> = preview
        .rows
        .iter()
        .map(|r| {
            vec![
                r.row_number.to_string(),
                r.date.clone(),
                r.tx_type.to_string(),
                r.category.to_string(),
                format_amount(r.amount),
                r.description.clone(),
            ]
        })
        .collect();
    render_table(&["ROW", "DATE", "TYPE", "CATEGORY", "AMOUNT", "DESCRIPTION"], &rows, &[0, 4])
}

pub fn cmd_import(ctx: &Context, file: PathBuf, yes: bool, json: bool) -> Result<(), CliError> {
    // Validation runs offline; only the commit needs a session.
    let preview = import_file(&file)?;

    if !yes {
        if json {
            return print_json(&preview);
        }
        println!("{}", preview_table(&preview));
        eprintln!(
            "{}: {} row(s) ready to import; re-run with --yes to create them",
            preview.file_name,
            preview.len()
        );
        return Ok(());
    }

    let client = ctx.authed()?;
    let mut cache = TransactionCache::new(client.list_transactions()?);
    let before = cache.len();
    let summary = confirm_import(client, &preview, &mut cache)?;
    log::debug!("cache grew from {} to {}", before, cache.len());

    if json {
        return print_json(&serde_json::json!({
            "file": preview.file_name,
            "imported": summary.imported,
            "message": summary.message(),
        }));
    }
    eprintln!("{}", summary.message());
    Ok(())
}
