//! `tally tx ...` and `tally export`.

use std::path::PathBuf;

use tally_core::{filter_transactions, Category, NewTransaction, Transaction, TxType};
use tally_io::{export_transactions, parse_amount};

use crate::context::Context;
use crate::filters::{resolve_filter, FilterArgs};
use crate::util::{format_amount, render_table};
use crate::{print_json, CliError, TxFields};

pub(crate) fn transaction_table(transactions: &[Transaction]) -> String {
    let rows: Vec<Vec<String>> = transactions
        .iter()
        .map(|t| {
            vec![
                t.id.to_string(),
                t.date.clone(),
                t.tx_type.to_string(),
                t.category().into_string(),
                format_amount(t.amount),
                t.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    render_table(&["ID", "DATE", "TYPE", "CATEGORY", "AMOUNT", "DESCRIPTION"], &rows, &[4])
}

fn parse_type_flag(raw: &str) -> Result<TxType, CliError> {
    raw.parse::<TxType>().map_err(CliError::args)
}

fn parse_amount_flag(raw: &str) -> Result<f64, CliError> {
    parse_amount(raw).ok_or_else(|| CliError::args(format!("invalid amount '{}'", raw)))
}

fn parse_date_flag(raw: &str) -> Result<String, CliError> {
    let date = raw.trim();
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| date.to_string())
        .map_err(|_| CliError::args(format!("invalid date '{}' (expected YYYY-MM-DD)", raw)))
}

fn optional_text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Build a new transaction from flags. Type, amount and date are required;
/// the category is normalized.
pub(crate) fn new_from_fields(fields: TxFields) -> Result<NewTransaction, CliError> {
    let tx_type = fields.tx_type.as_deref().ok_or_else(|| CliError::args("--type is required"))?;
    let amount = fields.amount.as_deref().ok_or_else(|| CliError::args("--amount is required"))?;
    let date = fields.date.as_deref().ok_or_else(|| CliError::args("--date is required"))?;

    Ok(NewTransaction {
        tx_type: parse_type_flag(tx_type)?,
        amount: parse_amount_flag(amount)?,
        date: parse_date_flag(date)?,
        category: Some(Category::from_option(fields.category.as_deref()).into_string()),
        description: optional_text(fields.description),
    })
}

/// Overlay the flags that were given on an existing transaction.
pub(crate) fn edit_from_fields(existing: &Transaction, fields: TxFields) -> Result<NewTransaction, CliError> {
    let mut tx = NewTransaction::from(existing);
    if let Some(t) = fields.tx_type.as_deref() {
        tx.tx_type = parse_type_flag(t)?;
    }
    if let Some(a) = fields.amount.as_deref() {
        tx.amount = parse_amount_flag(a)?;
    }
    if let Some(d) = fields.date.as_deref() {
        tx.date = parse_date_flag(d)?;
    }
    if let Some(c) = fields.category.as_deref() {
        tx.category = Some(Category::new(c).into_string());
    }
    if let Some(d) = fields.description {
        tx.description = optional_text(Some(d));
    }
    Ok(tx)
}

pub fn cmd_list(ctx: &Context, filter: &FilterArgs, json: bool) -> Result<(), CliError> {
    let client = ctx.authed()?;
    let state = resolve_filter(filter, ctx.default_year())?;
    let all = client.list_transactions()?;
    let shown = filter_transactions(&all, &state);

    if json {
        return print_json(&serde_json::json!({ "filter": state, "transactions": shown }));
    }

    eprintln!("filter: {}", state.to_query());
    if shown.is_empty() {
        eprintln!("No transactions match");
        return Ok(());
    }
    println!("{}", transaction_table(&shown));
    Ok(())
}

pub fn cmd_add(ctx: &Context, fields: TxFields, json: bool) -> Result<(), CliError> {
    let new_tx = new_from_fields(fields)?;
    let client = ctx.authed()?;
    let created = client.create_transaction(&new_tx)?;
    if json {
        return print_json(&created);
    }
    eprintln!("Created transaction #{}", created.id);
    Ok(())
}

pub fn cmd_edit(ctx: &Context, id: i64, fields: TxFields, json: bool) -> Result<(), CliError> {
    let client = ctx.authed()?;
    let existing = client
        .list_transactions()?
        .into_iter()
        .find(|t| t.id == id)
        .ok_or_else(|| CliError::general(format!("Transaction #{} not found", id)))?;

    let update = edit_from_fields(&existing, fields)?;
    let updated = client.update_transaction(id, &update)?;
    if json {
        return print_json(&updated);
    }
    eprintln!("Updated transaction #{}", updated.id);
    Ok(())
}

pub fn cmd_delete(ctx: &Context, id: i64) -> Result<(), CliError> {
    ctx.authed()?.delete_transaction(id)?;
    eprintln!("Deleted transaction #{}", id);
    Ok(())
}

pub fn cmd_export(ctx: &Context, file: PathBuf, filter: &FilterArgs) -> Result<(), CliError> {
    let client = ctx.authed()?;
    let state = resolve_filter(filter, ctx.default_year())?;
    let all = client.list_transactions()?;
    let rows = filter_transactions(&all, &state);

    let count = export_transactions(&file, &rows).map_err(CliError::io)?;
    eprintln!("Exported {} transaction(s) to {}", count, file.display());
    Ok(())
}
