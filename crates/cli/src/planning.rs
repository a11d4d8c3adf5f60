//! Budgets, month plans, fixed items and category maintenance.

use chrono::Datelike;

use tally_api_client::{ApiClient, BudgetInput};
use tally_core::aggregate::{budget_usage, plan_variance};
use tally_core::{Category, FixedItem, MonthKey, MonthPlan, NewFixedItem, TxType};
use tally_io::parse_amount;

use crate::context::Context;
use crate::util::{format_amount, render_table};
use crate::{print_json, CliError};

fn parse_amount_arg(raw: &str, what: &str) -> Result<f64, CliError> {
    parse_amount(raw).ok_or_else(|| CliError::args(format!("invalid {} '{}'", what, raw)))
}

/// `food=300` -> (Food, 300.0). The last `=` splits, so category names may
/// contain one.
pub(crate) fn parse_budget_entry(raw: &str) -> Result<BudgetInput, CliError> {
    let (category, amount) = raw
        .rsplit_once('=')
        .ok_or_else(|| CliError::args(format!("invalid budget '{}' (expected CATEGORY=AMOUNT)", raw)))?;
    if category.trim().is_empty() {
        return Err(CliError::args(format!("invalid budget '{}': missing category", raw)));
    }
    Ok(BudgetInput {
        category: Category::new(category),
        amount: parse_amount_arg(amount, "amount")?,
    })
}

/// Later entries for the same category replace earlier ones.
pub(crate) fn parse_budget_entries(entries: &[String]) -> Result<Vec<BudgetInput>, CliError> {
    let mut out: Vec<BudgetInput> = Vec::new();
    for raw in entries {
        let entry = parse_budget_entry(raw)?;
        match out.iter_mut().find(|b| b.category == entry.category) {
            Some(existing) => existing.amount = entry.amount,
            None => out.push(entry),
        }
    }
    Ok(out)
}

// ── Budgets ─────────────────────────────────────────────────────────

pub fn cmd_budget_get(ctx: &Context, year: Option<i32>, month: Option<u32>, json: bool) -> Result<(), CliError> {
    let key = ctx.month_or_current(year, month)?;
    let client = ctx.authed()?;
    let budgets = client.get_budgets(key.year, key.month)?;
    let transactions = client.list_transactions()?;
    let usage = budget_usage(&transactions, &budgets, key.year, key.month);

    if json {
        return print_json(&usage);
    }
    if usage.is_empty() {
        eprintln!("No budgets for {}", key);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = usage
        .iter()
        .map(|u| {
            vec![
                u.category.to_string(),
                format_amount(u.budget),
                format_amount(u.spent),
                format_amount(u.remaining),
                if u.over_budget { "over".to_string() } else { String::new() },
            ]
        })
        .collect();
    println!("{}", render_table(&["CATEGORY", "BUDGET", "SPENT", "REMAINING", ""], &rows, &[1, 2, 3]));
    Ok(())
}

pub fn cmd_budget_set(
    ctx: &Context,
    year: Option<i32>,
    month: Option<u32>,
    entries: Vec<String>,
) -> Result<(), CliError> {
    let key = ctx.month_or_current(year, month)?;
    let items = parse_budget_entries(&entries)?;
    let saved = ctx.authed()?.put_budgets(key.year, key.month, &items)?;
    log::debug!("backend returned {} budget(s)", saved.len());
    eprintln!("Saved {} budget(s) for {}", items.len(), key);
    Ok(())
}

// ── Month plan ──────────────────────────────────────────────────────

pub fn cmd_plan_get(ctx: &Context, year: Option<i32>, month: Option<u32>, json: bool) -> Result<(), CliError> {
    let key = ctx.month_or_current(year, month)?;
    let client = ctx.authed()?;
    let plan = client.get_month_plan(key.year, key.month)?;
    let transactions = client.list_transactions()?;
    let variance = plan_variance(&transactions, plan.as_ref(), key.year, key.month);

    if json {
        return print_json(&variance);
    }

    let expected = variance.expected_income.map(format_amount).unwrap_or_else(|| "-".into());
    let difference = variance.difference.map(format_amount).unwrap_or_else(|| "-".into());
    println!("{}", key);
    println!("  expected income  {}", expected);
    println!("  actual income    {}", format_amount(variance.actual_income));
    println!("  difference       {}", difference);
    Ok(())
}

pub fn cmd_plan_set(ctx: &Context, year: Option<i32>, month: Option<u32>, income: String) -> Result<(), CliError> {
    let key = ctx.month_or_current(year, month)?;
    let plan = MonthPlan {
        year: key.year,
        month: key.month,
        expected_income: parse_amount_arg(&income, "income")?,
    };
    let saved = ctx.authed()?.put_month_plan(&plan)?;
    eprintln!("Expected income for {}: {}", key, format_amount(saved.expected_income));
    Ok(())
}

// ── Fixed items ─────────────────────────────────────────────────────

pub fn cmd_fixed_list(ctx: &Context, json: bool) -> Result<(), CliError> {
    let items = ctx.authed()?.list_fixed_items()?;
    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        eprintln!("No fixed items");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|i| {
            vec![
                i.id.to_string(),
                i.tx_type.to_string(),
                Category::from_option(i.category.as_deref()).into_string(),
                format_amount(i.amount),
                i.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    println!("{}", render_table(&["ID", "TYPE", "CATEGORY", "AMOUNT", "DESCRIPTION"], &rows, &[3]));
    Ok(())
}

pub fn cmd_fixed_add(
    ctx: &Context,
    tx_type: String,
    amount: String,
    category: Option<String>,
    description: Option<String>,
) -> Result<(), CliError> {
    let item = NewFixedItem {
        tx_type: tx_type.parse::<TxType>().map_err(CliError::args)?,
        amount: parse_amount_arg(&amount, "amount")?,
        category: Some(Category::from_option(category.as_deref()).into_string()),
        description: description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
    };
    let created = ctx.authed()?.create_fixed_item(&item)?;
    eprintln!("Created fixed item #{}", created.id);
    Ok(())
}

/// Overlay the given fields on item `id` and save it. An empty
/// `--description` clears it.
pub fn cmd_fixed_edit(
    ctx: &Context,
    id: i64,
    tx_type: Option<String>,
    amount: Option<String>,
    category: Option<String>,
    description: Option<String>,
) -> Result<(), CliError> {
    if tx_type.is_none() && amount.is_none() && category.is_none() && description.is_none() {
        return Err(CliError::args("Nothing to change: pass --type, --amount, --category or --description"));
    }

    let client = ctx.authed()?;
    let current = find_fixed_item(client, id)?;

    let mut item = NewFixedItem {
        tx_type: current.tx_type,
        amount: current.amount,
        category: current.category,
        description: current.description,
    };
    if let Some(raw) = tx_type {
        item.tx_type = raw.parse::<TxType>().map_err(CliError::args)?;
    }
    if let Some(raw) = amount {
        item.amount = parse_amount_arg(&raw, "amount")?;
    }
    if let Some(raw) = category {
        item.category = Some(Category::new(&raw).into_string());
    }
    if let Some(raw) = description {
        item.description = Some(raw.trim().to_string()).filter(|d| !d.is_empty());
    }

    let updated = client.update_fixed_item(id, &item)?;
    eprintln!("Updated fixed item #{}", updated.id);
    Ok(())
}

pub fn cmd_fixed_delete(ctx: &Context, id: i64) -> Result<(), CliError> {
    ctx.authed()?.delete_fixed_item(id)?;
    eprintln!("Deleted fixed item #{}", id);
    Ok(())
}

pub fn cmd_fixed_apply(ctx: &Context, id: i64, month: Option<String>) -> Result<(), CliError> {
    let key = match month {
        Some(raw) => raw.parse::<MonthKey>().map_err(CliError::args)?,
        None => {
            let today = chrono::Local::now().date_naive();
            MonthKey::new(today.year(), today.month())
                .ok_or_else(|| CliError::general("could not determine the current month"))?
        }
    };

    let client = ctx.authed()?;
    let item = find_fixed_item(client, id)?;

    let tx = client.apply_fixed_item(&item, key)?;
    eprintln!("Created transaction #{} dated {}", tx.id, tx.date);
    Ok(())
}

fn find_fixed_item(client: &ApiClient, id: i64) -> Result<FixedItem, CliError> {
    client
        .list_fixed_items()?
        .into_iter()
        .find(|i| i.id == id)
        .ok_or_else(|| CliError::general(format!("Fixed item #{} not found", id)))
}

// ── Categories ──────────────────────────────────────────────────────

pub fn cmd_categories_merge(ctx: &Context, from: Vec<String>, into: String) -> Result<(), CliError> {
    let target = Category::new(&into);
    let sources: Vec<Category> = from
        .iter()
        .map(|c| Category::new(c))
        .filter(|c| c != &target)
        .collect();
    if sources.is_empty() {
        return Err(CliError::args("Nothing to merge: every source is already the target"));
    }

    let result = ctx.authed()?.merge_categories(&sources, &target)?;
    eprintln!("Moved {} transaction(s) into {}", result.updated, target);
    Ok(())
}
