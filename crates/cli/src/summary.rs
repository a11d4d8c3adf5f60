//! `tally summary`: the dashboard numbers for one year.

use serde::Serialize;

use tally_core::aggregate::{
    available_years, category_totals, monthly_totals, with_cumulative_balance, yearly_totals, CategoryTotal,
    CumulativeTotal, YearlyTotal,
};
use tally_core::{Transaction, TxType};

use crate::context::{current_year, Context};
use crate::util::{format_amount, render_table};
use crate::{print_json, CliError};

#[derive(Debug, Serialize)]
pub(crate) struct YearSummary {
    pub year: i32,
    pub available_years: Vec<i32>,
    pub months: Vec<CumulativeTotal>,
    pub income_by_category: Vec<CategoryTotal>,
    pub expense_by_category: Vec<CategoryTotal>,
    pub totals: Option<YearlyTotal>,
}

pub(crate) fn summarize(transactions: &[Transaction], year: i32) -> YearSummary {
    let in_year: Vec<Transaction> = transactions.iter().filter(|t| t.year() == Some(year)).cloned().collect();

    YearSummary {
        year,
        available_years: available_years(transactions, current_year()),
        months: with_cumulative_balance(&monthly_totals(transactions, year)),
        income_by_category: category_totals(&in_year, TxType::Income),
        expense_by_category: category_totals(&in_year, TxType::Expense),
        totals: yearly_totals(transactions).into_iter().find(|y| y.year == year),
    }
}

fn category_table(totals: &[CategoryTotal]) -> String {
    let rows: Vec<Vec<String>> = totals
        .iter()
        .map(|c| vec![c.category.to_string(), format_amount(c.total)])
        .collect();
    render_table(&["CATEGORY", "TOTAL"], &rows, &[1])
}

pub fn cmd_summary(ctx: &Context, year: Option<i32>, json: bool) -> Result<(), CliError> {
    let client = ctx.authed()?;
    let year = year.unwrap_or_else(|| ctx.default_year());
    let transactions = client.list_transactions()?;
    let summary = summarize(&transactions, year);

    if json {
        return print_json(&summary);
    }

    let rows: Vec<Vec<String>> = summary
        .months
        .iter()
        .map(|m| {
            vec![
                m.month.label.clone(),
                format_amount(m.month.income),
                format_amount(m.month.expense),
                format_amount(m.month.balance),
                format_amount(m.cumulative),
            ]
        })
        .collect();
    println!("{}", render_table(&["MONTH", "INCOME", "EXPENSE", "BALANCE", "CUMULATIVE"], &rows, &[1, 2, 3, 4]));

    if let Some(t) = &summary.totals {
        println!(
            "\n{}: income {}  expense {}  balance {}",
            year,
            format_amount(t.income),
            format_amount(t.expense),
            format_amount(t.balance)
        );
    }
    if !summary.income_by_category.is_empty() {
        println!("\nIncome by category\n{}", category_table(&summary.income_by_category));
    }
    if !summary.expense_by_category.is_empty() {
        println!("\nExpense by category\n{}", category_table(&summary.expense_by_category));
    }
    Ok(())
}
