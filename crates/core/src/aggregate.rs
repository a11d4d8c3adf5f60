//! Dashboard aggregates folded from the transaction list.
//!
//! Pure functions: same input, same output. Callers recompute on every
//! change instead of caching.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::category::Category;
use crate::model::{CategoryBudget, MonthKey, MonthPlan, Transaction, TxType};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub month_key: String,
    pub label: String,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeTotal {
    #[serde(flatten)]
    pub month: MonthlyTotal,
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyTotal {
    pub year: i32,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetUsage {
    pub category: Category,
    pub budget: f64,
    pub spent: f64,
    pub remaining: f64,
    pub over_budget: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanVariance {
    pub expected_income: Option<f64>,
    pub actual_income: f64,
    /// `actual_income - expected_income`; `None` when there is no plan.
    pub difference: Option<f64>,
}

// ---------------------------------------------------------------------------
// Monthly
// ---------------------------------------------------------------------------

/// Twelve buckets (Jan–Dec) for `year`, including empty months.
pub fn monthly_totals(transactions: &[Transaction], year: i32) -> Vec<MonthlyTotal> {
    let mut buckets: Vec<MonthlyTotal> = (1..=12)
        .filter_map(|m| MonthKey::new(year, m))
        .map(|key| MonthlyTotal {
            month_key: key.to_string(),
            label: key.label(),
            income: 0.0,
            expense: 0.0,
            balance: 0.0,
        })
        .collect();

    for tx in transactions {
        let Some(key) = tx.month_key() else { continue };
        if key.year != year {
            continue;
        }
        let bucket = &mut buckets[(key.month - 1) as usize];
        match tx.tx_type {
            TxType::Income => bucket.income += tx.amount,
            TxType::Expense => bucket.expense += tx.amount,
        }
    }

    for bucket in &mut buckets {
        bucket.balance = bucket.income - bucket.expense;
    }
    buckets
}

/// Running sum of `balance` in list order. The input is not re-sorted.
pub fn with_cumulative_balance(months: &[MonthlyTotal]) -> Vec<CumulativeTotal> {
    let mut running = 0.0;
    months
        .iter()
        .map(|m| {
            running += m.balance;
            CumulativeTotal { month: m.clone(), cumulative: running }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Per-category totals for one transaction type, largest first.
pub fn category_totals(transactions: &[Transaction], tx_type: TxType) -> Vec<CategoryTotal> {
    let mut sums: BTreeMap<Category, f64> = BTreeMap::new();
    for tx in transactions.iter().filter(|t| t.tx_type == tx_type) {
        *sums.entry(tx.category()).or_insert(0.0) += tx.amount;
    }

    let mut totals: Vec<CategoryTotal> = sums
        .into_iter()
        .map(|(category, total)| CategoryTotal { category, total })
        .collect();
    // Stable sort: equal totals keep BTreeMap (alphabetical) order.
    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals
}

// ---------------------------------------------------------------------------
// Yearly
// ---------------------------------------------------------------------------

pub fn yearly_totals(transactions: &[Transaction]) -> Vec<YearlyTotal> {
    let mut years: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
    for tx in transactions {
        let Some(year) = tx.year() else { continue };
        let entry = years.entry(year).or_insert((0.0, 0.0));
        match tx.tx_type {
            TxType::Income => entry.0 += tx.amount,
            TxType::Expense => entry.1 += tx.amount,
        }
    }

    years
        .into_iter()
        .map(|(year, (income, expense))| YearlyTotal {
            year,
            income,
            expense,
            balance: income - expense,
        })
        .collect()
}

/// Years present in the data plus `current_year`, newest first.
pub fn available_years(transactions: &[Transaction], current_year: i32) -> Vec<i32> {
    let mut years: BTreeSet<i32> = transactions.iter().filter_map(Transaction::year).collect();
    years.insert(current_year);
    years.into_iter().rev().collect()
}

// ---------------------------------------------------------------------------
// Budgets and plans
// ---------------------------------------------------------------------------

/// Spending against each budget of `year`/`month`, in budget order.
pub fn budget_usage(
    transactions: &[Transaction],
    budgets: &[CategoryBudget],
    year: i32,
    month: u32,
) -> Vec<BudgetUsage> {
    let Some(key) = MonthKey::new(year, month) else {
        return Vec::new();
    };

    let spent_by_category: BTreeMap<Category, f64> = category_totals(
        &transactions
            .iter()
            .filter(|t| t.month_key() == Some(key))
            .cloned()
            .collect::<Vec<_>>(),
        TxType::Expense,
    )
    .into_iter()
    .map(|c| (c.category, c.total))
    .collect();

    budgets
        .iter()
        .filter(|b| b.year == year && b.month == month)
        .map(|b| {
            let spent = spent_by_category.get(&b.category).copied().unwrap_or(0.0);
            BudgetUsage {
                category: b.category.clone(),
                budget: b.amount,
                spent,
                remaining: b.amount - spent,
                over_budget: spent > b.amount,
            }
        })
        .collect()
}

pub fn plan_variance(
    transactions: &[Transaction],
    plan: Option<&MonthPlan>,
    year: i32,
    month: u32,
) -> PlanVariance {
    let key = MonthKey::new(year, month);
    let actual_income: f64 = transactions
        .iter()
        .filter(|t| t.tx_type == TxType::Income && key.is_some() && t.month_key() == key)
        .map(|t| t.amount)
        .sum();

    let expected_income = plan
        .filter(|p| p.year == year && p.month == month)
        .map(|p| p.expected_income);

    PlanVariance {
        expected_income,
        actual_income,
        difference: expected_income.map(|e| actual_income - e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: i64, tx_type: TxType, amount: f64, date: &str, category: Option<&str>) -> Transaction {
        Transaction {
            id,
            tx_type,
            amount,
            date: date.into(),
            category: category.map(String::from),
            description: None,
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx(1, TxType::Income, 3000.0, "2024-01-05", Some("salary")),
            tx(2, TxType::Expense, 1200.0, "2024-01-06", Some("rent")),
            tx(3, TxType::Expense, 80.5, "2024-01-20", Some(" food ")),
            tx(4, TxType::Expense, 19.5, "2024-03-02", Some("Food")),
            tx(5, TxType::Income, 3000.0, "2024-03-05", Some("Salary")),
            tx(6, TxType::Expense, 50.0, "2023-12-31", None),
            tx(7, TxType::Income, 100.0, "not-a-date", None),
        ]
    }

    #[test]
    fn empty_list_has_twelve_zero_buckets() {
        let months = monthly_totals(&[], 2024);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].month_key, "2024-01");
        assert_eq!(months[0].label, "Jan");
        assert_eq!(months[11].month_key, "2024-12");
        assert_eq!(months[11].label, "Dec");
        assert!(months.iter().all(|m| m.income == 0.0 && m.expense == 0.0 && m.balance == 0.0));
    }

    #[test]
    fn monthly_buckets_only_count_the_year() {
        let months = monthly_totals(&sample(), 2024);
        assert_eq!(months[0].income, 3000.0);
        assert_eq!(months[0].expense, 1280.5);
        assert_eq!(months[0].balance, 1719.5);
        assert_eq!(months[1].balance, 0.0);
        assert_eq!(months[2].balance, 2980.5);

        let total: f64 = months.iter().map(|m| m.balance).sum();
        assert_eq!(total, 3000.0 + 3000.0 - 1200.0 - 80.5 - 19.5);
    }

    #[test]
    fn cumulative_balance_is_running_sum() {
        let months = monthly_totals(&sample(), 2024);
        let cumulative = with_cumulative_balance(&months);
        assert_eq!(cumulative.len(), 12);
        assert_eq!(cumulative[0].cumulative, 1719.5);
        assert_eq!(cumulative[1].cumulative, 1719.5);
        assert_eq!(cumulative[2].cumulative, 4700.0);
        let sum: f64 = months.iter().map(|m| m.balance).sum();
        assert_eq!(cumulative.last().unwrap().cumulative, sum);
    }

    #[test]
    fn cumulative_keeps_input_order() {
        let mut months = monthly_totals(&sample(), 2024);
        months.reverse();
        let cumulative = with_cumulative_balance(&months);
        assert_eq!(cumulative[0].month.month_key, "2024-12");
        assert_eq!(cumulative[9].cumulative, 2980.5);
    }

    #[test]
    fn cumulative_serializes_flat() {
        let months = monthly_totals(&[], 2024);
        let json = serde_json::to_value(&with_cumulative_balance(&months)[0]).unwrap();
        assert_eq!(json["month_key"], "2024-01");
        assert_eq!(json["cumulative"], 0.0);
    }

    #[test]
    fn category_totals_normalize_and_sort_descending() {
        let totals = category_totals(&sample(), TxType::Expense);
        let names: Vec<&str> = totals.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["Rent", "Food", "Other"]);
        assert_eq!(totals[1].total, 100.0);

        let income = category_totals(&sample(), TxType::Income);
        assert_eq!(income[0].category.as_str(), "Salary");
        assert_eq!(income[0].total, 6000.0);
    }

    #[test]
    fn category_ties_break_alphabetically() {
        let txs = vec![
            tx(1, TxType::Expense, 10.0, "2024-01-01", Some("zoo")),
            tx(2, TxType::Expense, 10.0, "2024-01-01", Some("art")),
        ];
        let totals = category_totals(&txs, TxType::Expense);
        assert_eq!(totals[0].category.as_str(), "Art");
        assert_eq!(totals[1].category.as_str(), "Zoo");
    }

    #[test]
    fn yearly_totals_and_available_years() {
        let years = yearly_totals(&sample());
        assert_eq!(years.len(), 2);
        assert_eq!(years[0].year, 2023);
        assert_eq!(years[0].balance, -50.0);
        assert_eq!(years[1].year, 2024);

        assert_eq!(available_years(&sample(), 2026), vec![2026, 2024, 2023]);
        assert_eq!(available_years(&[], 2026), vec![2026]);
    }

    #[test]
    fn budget_usage_tracks_month_spending() {
        let budgets = vec![
            CategoryBudget { year: 2024, month: 1, category: Category::new("food"), amount: 50.0 },
            CategoryBudget { year: 2024, month: 1, category: Category::new("travel"), amount: 200.0 },
            CategoryBudget { year: 2024, month: 2, category: Category::new("food"), amount: 50.0 },
        ];
        let usage = budget_usage(&sample(), &budgets, 2024, 1);
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0].spent, 80.5);
        assert!(usage[0].over_budget);
        assert_eq!(usage[0].remaining, -30.5);
        assert_eq!(usage[1].spent, 0.0);
        assert!(!usage[1].over_budget);

        assert!(budget_usage(&sample(), &budgets, 2024, 13).is_empty());
    }

    #[test]
    fn plan_variance_compares_income() {
        let plan = MonthPlan { year: 2024, month: 3, expected_income: 3500.0 };
        let v = plan_variance(&sample(), Some(&plan), 2024, 3);
        assert_eq!(v.actual_income, 3000.0);
        assert_eq!(v.difference, Some(-500.0));

        let v = plan_variance(&sample(), None, 2024, 1);
        assert_eq!(v.expected_income, None);
        assert_eq!(v.difference, None);
        assert_eq!(v.actual_income, 3000.0);
    }
}
