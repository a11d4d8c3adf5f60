//! Filter state (year / month / type / category) and its query-string form.
//!
//! The query string is the shareable representation of the current view.
//! [`FilterSync`] keeps the in-memory state and a [`History`] in step:
//! local changes are written out, location changes are read in, and a
//! location-driven update never writes itself back.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use url::form_urlencoded;

use crate::category::Category;
use crate::model::{MonthKey, Transaction, TxType};

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthFilter {
    #[default]
    All,
    /// Always within 1..=12.
    Month(u32),
}

impl fmt::Display for MonthFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Month(m) => write!(f, "{:02}", m),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Only(TxType),
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(t) => f.write_str(t.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(c) => f.write_str(c.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Param parsing
// ---------------------------------------------------------------------------

pub fn parse_year_param(raw: Option<&str>, default: i32) -> i32 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

/// `"9"` and `"09"` both select September; `"0"`, `"13"`, `"abc"` mean all.
pub fn parse_month_param(raw: Option<&str>) -> MonthFilter {
    let Some(value) = raw.map(str::trim) else {
        return MonthFilter::All;
    };
    if value.is_empty() || value.len() > 2 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return MonthFilter::All;
    }
    match value.parse::<u32>() {
        Ok(m) if (1..=12).contains(&m) => MonthFilter::Month(m),
        _ => MonthFilter::All,
    }
}

pub fn parse_type_param(raw: Option<&str>) -> TypeFilter {
    raw.and_then(TxType::parse).map(TypeFilter::Only).unwrap_or_default()
}

pub fn parse_category_param(raw: Option<&str>) -> CategoryFilter {
    match raw.map(str::trim) {
        None => CategoryFilter::All,
        Some(v) if v.is_empty() || v.eq_ignore_ascii_case("all") => CategoryFilter::All,
        Some(v) => CategoryFilter::Only(Category::new(v)),
    }
}

// ---------------------------------------------------------------------------
// Filter state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub year: i32,
    pub month: MonthFilter,
    pub tx_type: TypeFilter,
    pub category: CategoryFilter,
}

impl FilterState {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            month: MonthFilter::All,
            tx_type: TypeFilter::All,
            category: CategoryFilter::All,
        }
    }

    /// Parse `year=..&month=..&type=..&category=..` (leading `?` optional).
    /// The first occurrence of a repeated key wins.
    pub fn from_query(query: &str, default_year: i32) -> Self {
        let mut params: HashMap<String, String> = HashMap::new();
        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
        }
        let get = |k: &str| params.get(k).map(String::as_str);

        Self {
            year: parse_year_param(get("year"), default_year),
            month: parse_month_param(get("month")),
            tx_type: parse_type_param(get("type")),
            category: parse_category_param(get("category")),
        }
    }

    pub fn to_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("year", &self.year.to_string())
            .append_pair("month", &self.month.to_string())
            .append_pair("type", &self.tx_type.to_string())
            .append_pair("category", &self.category.to_string())
            .finish()
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        let Some(key) = tx.month_key() else {
            return false;
        };
        if key.year != self.year {
            return false;
        }
        if let MonthFilter::Month(m) = self.month {
            if key.month != m {
                return false;
            }
        }
        if let TypeFilter::Only(t) = self.tx_type {
            if tx.tx_type != t {
                return false;
            }
        }
        if let CategoryFilter::Only(c) = &self.category {
            if &tx.category() != c {
                return false;
            }
        }
        true
    }

    /// The single month selected, if any.
    pub fn month_key(&self) -> Option<MonthKey> {
        match self.month {
            MonthFilter::All => None,
            MonthFilter::Month(m) => MonthKey::new(self.year, m),
        }
    }
}

impl Serialize for FilterState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("FilterState", 4)?;
        s.serialize_field("year", &self.year)?;
        s.serialize_field("month", &self.month.to_string())?;
        s.serialize_field("type", &self.tx_type.to_string())?;
        s.serialize_field("category", &self.category.to_string())?;
        s.end()
    }
}

/// Transactions matching `filter`, newest first (date, then id).
pub fn filter_transactions(transactions: &[Transaction], filter: &FilterState) -> Vec<Transaction> {
    let mut out: Vec<Transaction> = transactions.iter().filter(|t| filter.matches(t)).cloned().collect();
    out.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    out
}

// ---------------------------------------------------------------------------
// History sync
// ---------------------------------------------------------------------------

/// Where the query string lives (browser location, session file, …).
pub trait History {
    fn current_query(&self) -> String;
    fn push(&mut self, query: String);
    fn replace(&mut self, query: String);
}

/// In-process history stack.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    entries: Vec<String>,
}

impl MemoryHistory {
    pub fn new(initial: impl Into<String>) -> Self {
        Self { entries: vec![initial.into()] }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl History for MemoryHistory {
    fn current_query(&self) -> String {
        self.entries.last().cloned().unwrap_or_default()
    }

    fn push(&mut self, query: String) {
        self.entries.push(query);
    }

    fn replace(&mut self, query: String) {
        match self.entries.last_mut() {
            Some(last) => *last = query,
            None => self.entries.push(query),
        }
    }
}

/// Keeps a [`FilterState`] and a [`History`] in step.
pub struct FilterSync<H: History> {
    state: FilterState,
    history: H,
    default_year: i32,
    written_once: bool,
}

impl<H: History> FilterSync<H> {
    /// Read the initial state from `history`, then write the canonical form
    /// back with replace semantics so mounting adds no history entry.
    pub fn new(history: H, default_year: i32) -> Self {
        let state = FilterState::from_query(&history.current_query(), default_year);
        let mut sync = Self { state, history, default_year, written_once: false };
        sync.write();
        sync
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn into_history(self) -> H {
        self.history
    }

    pub fn set_state(&mut self, state: FilterState) {
        if state == self.state {
            return;
        }
        self.state = state;
        self.write();
    }

    pub fn set_year(&mut self, year: i32) {
        let next = FilterState { year, ..self.state.clone() };
        self.set_state(next);
    }

    pub fn set_month(&mut self, month: MonthFilter) {
        let next = FilterState { month, ..self.state.clone() };
        self.set_state(next);
    }

    pub fn set_type(&mut self, tx_type: TypeFilter) {
        let next = FilterState { tx_type, ..self.state.clone() };
        self.set_state(next);
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        let next = FilterState { category, ..self.state.clone() };
        self.set_state(next);
    }

    /// Location changed externally (back button, pasted link). Adopt the
    /// parsed state without writing to history.
    pub fn on_location_change(&mut self, query: &str) {
        self.state = FilterState::from_query(query, self.default_year);
    }

    fn write(&mut self) {
        let query = self.state.to_query();
        if query == self.history.current_query() {
            self.written_once = true;
            return;
        }
        if self.written_once {
            log::debug!("filter: push {query}");
            self.history.push(query);
        } else {
            log::debug!("filter: replace {query}");
            self.history.replace(query);
            self.written_once = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_param_edges() {
        assert_eq!(parse_month_param(Some("13")), MonthFilter::All);
        assert_eq!(parse_month_param(Some("0")), MonthFilter::All);
        assert_eq!(parse_month_param(Some("00")), MonthFilter::All);
        assert_eq!(parse_month_param(Some("9")).to_string(), "09");
        assert_eq!(parse_month_param(Some("09")), MonthFilter::Month(9));
        assert_eq!(parse_month_param(Some("12")), MonthFilter::Month(12));
        assert_eq!(parse_month_param(Some("all")), MonthFilter::All);
        assert_eq!(parse_month_param(Some("009")), MonthFilter::All);
        assert_eq!(parse_month_param(Some("+9")), MonthFilter::All);
        assert_eq!(parse_month_param(None), MonthFilter::All);
    }

    #[test]
    fn year_param_falls_back() {
        assert_eq!(parse_year_param(Some("2023"), 2026), 2023);
        assert_eq!(parse_year_param(Some("twenty"), 2026), 2026);
        assert_eq!(parse_year_param(Some(""), 2026), 2026);
        assert_eq!(parse_year_param(None, 2026), 2026);
    }

    #[test]
    fn type_and_category_params() {
        assert_eq!(parse_type_param(Some("INCOME")), TypeFilter::Only(TxType::Income));
        assert_eq!(parse_type_param(Some("transfer")), TypeFilter::All);
        assert_eq!(parse_category_param(Some("ALL")), CategoryFilter::All);
        assert_eq!(parse_category_param(Some("food")), CategoryFilter::Only(Category::new("Food")));
        assert_eq!(parse_category_param(Some("food")).to_string(), "Food");
        assert_eq!(parse_category_param(Some("")), CategoryFilter::All);
    }

    #[test]
    fn query_round_trip() {
        let state = FilterState {
            year: 2024,
            month: MonthFilter::Month(3),
            tx_type: TypeFilter::Only(TxType::Expense),
            category: CategoryFilter::Only(Category::new("eating out")),
        };
        let q = state.to_query();
        assert_eq!(q, "year=2024&month=03&type=expense&category=Eating+Out");
        assert_eq!(FilterState::from_query(&format!("?{q}"), 1999), state);
    }

    #[test]
    fn from_query_defaults() {
        let state = FilterState::from_query("", 2026);
        assert_eq!(state, FilterState::new(2026));
        let state = FilterState::from_query("month=7&month=8", 2026);
        assert_eq!(state.month, MonthFilter::Month(7));
    }

    fn tx(id: i64, tx_type: TxType, date: &str, category: &str) -> Transaction {
        Transaction {
            id,
            tx_type,
            amount: 1.0,
            date: date.into(),
            category: Some(category.into()),
            description: None,
        }
    }

    #[test]
    fn filter_transactions_applies_all_dimensions() {
        let txs = vec![
            tx(1, TxType::Expense, "2024-03-01", "food"),
            tx(2, TxType::Expense, "2024-03-09", "Food"),
            tx(3, TxType::Income, "2024-03-09", "food"),
            tx(4, TxType::Expense, "2024-04-01", "food"),
            tx(5, TxType::Expense, "2023-03-01", "food"),
            tx(6, TxType::Expense, "2024-03-09", "rent"),
        ];
        let filter = FilterState {
            year: 2024,
            month: MonthFilter::Month(3),
            tx_type: TypeFilter::Only(TxType::Expense),
            category: CategoryFilter::Only(Category::new("FOOD")),
        };
        let ids: Vec<i64> = filter_transactions(&txs, &filter).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1]);

        let year_only = FilterState::new(2024);
        let ids: Vec<i64> = filter_transactions(&txs, &year_only).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![4, 6, 3, 2, 1]);
    }

    #[test]
    fn first_write_replaces_then_pushes() {
        let history = MemoryHistory::new("month=9");
        let mut sync = FilterSync::new(history, 2026);
        assert_eq!(sync.history().entries().len(), 1);
        assert_eq!(sync.history().current_query(), "year=2026&month=09&type=all&category=all");

        sync.set_type(TypeFilter::Only(TxType::Income));
        assert_eq!(sync.history().entries().len(), 2);
        assert!(sync.history().current_query().contains("type=income"));

        // No-op change writes nothing.
        sync.set_type(TypeFilter::Only(TxType::Income));
        assert_eq!(sync.history().entries().len(), 2);
    }

    #[test]
    fn location_change_does_not_write_back() {
        let mut sync = FilterSync::new(MemoryHistory::new(""), 2026);
        let before = sync.history().entries().to_vec();

        sync.on_location_change("year=2020&month=1&category=travel");
        assert_eq!(sync.state().year, 2020);
        assert_eq!(sync.state().month, MonthFilter::Month(1));
        assert_eq!(sync.history().entries(), before.as_slice());

        sync.set_year(2021);
        assert_eq!(sync.history().entries().len(), before.len() + 1);
        assert!(sync.history().current_query().starts_with("year=2021&month=01"));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn month_filter() -> impl Strategy<Value = MonthFilter> {
            prop_oneof![Just(MonthFilter::All), (1u32..=12).prop_map(MonthFilter::Month)]
        }

        fn type_filter() -> impl Strategy<Value = TypeFilter> {
            prop_oneof![
                Just(TypeFilter::All),
                Just(TypeFilter::Only(TxType::Income)),
                Just(TypeFilter::Only(TxType::Expense)),
            ]
        }

        fn category_filter() -> impl Strategy<Value = CategoryFilter> {
            prop_oneof![
                Just(CategoryFilter::All),
                "[a-z&=+?%]{2,8}( [a-z]{2,8})?"
                    .prop_filter("reserved", |s| !s.eq_ignore_ascii_case("all"))
                    .prop_map(|s| CategoryFilter::Only(Category::new(&s))),
            ]
        }

        proptest! {
            #[test]
            fn query_round_trips(
                year in 1900i32..2100,
                month in month_filter(),
                tx_type in type_filter(),
                category in category_filter(),
            ) {
                let state = FilterState { year, month, tx_type, category };
                let parsed = FilterState::from_query(&state.to_query(), 2000);
                prop_assert_eq!(parsed, state);
            }
        }
    }
}
