//! Filter flags and the session file as the filter's "location".

use clap::Args;

use tally_config::Session;
use tally_core::filter::{parse_category_param, parse_month_param, parse_type_param};
use tally_core::{FilterState, FilterSync, History};

use crate::CliError;

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Year (default: the saved filter, then the current year)
    #[arg(long)]
    pub year: Option<i32>,
    /// Month 1-12, or "all"
    #[arg(long)]
    pub month: Option<String>,
    /// income, expense or all
    #[arg(long = "type")]
    pub tx_type: Option<String>,
    /// Category name, or "all"
    #[arg(long)]
    pub category: Option<String>,
    /// Whole filter as a query string, applied before the other flags
    #[arg(long)]
    pub query: Option<String>,
    /// Use the filter for this run only
    #[arg(long)]
    pub no_save: bool,
}

/// Session-backed history: `filter_query` is the current location.
pub struct SessionHistory<'a> {
    session: &'a mut Session,
}

impl<'a> SessionHistory<'a> {
    pub fn new(session: &'a mut Session) -> Self {
        Self { session }
    }
}

impl History for SessionHistory<'_> {
    fn current_query(&self) -> String {
        self.session.filter_query.clone()
    }

    fn push(&mut self, query: String) {
        self.session.push_query(query);
    }

    fn replace(&mut self, query: String) {
        self.session.replace_query(query);
    }
}

/// Overlay explicit flags on `state`. Unparseable values fall back to "all".
pub fn apply_flags(mut state: FilterState, args: &FilterArgs) -> FilterState {
    if let Some(year) = args.year {
        state.year = year;
    }
    if args.month.is_some() {
        state.month = parse_month_param(args.month.as_deref());
    }
    if args.tx_type.is_some() {
        state.tx_type = parse_type_param(args.tx_type.as_deref());
    }
    if args.category.is_some() {
        state.category = parse_category_param(args.category.as_deref());
    }
    state
}

/// Resolve the filter for this run against `session`. A `--query` counts as
/// navigating to that location; flags are then one local state change.
pub fn resolve_in_session(session: &mut Session, args: &FilterArgs, default_year: i32) -> FilterState {
    if let Some(query) = &args.query {
        session.push_query(query.clone());
    }
    let mut sync = FilterSync::new(SessionHistory::new(session), default_year);
    let next = apply_flags(sync.state().clone(), args);
    sync.set_state(next);
    sync.state().clone()
}

/// Load the session, resolve the filter and save the session back unless
/// `--no-save` was given.
pub fn resolve_filter(args: &FilterArgs, default_year: i32) -> Result<FilterState, CliError> {
    let mut session = Session::load();
    let before = session.clone();
    let state = resolve_in_session(&mut session, args, default_year);

    if !args.no_save && session != before {
        session.save().map_err(|e| CliError::io(format!("could not save session: {}", e)))?;
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{Category, CategoryFilter, MonthFilter, TxType, TypeFilter};

    #[test]
    fn first_run_writes_canonical_query_without_history() {
        let mut session = Session::default();
        let state = resolve_in_session(&mut session, &FilterArgs::default(), 2024);

        assert_eq!(state, FilterState::new(2024));
        assert_eq!(session.filter_query, "year=2024&month=all&type=all&category=all");
        assert!(session.filter_history.is_empty());
    }

    #[test]
    fn flags_push_one_entry() {
        let mut session = Session::default();
        session.replace_query("year=2024&month=all&type=all&category=all".into());

        let args = FilterArgs {
            month: Some("3".into()),
            tx_type: Some("Expense".into()),
            category: Some("  eating out ".into()),
            ..FilterArgs::default()
        };
        let state = resolve_in_session(&mut session, &args, 2024);

        assert_eq!(state.month, MonthFilter::Month(3));
        assert_eq!(state.tx_type, TypeFilter::Only(TxType::Expense));
        assert_eq!(state.category, CategoryFilter::Only(Category::new("Eating Out")));
        assert_eq!(session.filter_query, "year=2024&month=03&type=expense&category=Eating+Out");
        assert_eq!(session.filter_history, vec!["year=2024&month=all&type=all&category=all"]);
    }

    #[test]
    fn saved_filter_is_reused() {
        let mut session = Session::default();
        session.replace_query("year=2022&month=11&type=income&category=all".into());

        let state = resolve_in_session(&mut session, &FilterArgs::default(), 2024);
        assert_eq!(state.year, 2022);
        assert_eq!(state.month, MonthFilter::Month(11));
        assert!(session.filter_history.is_empty());
    }

    #[test]
    fn query_flag_navigates_then_flags_apply() {
        let mut session = Session::default();
        session.replace_query("year=2024&month=all&type=all&category=all".into());

        let args = FilterArgs {
            query: Some("?year=2021&month=13".into()),
            tx_type: Some("income".into()),
            ..FilterArgs::default()
        };
        let state = resolve_in_session(&mut session, &args, 2024);

        assert_eq!(state.year, 2021);
        assert_eq!(state.month, MonthFilter::All);
        assert_eq!(state.tx_type, TypeFilter::Only(TxType::Income));
        assert_eq!(session.filter_query, "year=2021&month=all&type=income&category=all");
    }

    #[test]
    fn invalid_flag_values_mean_all() {
        let args = FilterArgs {
            month: Some("0".into()),
            tx_type: Some("transfer".into()),
            category: Some("ALL".into()),
            ..FilterArgs::default()
        };
        let state = apply_flags(FilterState::new(2024), &args);
        assert_eq!(state, FilterState::new(2024));
    }
}
