//! `tally-core` - domain types and pure client-side logic.
//!
//! No IO, no HTTP. Everything here is recomputed from the in-memory
//! transaction list and is safe to call on every data change.

pub mod aggregate;
pub mod cache;
pub mod category;
pub mod filter;
pub mod model;

pub use cache::TransactionCache;
pub use category::{normalize_category, Category};
pub use filter::{
    filter_transactions, CategoryFilter, FilterState, FilterSync, History, MemoryHistory,
    MonthFilter, TypeFilter,
};
pub use model::{
    CategoryBudget, FixedItem, MonthKey, MonthPlan, NewFixedItem, NewTransaction, Transaction,
    TxType, User,
};
