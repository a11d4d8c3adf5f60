//! Tally API client.
//!
//! Blocking wrapper over the budgeting backend's REST endpoints: auth,
//! profile, transactions, budgets, month plans, fixed items and category
//! merge. Also owns the concurrent import commit.
//!
//! No retries, no backoff. A 401 anywhere drops the cached token.

mod abort;
mod auth;
mod client;
mod import;

pub use abort::AbortSignal;
pub use auth::{delete_auth, load_auth, save_auth, AuthCredentials};
pub use client::{
    extract_error_message, ApiClient, ApiError, AuthResponse, BudgetInput, MergeResult, NewUser,
    PasswordChange, PasswordReset, ProfileUpdate, VerificationStatus,
};
pub use import::{confirm_import, ImportCommitError, ImportSummary, IMPORT_WORKERS};
