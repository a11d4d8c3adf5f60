// Tally CLI - budget tracking against the Tally backend

mod account;
mod context;
mod exit_codes;
mod filters;
mod import;
mod planning;
mod summary;
mod transactions;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use tally_api_client::{ApiError, ImportCommitError};
use tally_io::ImportError;

use exit_codes::{
    api_exit_code, import_exit_code, EXIT_API_NETWORK, EXIT_API_NOT_AUTH, EXIT_ERROR, EXIT_IMPORT_PARTIAL,
    EXIT_IO, EXIT_SUCCESS, EXIT_USAGE,
};
use filters::FilterArgs;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Personal budget tracker (command line)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides settings.json and TALLY_API_BASE)
    #[arg(long, global = true, value_name = "URL")]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Prompted for when omitted and stdin is a terminal
        #[arg(long, env = "TALLY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log in and remember the token
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted and stdin is a terminal
        #[arg(long, env = "TALLY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log out and forget the token
    Logout,

    /// Show the logged-in user
    Whoami {
        /// Give up after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        #[arg(long)]
        json: bool,
    },

    /// Send a verification email, or show verification status
    VerifyEmail {
        /// Only report whether the address is verified
        #[arg(long)]
        status: bool,
    },

    /// Email a password reset link
    ForgotPassword { email: String },

    /// Set a new password with the token from the reset email
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "TALLY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Profile settings
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// List, add, edit and delete transactions
    #[command(subcommand)]
    Tx(TxCommands),

    /// Validate a CSV file and (with --yes) create its transactions
    #[command(after_help = "\
The file needs the columns date,type,category,amount,description in any
order. Any invalid row rejects the whole file.

Examples:
  tally import january.csv
  tally import january.csv --yes")]
    Import {
        file: PathBuf,
        /// Create the transactions instead of only previewing them
        #[arg(long)]
        yes: bool,
        #[arg(long)]
        json: bool,
    },

    /// Write the filtered transactions to a CSV file
    Export {
        file: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Monthly totals, running balance and category totals for a year
    Summary {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        json: bool,
    },

    /// Per-category monthly budgets
    #[command(subcommand)]
    Budget(BudgetCommands),

    /// Expected income for a month
    #[command(subcommand)]
    Plan(PlanCommands),

    /// Recurring monthly items
    #[command(subcommand)]
    Fixed(FixedCommands),

    /// Category maintenance
    #[command(subcommand)]
    Categories(CategoryCommands),
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Change name and/or email
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Change password
    Password {
        #[arg(long, env = "TALLY_PASSWORD", hide_env_values = true)]
        current: Option<String>,
        #[arg(long = "new", env = "TALLY_NEW_PASSWORD", hide_env_values = true)]
        new_password: Option<String>,
    },
    /// Replace preferences with a JSON object
    Preferences { json: String },
    /// Delete the account
    Delete {
        #[arg(long, env = "TALLY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Required; there is no undo
        #[arg(long)]
        yes: bool,
    },
}

/// Fields shared by `tx add` and `tx edit`.
#[derive(Args, Debug, Clone, Default)]
pub struct TxFields {
    /// income or expense
    #[arg(long = "type")]
    pub tx_type: Option<String>,
    #[arg(long)]
    pub amount: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Subcommand)]
enum TxCommands {
    /// List transactions matching the saved filter (flags update it)
    #[command(after_help = "\
The filter is remembered between runs.

Examples:
  tally tx list --year 2024 --month 3
  tally tx list --type expense --category food
  tally tx list --query 'year=2023&month=all&type=all&category=all'")]
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// Create a transaction
    Add {
        #[command(flatten)]
        fields: TxFields,
        #[arg(long)]
        json: bool,
    },
    /// Change fields of an existing transaction
    Edit {
        id: i64,
        #[command(flatten)]
        fields: TxFields,
        #[arg(long)]
        json: bool,
    },
    /// Delete a transaction
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum BudgetCommands {
    /// Budgets for a month with spending so far
    Get {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Replace a month's budgets, e.g. `food=300 rent=900`
    Set {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(value_name = "CATEGORY=AMOUNT")]
        entries: Vec<String>,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Planned vs. actual income for a month
    Get {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Set expected income for a month
    Set {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        income: String,
    },
}

#[derive(Subcommand)]
enum FixedCommands {
    List {
        #[arg(long)]
        json: bool,
    },
    Add {
        #[arg(long = "type")]
        tx_type: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Change fields of a fixed item; omitted fields keep their value
    Edit {
        id: i64,
        #[arg(long = "type")]
        tx_type: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete { id: i64 },
    /// Create this month's transaction from a fixed item
    Apply {
        id: i64,
        /// YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Rename every FROM category to INTO
    Merge {
        #[arg(required = true)]
        from: Vec<String>,
        #[arg(long)]
        into: String,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
        "\nbuild:   ", env!("BUILD_PROFILE"),
    )
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let ctx = context::Context::load(cli.api_base);

    let result = match cli.command {
        Commands::Register { name, email, password } => account::cmd_register(&ctx, name, email, password),
        Commands::Login { email, password } => account::cmd_login(&ctx, email, password),
        Commands::Logout => account::cmd_logout(&ctx),
        Commands::Whoami { timeout, json } => account::cmd_whoami(&ctx, timeout, json),
        Commands::VerifyEmail { status } => account::cmd_verify_email(&ctx, status),
        Commands::ForgotPassword { email } => account::cmd_forgot_password(&ctx, email),
        Commands::ResetPassword { token, email, password } => {
            account::cmd_reset_password(&ctx, token, email, password)
        }
        Commands::Profile(cmd) => match cmd {
            ProfileCommands::Update { name, email } => account::cmd_profile_update(&ctx, name, email),
            ProfileCommands::Password { current, new_password } => {
                account::cmd_profile_password(&ctx, current, new_password)
            }
            ProfileCommands::Preferences { json } => account::cmd_profile_preferences(&ctx, json),
            ProfileCommands::Delete { password, yes } => account::cmd_profile_delete(&ctx, password, yes),
        },
        Commands::Tx(cmd) => match cmd {
            TxCommands::List { filter, json } => transactions::cmd_list(&ctx, &filter, json),
            TxCommands::Add { fields, json } => transactions::cmd_add(&ctx, fields, json),
            TxCommands::Edit { id, fields, json } => transactions::cmd_edit(&ctx, id, fields, json),
            TxCommands::Delete { id } => transactions::cmd_delete(&ctx, id),
        },
        Commands::Import { file, yes, json } => import::cmd_import(&ctx, file, yes, json),
        Commands::Export { file, filter } => transactions::cmd_export(&ctx, file, &filter),
        Commands::Summary { year, json } => summary::cmd_summary(&ctx, year, json),
        Commands::Budget(cmd) => match cmd {
            BudgetCommands::Get { year, month, json } => planning::cmd_budget_get(&ctx, year, month, json),
            BudgetCommands::Set { year, month, entries } => planning::cmd_budget_set(&ctx, year, month, entries),
        },
        Commands::Plan(cmd) => match cmd {
            PlanCommands::Get { year, month, json } => planning::cmd_plan_get(&ctx, year, month, json),
            PlanCommands::Set { year, month, income } => planning::cmd_plan_set(&ctx, year, month, income),
        },
        Commands::Fixed(cmd) => match cmd {
            FixedCommands::List { json } => planning::cmd_fixed_list(&ctx, json),
            FixedCommands::Add { tx_type, amount, category, description } => {
                planning::cmd_fixed_add(&ctx, tx_type, amount, category, description)
            }
            FixedCommands::Edit { id, tx_type, amount, category, description } => {
                planning::cmd_fixed_edit(&ctx, id, tx_type, amount, category, description)
            }
            FixedCommands::Delete { id } => planning::cmd_fixed_delete(&ctx, id),
            FixedCommands::Apply { id, month } => planning::cmd_fixed_apply(&ctx, id, month),
        },
        Commands::Categories(cmd) => match cmd {
            CategoryCommands::Merge { from, into } => planning::cmd_categories_merge(&ctx, from, into),
        },
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn not_logged_in() -> Self {
        Self {
            code: EXIT_API_NOT_AUTH,
            message: "Not logged in".into(),
            hint: Some("run `tally login --email <EMAIL>`".into()),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        let code = api_exit_code(&err);
        let hint = match code {
            EXIT_API_NOT_AUTH => Some("session expired or invalid; run `tally login` again".to_string()),
            EXIT_API_NETWORK => Some("check `api.base` in settings.json or set TALLY_API_BASE".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

impl From<ImportError> for CliError {
    fn from(err: ImportError) -> Self {
        Self { code: import_exit_code(&err), message: err.to_string(), hint: None }
    }
}

impl From<ImportCommitError> for CliError {
    fn from(err: ImportCommitError) -> Self {
        let hint = if err.created > 0 {
            Some("created rows were kept; run `tally tx list` before re-importing".to_string())
        } else {
            None
        };
        let code = match err.source {
            ApiError::Unauthorized(_) | ApiError::Network(_) if err.created == 0 => api_exit_code(&err.source),
            _ => EXIT_IMPORT_PARTIAL,
        };
        Self { code, message: err.to_string(), hint }
    }
}

/// Pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::general(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
