use chrono::Datelike;

use tally_api_client::ApiClient;
use tally_config::Settings;
use tally_core::MonthKey;

use crate::CliError;

/// Token supplied by the environment; takes precedence over auth.json.
pub const TOKEN_ENV: &str = "TALLY_TOKEN";

/// Settings plus a client wired to them. Built once per run.
pub struct Context {
    pub settings: Settings,
    pub client: ApiClient,
}

impl Context {
    pub fn load(api_base_override: Option<String>) -> Self {
        let mut settings = Settings::load();
        settings.apply_api_base_override(api_base_override.as_deref());

        let mut client = ApiClient::new(settings.api_base.clone());
        if settings.remember_token {
            client = client.with_auth_file(Settings::auth_path());
        }
        if let Some(token) = std::env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty()) {
            client = client.with_token(token.trim());
        }

        log::debug!("api base {}", client.api_base());
        Self { settings, client }
    }

    /// The client, or a "not logged in" error when there is no token.
    pub fn authed(&self) -> Result<&ApiClient, CliError> {
        if self.client.is_authenticated() {
            Ok(&self.client)
        } else {
            Err(CliError::not_logged_in())
        }
    }

    /// `filters.defaultYear`, else the current year.
    pub fn default_year(&self) -> i32 {
        self.settings.default_year.unwrap_or_else(current_year)
    }

    /// Year/month from flags, defaulting to today's month.
    pub fn month_or_current(&self, year: Option<i32>, month: Option<u32>) -> Result<MonthKey, CliError> {
        let today = chrono::Local::now().date_naive();
        let year = year.unwrap_or_else(|| today.year());
        let month = month.unwrap_or_else(|| today.month());
        MonthKey::new(year, month).ok_or_else(|| CliError::args(format!("invalid month {}", month)))
    }
}

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}
