use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::category::Category;

// ---------------------------------------------------------------------------
// Transaction type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Income,
    Expense,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Case-insensitive, whitespace-tolerant parse. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim();
        if value.eq_ignore_ascii_case("income") {
            Some(Self::Income)
        } else if value.eq_ignore_ascii_case("expense") {
            Some(Self::Expense)
        } else {
            None
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid transaction type '{s}' (expected income or expense)"))
    }
}

// ---------------------------------------------------------------------------
// Month key
// ---------------------------------------------------------------------------

/// A calendar month bucket, displayed as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Read the month from the leading `YYYY-MM` of an ISO date or datetime.
    pub fn from_date_str(date: &str) -> Option<Self> {
        let date = date.trim();
        if date.as_bytes().get(4) != Some(&b'-') {
            return None;
        }
        let year: i32 = date.get(0..4)?.parse().ok()?;
        let month: u32 = date.get(5..7)?.parse().ok()?;
        Self::new(year, month)
    }

    /// `YYYY-MM-01`, the date a fixed item is materialized on.
    pub fn first_day(&self) -> String {
        format!("{:04}-{:02}-01", self.year, self.month)
    }

    /// Short month name (`Jan`, `Feb`, …).
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%b").to_string())
            .unwrap_or_default()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().len() != 7 {
            return Err(format!("invalid month '{s}' (expected YYYY-MM)"));
        }
        Self::from_date_str(s).ok_or_else(|| format!("invalid month '{s}' (expected YYYY-MM)"))
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// A ledger entry as returned by the backend.
///
/// `amount` is always a positive magnitude; the sign lives in `tx_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
    pub date: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Transaction {
    pub fn signed_amount(&self) -> f64 {
        match self.tx_type {
            TxType::Income => self.amount,
            TxType::Expense => -self.amount,
        }
    }

    pub fn month_key(&self) -> Option<MonthKey> {
        MonthKey::from_date_str(&self.date)
    }

    pub fn year(&self) -> Option<i32> {
        self.month_key().map(|k| k.year)
    }

    pub fn category(&self) -> Category {
        Category::from_option(self.category.as_deref())
    }
}

/// Create/update payload for a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub amount: f64,
    pub date: String,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl From<&Transaction> for NewTransaction {
    fn from(tx: &Transaction) -> Self {
        Self {
            tx_type: tx.tx_type,
            amount: tx.amount,
            date: tx.date.clone(),
            category: tx.category.clone(),
            description: tx.description.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Fixed monthly items
// ---------------------------------------------------------------------------

/// A recurring template (rent, salary, …). Not a ledger entry until applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedItem {
    pub id: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
    #[serde(rename = "type")]
    pub tx_type: TxType,
}

impl FixedItem {
    /// Materialize this item as a transaction dated the first of `month`.
    pub fn apply_to(&self, month: MonthKey) -> NewTransaction {
        NewTransaction {
            tx_type: self.tx_type,
            amount: self.amount,
            date: month.first_day(),
            category: Some(Category::from_option(self.category.as_deref()).into_string()),
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFixedItem {
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount: f64,
    #[serde(rename = "type")]
    pub tx_type: TxType,
}

// ---------------------------------------------------------------------------
// Budgets and plans
// ---------------------------------------------------------------------------

/// Spending ceiling for one category in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBudget {
    pub year: i32,
    pub month: u32,
    pub category: Category,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
}

/// Expected income for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthPlan {
    pub year: i32,
    pub month: u32,
    #[serde(deserialize_with = "deserialize_amount")]
    pub expected_income: f64,
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub email_verified_at: Option<String>,
    #[serde(default)]
    pub preferences: serde_json::Value,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

/// Accept amounts as JSON numbers or decimal strings (`"12.50"`).
/// Decimal columns commonly come back from the backend as strings.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number or a decimal string")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let parsed: f64 = value
                .trim()
                .parse()
                .map_err(|e| de::Error::custom(format!("invalid amount '{value}': {e}")))?;
            if parsed.is_finite() {
                Ok(parsed)
            } else {
                Err(de::Error::custom(format!("invalid amount '{value}'")))
            }
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value as f64)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value as f64)
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}
