//! Transaction model
//!
//! A transaction moves money in or out of one account and is attributed
//! either to a budget category or, when uncategorized, to the
//! to-be-budgeted pool.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use super::ids::TransactionId;
use super::money::Money;
use super::month::MonthCode;
use crate::error::LedgerResult;

/// A recorded transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: TransactionId,

    /// Name of the account this transaction belongs to
    pub account: String,

    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,

    pub payee: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Signed amount (negative for outflow)
    pub activity: Money,
}

impl Transaction {
    /// Month whose budget this transaction is attributed to
    pub fn month(&self) -> LedgerResult<MonthCode> {
        MonthCode::from_date(self.date)
    }

    pub fn is_categorized(&self) -> bool {
        self.category.is_some()
    }
}

/// Input for recording a new transaction through the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub account: String,
    pub activity: Money,
    pub date: NaiveDate,
    pub payee: String,
    pub category: Option<String>,
    pub note: Option<String>,
}

impl NewTransaction {
    pub fn new(
        account: impl Into<String>,
        activity: Money,
        date: NaiveDate,
        payee: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            activity,
            date,
            payee: payee.into(),
            category: None,
            note: None,
        }
    }

    /// Attribute the transaction to a category
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub(crate) fn into_transaction(self) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            account: self.account.trim().to_string(),
            date: self.date,
            payee: self.payee,
            category: self
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            note: self.note,
            activity: self.activity,
        }
    }
}

/// Parse a persisted date: `YYYY-MM-DD` or an RFC 3339 timestamp
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unparseable date: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("2024-01-15"), Some(expected));
        assert_eq!(parse_date("2024-01-15T10:30:00Z"), Some(expected));
        assert_eq!(parse_date("2024-01-15T23:00:00+02:00"), Some(expected));
        assert_eq!(parse_date("15/01/2024"), None);
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_new_transaction_builder() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let txn = NewTransaction::new("Checking", Money::from_cents(-3000), date, "Cafe")
            .category("Dining")
            .note("lunch")
            .into_transaction();

        assert_eq!(txn.category.as_deref(), Some("Dining"));
        assert_eq!(txn.note.as_deref(), Some("lunch"));
        assert_eq!(txn.month().unwrap().to_key(), "202401");
    }

    #[test]
    fn test_builder_trims_names() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let txn = NewTransaction::new(" Checking ", Money::from_cents(-100), date, "Cafe")
            .category("  Dining ")
            .into_transaction();
        assert_eq!(txn.account, "Checking");
        assert_eq!(txn.category.as_deref(), Some("Dining"));

        let blank = NewTransaction::new("Checking", Money::from_cents(-100), date, "Cafe")
            .category("   ")
            .into_transaction();
        assert!(blank.category.is_none());
    }

    #[test]
    fn test_deserialize_without_id_or_optionals() {
        let txn: Transaction = serde_json::from_str(
            r#"{"account": "Checking", "date": "2024-02-03T00:00:00Z", "payee": "Shop", "activity": -500}"#,
        )
        .unwrap();
        assert_eq!(txn.date, NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
        assert!(txn.category.is_none());
        assert!(!txn.is_categorized());
    }

    #[test]
    fn test_serialize_skips_missing_optionals() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let txn = NewTransaction::new("Checking", Money::from_cents(100), date, "Employer")
            .into_transaction();
        let json = serde_json::to_value(&txn).unwrap();
        assert!(json.get("category").is_none());
        assert_eq!(json["date"], "2024-01-15");
    }
}
