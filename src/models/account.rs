//! Account model
//!
//! Accounts carry a cached balance that the ledger keeps equal to the
//! starting balance plus every transaction recorded against the account.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::AccountId;
use super::money::Money;

/// Whether an account takes part in the budget
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Everyday money that is assigned to envelopes
    #[default]
    Budgeted,
    /// Tracking-only account (investments, loans)
    Unbudgeted,
}

impl AccountType {
    /// Parse account type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "budgeted" | "on-budget" | "on_budget" => Some(Self::Budgeted),
            "unbudgeted" | "off-budget" | "off_budget" | "tracking" => Some(Self::Unbudgeted),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Budgeted => write!(f, "Budgeted"),
            Self::Unbudgeted => write!(f, "Unbudgeted"),
        }
    }
}

/// A financial account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: AccountId,

    /// Unique (case-insensitive) account name, also the transaction reference
    pub name: String,

    #[serde(rename = "type", default)]
    pub account_type: AccountType,

    /// Opening balance when the account was created
    #[serde(default)]
    pub starting_balance: Money,

    /// Starting balance plus all recorded activity
    pub cached_balance: Money,
}

impl Account {
    pub fn new(name: impl Into<String>, starting_balance: Money, account_type: AccountType) -> Self {
        Self {
            id: AccountId::new(),
            name: name.into(),
            account_type,
            starting_balance,
            cached_balance: starting_balance,
        }
    }

    /// Check whether this account answers to a name
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.account_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_balance_starts_at_opening() {
        let account = Account::new("Checking", Money::from_cents(50000), AccountType::Budgeted);
        assert_eq!(account.cached_balance, account.starting_balance);
        assert!(account.matches_name("  checking "));
    }

    #[test]
    fn test_account_type_parse() {
        assert_eq!(AccountType::parse("Budgeted"), Some(AccountType::Budgeted));
        assert_eq!(AccountType::parse("tracking"), Some(AccountType::Unbudgeted));
        assert_eq!(AccountType::parse("savings"), None);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let account: Account =
            serde_json::from_str(r#"{"name": "Cash", "cached_balance": 1200}"#).unwrap();
        assert_eq!(account.account_type, AccountType::Budgeted);
        assert_eq!(account.starting_balance, Money::zero());
        assert_eq!(account.cached_balance.cents(), 1200);
    }

    #[test]
    fn test_type_serializes_lowercase() {
        let account = Account::new("Brokerage", Money::zero(), AccountType::Unbudgeted);
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["type"], "unbudgeted");
    }
}
