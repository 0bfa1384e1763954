//! Core data models for the ledger
//!
//! This module contains the data structures of the budgeting domain:
//! money, month codes, the budget hierarchy, accounts and transactions.

pub mod account;
pub mod budget;
pub mod ids;
pub mod money;
pub mod month;
pub mod transaction;

pub use account::{Account, AccountType};
pub use budget::{BudgetCategory, BudgetGroup, CopyMode, MonthlyBudget, TotalBudget};
pub use ids::{AccountId, TransactionId};
pub use money::Money;
pub use month::MonthCode;
pub use transaction::{parse_date, NewTransaction, Transaction};
