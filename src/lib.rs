//! envelope-ledger - envelope budgeting with a consistent ledger
//!
//! Money is assigned to categories month by month. Every transaction is
//! recorded in three places that must agree: the category's activity for
//! the transaction's month (or the to-be-budgeted pool when it has no
//! category), the account's cached balance, and the transaction log.
//!
//! # Architecture
//!
//! - `config`: path resolution and user settings
//! - `error`: the `LedgerError` type
//! - `models`: money, month codes, budget hierarchy, accounts, transactions
//! - `validate`: shape checks for persisted documents
//! - `storage`: the three in-memory stores and their document backend
//! - `services`: the ledger coordinator and CSV import
//! - `cli` / `display`: command handlers and terminal formatting
//!
//! # Example
//!
//! ```rust,no_run
//! use envelope_ledger::models::{AccountType, Money, MonthCode, NewTransaction};
//! use envelope_ledger::services::LedgerService;
//! use envelope_ledger::storage::Storage;
//!
//! # fn main() -> Result<(), envelope_ledger::LedgerError> {
//! let storage = Storage::in_memory();
//! let ledger = LedgerService::new(&storage);
//!
//! let january = MonthCode::parse_key("202401")?;
//! ledger.add_month(january)?;
//! ledger.add_group(january, "Wants")?;
//! ledger.add_category(january, "Wants", "Dining")?;
//! ledger.open_account("Checking", Money::from_units(500), AccountType::Budgeted)?;
//!
//! let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default();
//! ledger.add_transaction(
//!     NewTransaction::new("Checking", Money::from_units(-30), date, "Cafe").category("Dining"),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;
pub mod validate;

pub use error::{LedgerError, LedgerResult};
