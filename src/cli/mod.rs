//! CLI command handlers
//!
//! Bridges clap argument parsing with the ledger service layer.

pub mod account;
pub mod category;
pub mod month;
pub mod transaction;

pub use account::{handle_account_command, AccountCommands};
pub use category::{handle_category_command, handle_group_command, CategoryCommands, GroupCommands};
pub use month::{handle_month_command, MonthCommands};
pub use transaction::{handle_transaction_command, TransactionCommands};
