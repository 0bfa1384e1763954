//! Display formatting for terminal output

pub mod account;
pub mod month;
pub mod transaction;

pub use account::format_account_list;
pub use month::format_month_summary;
pub use transaction::{format_transaction_register, format_transaction_row};
