//! Service layer for the ledger
//!
//! Services sit on top of the storage layer and keep the account store,
//! the budget store and the transaction log consistent with each other.

pub mod import;
pub mod ledger;

pub use import::{ColumnMapping, ImportReport, ImportService};
pub use ledger::{
    BulkOutcome, CategorySummary, LedgerService, LedgerStep, MonthSummary, RebuildReport,
};
