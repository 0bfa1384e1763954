//! Storage layer for the envelope ledger
//!
//! Three in-memory stores (accounts, budget, transaction log) backed by a
//! [`DocumentStore`]. Loading validates every document first; a malformed
//! document is contained: its store starts empty and the problem is
//! reported instead of aborting the program. The malformed original is
//! moved aside before the next save so it is never overwritten.

pub mod accounts;
pub mod budget;
pub mod document;
pub mod file_io;
pub mod transactions;

pub use accounts::AccountRepository;
pub use budget::BudgetRepository;
pub use document::{DocumentStore, FileDocumentStore, MemoryDocumentStore};
pub use transactions::TransactionRepository;

use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::paths::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};

use document::{ACCOUNTS_KEY, BUDGET_KEY, TO_BE_BUDGETED_KEY, TRANSACTIONS_KEY};

/// Documents that failed validation during `load_all`
///
/// Each one is moved aside (see [`DocumentStore::set_aside`]) before the
/// next save.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub issues: Vec<(&'static str, LedgerError)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Owner of all ledger stores
pub struct Storage {
    documents: Box<dyn DocumentStore>,
    pub accounts: AccountRepository,
    pub budget: BudgetRepository,
    pub transactions: TransactionRepository,
    /// Serializes multi-step ledger operations
    ledger_lock: Mutex<()>,
    /// Keys whose stored document was rejected by the last load
    damaged: Mutex<Vec<&'static str>>,
}

impl Storage {
    /// Create storage over any document backend
    pub fn new(documents: Box<dyn DocumentStore>) -> Self {
        Self {
            documents,
            accounts: AccountRepository::new(),
            budget: BudgetRepository::new(),
            transactions: TransactionRepository::new(),
            ledger_lock: Mutex::new(()),
            damaged: Mutex::new(Vec::new()),
        }
    }

    /// Storage backed by JSON files in the data directory
    pub fn open(paths: &LedgerPaths) -> LedgerResult<Self> {
        paths.ensure_directories()?;
        Ok(Self::new(Box::new(FileDocumentStore::new(paths.data_dir()))))
    }

    /// Storage that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryDocumentStore::new()))
    }

    /// Load every store from the document backend
    ///
    /// Shape errors are collected in the report; anything else (I/O,
    /// poisoned locks) aborts the load.
    pub fn load_all(&self) -> LedgerResult<LoadReport> {
        let mut report = LoadReport::default();

        let doc = self.fetch(ACCOUNTS_KEY, &mut report)?;
        contain(&mut report, ACCOUNTS_KEY, self.accounts.load_value(doc))?;

        let doc = self.fetch(BUDGET_KEY, &mut report)?;
        contain(&mut report, BUDGET_KEY, self.budget.load_budget_value(doc))?;

        let doc = self.fetch(TO_BE_BUDGETED_KEY, &mut report)?;
        contain(
            &mut report,
            TO_BE_BUDGETED_KEY,
            self.budget.load_to_be_budgeted_value(doc),
        )?;

        let doc = self.fetch(TRANSACTIONS_KEY, &mut report)?;
        contain(
            &mut report,
            TRANSACTIONS_KEY,
            self.transactions.load_value(doc),
        )?;

        *self.damaged()? = report.issues.iter().map(|(key, _)| *key).collect();

        debug!(
            accounts = self.accounts.count()?,
            months = self.budget.months()?.len(),
            transactions = self.transactions.count()?,
            issues = report.issues.len(),
            "Ledger loaded"
        );
        Ok(report)
    }

    /// Write every store back to the document backend
    ///
    /// All four documents are serialized before anything is written and are
    /// then handed to the backend as one batch. Documents rejected by the
    /// last load are moved aside first.
    pub fn save_all(&self) -> LedgerResult<()> {
        let docs = [
            (ACCOUNTS_KEY, self.accounts.to_value()?),
            (BUDGET_KEY, self.budget.budget_value()?),
            (TO_BE_BUDGETED_KEY, self.budget.to_be_budgeted_value()?),
            (TRANSACTIONS_KEY, self.transactions.to_value()?),
        ];

        let mut damaged = self.damaged()?;
        while let Some(&key) = damaged.last() {
            if let Some(kept) = self.documents.set_aside(key)? {
                warn!(document = key, kept_as = %kept, "Moved malformed document aside");
            }
            damaged.pop();
        }
        drop(damaged);

        self.documents.set_many(&docs)
    }

    /// Hold this guard for the whole of a multi-step ledger operation
    pub(crate) fn lock_ledger(&self) -> LedgerResult<MutexGuard<'_, ()>> {
        self.ledger_lock
            .lock()
            .map_err(|e| LedgerError::poisoned("ledger", e))
    }

    fn damaged(&self) -> LedgerResult<MutexGuard<'_, Vec<&'static str>>> {
        self.damaged
            .lock()
            .map_err(|e| LedgerError::poisoned("damaged documents", e))
    }

    fn fetch(&self, key: &'static str, report: &mut LoadReport) -> LedgerResult<Option<Value>> {
        match self.documents.get(key) {
            Ok(doc) => Ok(doc),
            Err(err) => {
                contain(report, key, Err(err))?;
                Ok(None)
            }
        }
    }
}

/// Makes the n-th next store update fail; tests use it to reach the
/// compensation paths of the ledger service
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FaultSwitch(std::sync::atomic::AtomicUsize);

#[cfg(test)]
impl FaultSwitch {
    pub(crate) fn fail_nth(&self, n: usize) {
        self.0.store(n, std::sync::atomic::Ordering::SeqCst);
    }

    pub(crate) fn check(&self, what: &str) -> LedgerResult<()> {
        use std::sync::atomic::Ordering;

        let left = self.0.load(Ordering::SeqCst);
        if left == 0 {
            return Ok(());
        }
        self.0.store(left - 1, Ordering::SeqCst);
        if left == 1 {
            return Err(LedgerError::Storage(format!("{} update failed", what)));
        }
        Ok(())
    }
}

fn contain(report: &mut LoadReport, key: &'static str, result: LedgerResult<()>) -> LedgerResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_document_error() => {
            warn!(document = key, error = %err, "Malformed document, starting with an empty store");
            report.issues.push((key, err));
            Ok(())
        }
        Err(err) => Err(err),
    }
}
