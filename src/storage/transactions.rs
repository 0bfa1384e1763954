//! Transaction log
//!
//! Keeps transactions in insertion order. Only the ledger service writes
//! to it, so the log never drifts from balances and category activity.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{MonthCode, Transaction, TransactionId};
use crate::validate::check_transactions;

/// Ordered store of recorded transactions
#[derive(Debug, Default)]
pub struct TransactionRepository {
    data: RwLock<Vec<Transaction>>,
    #[cfg(test)]
    pub(crate) faults: super::FaultSwitch,
}

impl TransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, Vec<Transaction>>> {
        self.data
            .read()
            .map_err(|e| LedgerError::poisoned("transaction read", e))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, Vec<Transaction>>> {
        self.data
            .write()
            .map_err(|e| LedgerError::poisoned("transaction write", e))
    }

    /// Replace the log with a persisted `transactions` document
    ///
    /// A malformed document leaves the log empty and returns `InvalidShape`.
    pub fn load_value(&self, doc: Option<Value>) -> LedgerResult<()> {
        let mut data = self.write()?;
        data.clear();

        let Some(doc) = doc else {
            return Ok(());
        };
        check_transactions(&doc)?;

        *data = serde_json::from_value(doc)
            .map_err(|e| LedgerError::InvalidShape(format!("transactions: {}", e)))?;
        Ok(())
    }

    pub fn to_value(&self) -> LedgerResult<Value> {
        Ok(serde_json::to_value(&*self.read()?)?)
    }

    pub(crate) fn append(&self, transaction: Transaction) -> LedgerResult<Transaction> {
        #[cfg(test)]
        self.faults.check("transaction log")?;

        self.write()?.push(transaction.clone());
        Ok(transaction)
    }

    pub(crate) fn remove_by_id(&self, id: TransactionId) -> LedgerResult<Transaction> {
        #[cfg(test)]
        self.faults.check("transaction log")?;

        let mut data = self.write()?;
        let index = data
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;
        Ok(data.remove(index))
    }

    /// Change the category reference of a stored transaction
    pub(crate) fn set_category(
        &self,
        id: TransactionId,
        category: Option<String>,
    ) -> LedgerResult<Transaction> {
        #[cfg(test)]
        self.faults.check("transaction log")?;

        let mut data = self.write()?;
        let txn = data
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;
        txn.category = category;
        Ok(txn.clone())
    }

    pub fn get(&self, id: TransactionId) -> LedgerResult<Option<Transaction>> {
        Ok(self.read()?.iter().find(|t| t.id == id).cloned())
    }

    /// All transactions in insertion order
    pub fn list(&self) -> LedgerResult<Vec<Transaction>> {
        Ok(self.read()?.clone())
    }

    /// Transactions dated in a month, in insertion order
    pub fn list_for_month(&self, month: MonthCode) -> LedgerResult<Vec<Transaction>> {
        Ok(self
            .read()?
            .iter()
            .filter(|t| month.contains(t.date))
            .cloned()
            .collect())
    }

    pub fn count(&self) -> LedgerResult<usize> {
        Ok(self.read()?.len())
    }

    /// Resolve a full ID or a unique prefix such as the displayed `txn-1a2b3c4d`
    pub fn resolve_id(&self, text: &str) -> LedgerResult<TransactionId> {
        let text = text.trim();
        let prefix = text.strip_prefix("txn-").unwrap_or(text).to_lowercase();
        if prefix.is_empty() {
            return Err(LedgerError::transaction_not_found(text));
        }

        let data = self.read()?;
        let mut matches = data
            .iter()
            .filter(|t| t.id.as_uuid().to_string().starts_with(&prefix));
        match (matches.next(), matches.next()) {
            (Some(txn), None) => Ok(txn.id),
            (None, _) => Err(LedgerError::transaction_not_found(text)),
            (Some(_), Some(_)) => Err(LedgerError::Validation(format!(
                "Transaction ID '{}' is ambiguous; give more characters",
                text
            ))),
        }
    }
}
