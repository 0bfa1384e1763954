//! Ledger service
//!
//! Applies every transaction-affecting action to the budget store, the
//! account store and the transaction log in a fixed order:
//!
//! ```text
//! PENDING -> BUDGET_STEP -> ACCOUNT_STEP -> LOG_STEP -> SUCCESS
//!                 |              |             |
//!                 +--------------+-------------+--> FAILURE(error)
//! ```
//!
//! The account is checked before the budget step, so an unknown account
//! never leaves a half-applied transaction behind. If a later step still
//! fails, the earlier steps are undone; when the undo itself fails the
//! caller gets [`LedgerError::ConsistencyGap`] and can run [`LedgerService::rebuild`].
//!
//! Each public operation holds the storage-wide ledger lock for its whole
//! duration and persists all stores once it succeeds. If that save fails
//! the stores are reloaded from the last saved documents, so memory never
//! holds changes the caller was told did not happen.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, error, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Account, AccountType, BudgetCategory, CopyMode, Money, MonthCode, NewTransaction,
    Transaction, TransactionId,
};
use crate::storage::Storage;

/// Steps of the per-transaction protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerStep {
    Budget,
    Account,
    Log,
    /// Writing the stores back to the document backend
    Persist,
}

impl fmt::Display for LedgerStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Budget => write!(f, "budget"),
            Self::Account => write!(f, "account"),
            Self::Log => write!(f, "log"),
            Self::Persist => write!(f, "persist"),
        }
    }
}

/// Result of a bulk add; entries are referenced by their input index
#[derive(Debug, Default)]
pub struct BulkOutcome {
    /// Stored transactions, in input order
    pub added: Vec<Transaction>,
    /// Entries stored without their unrecognized category
    pub folded: Vec<usize>,
    /// Entries that were not stored
    pub failed: Vec<(usize, LedgerError)>,
}

/// What `rebuild` had to correct
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub categories_corrected: usize,
    pub accounts_corrected: usize,
    /// Transactions naming a category their month does not have
    pub dangling_categories: usize,
}

/// One category row of a month summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub group: String,
    pub name: String,
    pub budgeted: Money,
    pub activity: Money,
    pub available: Money,
}

/// Budget overview of one month
#[derive(Debug, Clone)]
pub struct MonthSummary {
    pub month: MonthCode,
    pub categories: Vec<CategorySummary>,
    pub total_budgeted: Money,
    pub total_activity: Money,
    pub total_available: Money,
    pub to_be_budgeted: Money,
}

/// Service coordinating the three ledger stores
pub struct LedgerService<'a> {
    storage: &'a Storage,
}

impl<'a> LedgerService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    // Transactions

    /// Record a transaction across budget, account and log
    pub fn add_transaction(&self, input: NewTransaction) -> LedgerResult<Transaction> {
        let txn = self.commit(|| self.apply_add(input))?;
        info!(
            id = %txn.id,
            account = %txn.account,
            amount = %txn.activity,
            date = %txn.date,
            category = ?txn.category,
            "Transaction recorded"
        );
        Ok(txn)
    }

    /// Remove a transaction, reversing its effect on budget and account
    pub fn delete_transaction(&self, id: TransactionId) -> LedgerResult<Transaction> {
        let txn = self.commit(|| {
            let txn = self
                .storage
                .transactions
                .get(id)?
                .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;

            let reversal = -txn.activity;
            self.post(&txn, reversal)?;
            match self.storage.transactions.remove_by_id(id) {
                Ok(removed) => Ok(removed),
                Err(err) => Err(self.unpost(&txn, reversal, err)),
            }
        })?;
        info!(id = %txn.id, account = %txn.account, amount = %txn.activity, "Transaction deleted");
        Ok(txn)
    }

    /// Record many transactions, each one independently
    ///
    /// An entry whose category does not exist in its month is recorded
    /// against the to-be-budgeted pool instead. An entry whose account does
    /// not exist fails on its own; earlier entries stay recorded.
    pub fn bulk_add_transactions(&self, entries: Vec<NewTransaction>) -> LedgerResult<BulkOutcome> {
        let outcome = self.commit(|| {
            let mut outcome = BulkOutcome::default();

            for (index, mut entry) in entries.into_iter().enumerate() {
                let month = match MonthCode::from_date(entry.date) {
                    Ok(month) => month,
                    Err(err) => {
                        warn!(index, error = %err, "Bulk entry rejected");
                        outcome.failed.push((index, err));
                        continue;
                    }
                };
                let unknown_category = match entry.category.as_deref() {
                    Some(name) => !self.storage.budget.has_category(month, name)?,
                    None => false,
                };
                if unknown_category {
                    debug!(index, month = %month, category = ?entry.category, "Unknown category, using the to-be-budgeted pool");
                    entry.category = None;
                }

                match self.apply_add(entry) {
                    Ok(txn) => {
                        if unknown_category {
                            outcome.folded.push(index);
                        }
                        outcome.added.push(txn);
                    }
                    Err(err) => {
                        warn!(index, error = %err, "Bulk entry rejected");
                        outcome.failed.push((index, err));
                    }
                }
            }

            Ok(outcome)
        })?;

        info!(
            added = outcome.added.len(),
            folded = outcome.folded.len(),
            failed = outcome.failed.len(),
            "Bulk add finished"
        );
        Ok(outcome)
    }

    /// Move a transaction to another category, or to the pool with `None`
    ///
    /// This is the entry point for an external categorizer.
    pub fn recategorize_transaction(
        &self,
        id: TransactionId,
        category: Option<String>,
    ) -> LedgerResult<Transaction> {
        let category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        self.commit(|| {
            let txn = self
                .storage
                .transactions
                .get(id)?
                .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;
            if txn.category == category {
                return Ok(txn);
            }

            let month = txn.month()?;
            if let Some(name) = category.as_deref() {
                self.existing_category(month, name)?;
            }

            let old = txn.category.as_deref();
            let new = category.as_deref();
            self.budget_step(month, old, -txn.activity)?;
            if let Err(err) = self.budget_step(month, new, txn.activity) {
                return Err(self.undo_budget(month, old, -txn.activity, err));
            }

            match self.storage.transactions.set_category(id, category.clone()) {
                Ok(updated) => {
                    info!(id = %id, from = ?old, to = ?new, "Transaction recategorized");
                    Ok(updated)
                }
                Err(err) => {
                    let err = self.undo_budget(month, new, txn.activity, err);
                    Err(self.undo_budget(month, old, -txn.activity, err))
                }
            }
        })
    }

    // Accounts

    /// Create an account; a budgeted account's opening balance becomes
    /// money to be budgeted
    pub fn open_account(
        &self,
        name: &str,
        starting_balance: Money,
        account_type: AccountType,
    ) -> LedgerResult<Account> {
        self.commit(|| {
            let account = self
                .storage
                .accounts
                .add(name, starting_balance, account_type)?;
            if account_type == AccountType::Budgeted && !starting_balance.is_zero() {
                self.storage
                    .budget
                    .update_to_be_budgeted(|pool| pool + starting_balance)?;
            }
            info!(account = %account.name, balance = %starting_balance, "Account opened");
            Ok(account)
        })
    }

    /// Remove an account that no transaction references
    pub fn close_account(&self, name: &str) -> LedgerResult<Account> {
        self.commit(|| {
            let account = self
                .storage
                .accounts
                .get(name)?
                .ok_or_else(|| LedgerError::account_not_found(name))?;

            let referenced = self
                .storage
                .transactions
                .list()?
                .iter()
                .filter(|t| account.matches_name(&t.account))
                .count();
            if referenced > 0 {
                return Err(LedgerError::Validation(format!(
                    "Account '{}' still has {} transaction(s); delete them first",
                    account.name, referenced
                )));
            }

            let removed = self.storage.accounts.delete(name)?;
            if removed.account_type == AccountType::Budgeted && !removed.cached_balance.is_zero() {
                let balance = removed.cached_balance;
                self.storage
                    .budget
                    .update_to_be_budgeted(|pool| pool - balance)?;
            }
            info!(account = %removed.name, "Account closed");
            Ok(removed)
        })
    }

    /// Set an account's current balance, e.g. to match a bank statement
    ///
    /// The starting balance moves by the same difference so `rebuild` keeps
    /// the new value. For a budgeted account the difference is also money
    /// to be budgeted.
    pub fn set_account_balance(&self, name: &str, balance: Money) -> LedgerResult<Account> {
        self.commit(|| {
            let (account, delta) = self.storage.accounts.restate_balance(name, balance)?;
            if account.account_type == AccountType::Budgeted && !delta.is_zero() {
                if let Err(err) = self.storage.budget.update_to_be_budgeted(|pool| pool + delta) {
                    self.storage
                        .accounts
                        .restate_balance(name, balance - delta)?;
                    return Err(err);
                }
            }
            info!(account = %account.name, balance = %balance, adjustment = %delta, "Account balance set");
            Ok(account)
        })
    }

    // Budget structure

    pub fn add_month(&self, month: MonthCode) -> LedgerResult<()> {
        self.commit(|| self.storage.budget.add_month(month))
    }

    pub fn add_group(&self, month: MonthCode, group: &str) -> LedgerResult<()> {
        self.commit(|| self.storage.budget.add_group(month, group))
    }

    pub fn add_category(&self, month: MonthCode, group: &str, category: &str) -> LedgerResult<()> {
        self.commit(|| self.storage.budget.add_category(month, group, category))
    }

    /// Set a category's budgeted amount without touching the pool
    pub fn set_budgeted(
        &self,
        month: MonthCode,
        category: &str,
        amount: Money,
    ) -> LedgerResult<BudgetCategory> {
        self.commit(|| self.storage.budget.edit_budgeted_amount(month, category, amount))
    }

    /// Set a category's budgeted amount, taking the difference from the
    /// to-be-budgeted pool
    pub fn assign_budget(
        &self,
        month: MonthCode,
        category: &str,
        amount: Money,
    ) -> LedgerResult<BudgetCategory> {
        self.commit(|| {
            let current = self.existing_category(month, category)?;
            let delta = amount - current.budgeted;

            let updated = self
                .storage
                .budget
                .edit_budgeted_amount(month, category, amount)?;
            if let Err(err) = self.storage.budget.update_to_be_budgeted(|pool| pool - delta) {
                self.storage
                    .budget
                    .edit_budgeted_amount(month, category, current.budgeted)?;
                return Err(err);
            }
            info!(month = %month, category, budgeted = %amount, moved = %delta, "Budget assigned");
            Ok(updated)
        })
    }

    /// Delete a month; its categorized transactions move to the pool
    pub fn delete_month(&self, month: MonthCode) -> LedgerResult<Vec<TransactionId>> {
        self.commit(|| {
            self.storage.budget.delete_month(month)?;
            self.orphan_dangling(month)
        })
    }

    /// Delete a group; transactions in its categories move to the pool
    pub fn delete_group(&self, month: MonthCode, group: &str) -> LedgerResult<Vec<TransactionId>> {
        self.commit(|| {
            self.storage.budget.delete_group(month, group)?;
            self.orphan_dangling(month)
        })
    }

    /// Delete a category; its transactions move to the pool
    pub fn delete_category(&self, month: MonthCode, category: &str) -> LedgerResult<Vec<TransactionId>> {
        self.commit(|| {
            self.storage.budget.delete_category(month, category)?;
            self.orphan_dangling(month)
        })
    }

    /// Copy a month's structure and budgeted amounts into another month
    ///
    /// Activity in the destination is re-derived from the transaction log
    /// afterwards; with [`CopyMode::Replace`] transactions whose category
    /// disappeared move to the pool.
    pub fn copy_month(
        &self,
        from: MonthCode,
        to: MonthCode,
        mode: CopyMode,
    ) -> LedgerResult<Vec<TransactionId>> {
        self.commit(|| {
            self.storage.budget.copy_month(from, to, mode)?;
            let orphaned = self.orphan_dangling(to)?;
            self.recompute_month(to)?;
            info!(from = %from, to = %to, mode = ?mode, orphaned = orphaned.len(), "Month copied");
            Ok(orphaned)
        })
    }

    // Maintenance

    /// Re-derive category activity and account balances from the log
    pub fn rebuild(&self) -> LedgerResult<RebuildReport> {
        let report = self.commit(|| {
            let mut report = RebuildReport::default();

            for month in self.storage.budget.months()? {
                report.categories_corrected += self.recompute_month(month)?;
            }

            let transactions = self.storage.transactions.list()?;
            for account in self.storage.accounts.get_all()? {
                let expected = account.starting_balance
                    + transactions
                        .iter()
                        .filter(|t| account.matches_name(&t.account))
                        .map(|t| t.activity)
                        .sum::<Money>();
                if account.cached_balance != expected {
                    self.storage.accounts.set_balance(&account.name, expected)?;
                    report.accounts_corrected += 1;
                }
            }

            for txn in &transactions {
                if let Some(name) = txn.category.as_deref() {
                    if !self.storage.budget.has_category(txn.month()?, name)? {
                        report.dangling_categories += 1;
                    }
                }
            }

            Ok(report)
        })?;

        if report != RebuildReport::default() {
            warn!(?report, "Rebuild corrected derived ledger state");
        }
        Ok(report)
    }

    /// Budgeted, activity and available per category for a month
    pub fn month_summary(&self, month: MonthCode) -> LedgerResult<MonthSummary> {
        let budget = self
            .storage
            .budget
            .month(month)?
            .ok_or_else(|| LedgerError::month_not_found(month.to_key()))?;

        let categories: Vec<CategorySummary> = budget
            .categories()
            .map(|(group, name, cat)| CategorySummary {
                group: group.to_string(),
                name: name.to_string(),
                budgeted: cat.budgeted,
                activity: cat.activity,
                available: cat.available(),
            })
            .collect();

        Ok(MonthSummary {
            month,
            total_budgeted: budget.total_budgeted(),
            total_activity: budget.total_activity(),
            total_available: categories.iter().map(|c| c.available).sum(),
            categories,
            to_be_budgeted: self.storage.budget.to_be_budgeted()?,
        })
    }

    // Protocol steps

    /// Run an operation under the ledger lock and persist on success
    fn commit<T>(&self, op: impl FnOnce() -> LedgerResult<T>) -> LedgerResult<T> {
        let _guard = self.storage.lock_ledger()?;
        let value = op()?;
        match self.storage.save_all() {
            Ok(()) => Ok(value),
            Err(err) => Err(self.discard_unsaved(err)),
        }
    }

    /// Bring the stores back to the last saved documents after a failed save
    fn discard_unsaved(&self, cause: LedgerError) -> LedgerError {
        if matches!(cause, LedgerError::ConsistencyGap { .. }) {
            error!(step = %LedgerStep::Persist, error = %cause, "Documents only partly written; run rebuild");
            return cause;
        }

        warn!(step = %LedgerStep::Persist, error = %cause, "Save failed, reloading the last saved ledger");
        match self.storage.load_all() {
            Ok(_) => cause,
            Err(reload) => {
                error!(error = %reload, "Could not reload the ledger after a failed save");
                LedgerError::ConsistencyGap {
                    step: LedgerStep::Persist,
                    detail: format!("{}; reload failed: {}", cause, reload),
                }
            }
        }
    }

    fn apply_add(&self, input: NewTransaction) -> LedgerResult<Transaction> {
        let txn = input.into_transaction();
        self.post(&txn, txn.activity)?;
        match self.storage.transactions.append(txn.clone()) {
            Ok(stored) => Ok(stored),
            Err(err) => Err(self.unpost(&txn, txn.activity, err)),
        }
    }

    /// Budget step then account step for `amount` on behalf of `txn`
    fn post(&self, txn: &Transaction, amount: Money) -> LedgerResult<()> {
        let month = txn.month()?;
        if !self.storage.accounts.exists(&txn.account)? {
            debug!(step = %LedgerStep::Account, account = %txn.account, "Unknown account, nothing applied");
            return Err(LedgerError::account_not_found(&txn.account));
        }

        let category = txn.category.as_deref();

        if let Err(err) = self.budget_step(month, category, amount) {
            debug!(step = %LedgerStep::Budget, month = %month, error = %err, "Ledger step failed");
            return Err(err);
        }

        if let Err(err) = self
            .storage
            .accounts
            .update_balance(&txn.account, |balance| balance + amount)
        {
            warn!(step = %LedgerStep::Account, account = %txn.account, error = %err, "Ledger step failed, undoing budget step");
            return Err(self.undo_budget(month, category, amount, err));
        }

        Ok(())
    }

    /// Undo a successful `post` after the log step failed
    fn unpost(&self, txn: &Transaction, amount: Money, cause: LedgerError) -> LedgerError {
        warn!(step = %LedgerStep::Log, id = %txn.id, error = %cause, "Ledger step failed, undoing earlier steps");
        match self.post(txn, -amount) {
            Ok(()) => cause,
            Err(undo) => {
                error!(id = %txn.id, error = %undo, "Could not undo budget and account steps");
                LedgerError::ConsistencyGap {
                    step: LedgerStep::Account,
                    detail: format!("{}; undo failed: {}", cause, undo),
                }
            }
        }
    }

    /// Attribute `amount` to a category, or to the pool when uncategorized
    fn budget_step(&self, month: MonthCode, category: Option<&str>, amount: Money) -> LedgerResult<()> {
        match category {
            Some(name) => self
                .storage
                .budget
                .update_activity_amount(month, name, |activity| activity + amount)
                .map(|_| ()),
            None => self
                .storage
                .budget
                .update_to_be_budgeted(|pool| pool + amount)
                .map(|_| ()),
        }
    }

    /// Reverse a committed budget step, reporting a gap if that fails too
    fn undo_budget(
        &self,
        month: MonthCode,
        category: Option<&str>,
        amount: Money,
        cause: LedgerError,
    ) -> LedgerError {
        match self.budget_step(month, category, -amount) {
            Ok(()) => cause,
            Err(undo) => {
                error!(month = %month, category = ?category, error = %undo, "Could not undo budget step");
                LedgerError::ConsistencyGap {
                    step: LedgerStep::Budget,
                    detail: format!("{}; undo failed: {}", cause, undo),
                }
            }
        }
    }

    fn existing_category(&self, month: MonthCode, name: &str) -> LedgerResult<BudgetCategory> {
        let name = name.trim();
        if !self.storage.budget.has_month(month)? {
            return Err(LedgerError::month_not_found(month.to_key()));
        }
        self.storage
            .budget
            .category(month, name)?
            .ok_or_else(|| LedgerError::category_not_found(format!("{}/{}", month, name)))
    }

    /// Move transactions whose category no longer exists in `month` to the pool
    fn orphan_dangling(&self, month: MonthCode) -> LedgerResult<Vec<TransactionId>> {
        let mut orphaned = Vec::new();

        for txn in self.storage.transactions.list_for_month(month)? {
            let Some(name) = txn.category.as_deref() else {
                continue;
            };
            if self.storage.budget.has_category(month, name)? {
                continue;
            }
            self.storage
                .budget
                .update_to_be_budgeted(|pool| pool + txn.activity)?;
            self.storage.transactions.set_category(txn.id, None)?;
            orphaned.push(txn.id);
        }

        if !orphaned.is_empty() {
            info!(month = %month, count = orphaned.len(), "Uncategorized transactions of removed categories");
        }
        Ok(orphaned)
    }

    /// Set every category activity of `month` to the sum of its transactions
    fn recompute_month(&self, month: MonthCode) -> LedgerResult<usize> {
        let Some(budget) = self.storage.budget.month(month)? else {
            return Ok(0);
        };

        let mut sums: HashMap<String, Money> = HashMap::new();
        for txn in self.storage.transactions.list_for_month(month)? {
            if let Some(name) = txn.category {
                *sums.entry(name).or_default() += txn.activity;
            }
        }

        let mut corrected = 0;
        for (_, name, cat) in budget.categories() {
            let expected = sums.get(name).copied().unwrap_or_default();
            if cat.activity != expected {
                self.storage
                    .budget
                    .set_activity_amount(month, name, expected)?;
                corrected += 1;
            }
        }
        Ok(corrected)
    }
}
