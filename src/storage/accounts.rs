//! Account store
//!
//! Keyed balance ledger. Accounts are addressed by their unique,
//! case-insensitive name, which is also what transactions reference.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountType, Money};
use crate::validate::check_accounts;

/// Repository for accounts and their cached balances
#[derive(Debug, Default)]
pub struct AccountRepository {
    data: RwLock<Vec<Account>>,
    #[cfg(test)]
    pub(crate) faults: super::FaultSwitch,
}

impl AccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, Vec<Account>>> {
        self.data
            .read()
            .map_err(|e| LedgerError::poisoned("account read", e))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, Vec<Account>>> {
        self.data
            .write()
            .map_err(|e| LedgerError::poisoned("account write", e))
    }

    /// Replace the contents with a persisted `accounts` document
    ///
    /// A malformed document leaves the store empty and returns `InvalidShape`.
    pub fn load_value(&self, doc: Option<Value>) -> LedgerResult<()> {
        let mut data = self.write()?;
        data.clear();

        let Some(doc) = doc else {
            return Ok(());
        };
        check_accounts(&doc)?;

        let accounts: Vec<Account> = serde_json::from_value(doc)
            .map_err(|e| LedgerError::InvalidShape(format!("accounts: {}", e)))?;
        for (i, account) in accounts.iter().enumerate() {
            if accounts[..i].iter().any(|a| a.matches_name(&account.name)) {
                return Err(LedgerError::InvalidShape(format!(
                    "accounts: duplicate account name '{}'",
                    account.name
                )));
            }
        }

        *data = accounts;
        Ok(())
    }

    /// Serialize the store as an `accounts` document
    pub fn to_value(&self) -> LedgerResult<Value> {
        let data = self.read()?;
        Ok(serde_json::to_value(&*data)?)
    }

    /// Create an account; fails if the name is taken
    pub fn add(
        &self,
        name: &str,
        starting_balance: Money,
        account_type: AccountType,
    ) -> LedgerResult<Account> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Validation(
                "Account name cannot be empty".into(),
            ));
        }

        let mut data = self.write()?;
        if data.iter().any(|a| a.matches_name(name)) {
            return Err(LedgerError::account_exists(name));
        }

        let account = Account::new(name, starting_balance, account_type);
        data.push(account.clone());
        Ok(account)
    }

    /// Remove an account, returning it
    pub fn delete(&self, name: &str) -> LedgerResult<Account> {
        let mut data = self.write()?;
        let index = data
            .iter()
            .position(|a| a.matches_name(name))
            .ok_or_else(|| LedgerError::account_not_found(name))?;
        Ok(data.remove(index))
    }

    /// Set the cached balance to an absolute value
    pub fn set_balance(&self, name: &str, balance: Money) -> LedgerResult<Account> {
        self.update_balance(name, |_| balance)
    }

    /// Adjust the cached balance with a function of its current value
    ///
    /// The read, the update and the write happen under one write lock.
    pub fn update_balance<F>(&self, name: &str, update: F) -> LedgerResult<Account>
    where
        F: FnOnce(Money) -> Money,
    {
        #[cfg(test)]
        self.faults.check("account")?;

        let mut data = self.write()?;
        let account = data
            .iter_mut()
            .find(|a| a.matches_name(name))
            .ok_or_else(|| LedgerError::account_not_found(name))?;

        account.cached_balance = update(account.cached_balance);
        Ok(account.clone())
    }

    /// Set the current balance and move the starting balance by the same
    /// difference, so the balance still equals the starting balance plus
    /// the account's transactions
    ///
    /// Returns the updated account and the difference applied.
    pub fn restate_balance(&self, name: &str, balance: Money) -> LedgerResult<(Account, Money)> {
        let mut data = self.write()?;
        let account = data
            .iter_mut()
            .find(|a| a.matches_name(name))
            .ok_or_else(|| LedgerError::account_not_found(name))?;

        let delta = balance - account.cached_balance;
        account.starting_balance += delta;
        account.cached_balance = balance;
        Ok((account.clone(), delta))
    }

    /// Get an account by name (case-insensitive)
    pub fn get(&self, name: &str) -> LedgerResult<Option<Account>> {
        let data = self.read()?;
        Ok(data.iter().find(|a| a.matches_name(name)).cloned())
    }

    /// All accounts in creation order
    pub fn get_all(&self) -> LedgerResult<Vec<Account>> {
        Ok(self.read()?.clone())
    }

    pub fn exists(&self, name: &str) -> LedgerResult<bool> {
        Ok(self.read()?.iter().any(|a| a.matches_name(name)))
    }

    pub fn count(&self) -> LedgerResult<usize> {
        Ok(self.read()?.len())
    }
}
