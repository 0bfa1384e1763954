//! Document store abstraction
//!
//! The ledger persists four JSON documents under fixed keys. Anything that
//! can get and set a JSON value by key can back the ledger: a directory of
//! files or an in-memory map.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use serde_json::Value;

use crate::error::{LedgerError, LedgerResult};
use crate::services::ledger::LedgerStep;

use super::file_io::{move_aside, read_json_value, write_json_atomic, write_json_temp};

/// Key of the month → group → category document
pub const BUDGET_KEY: &str = "budget";
/// Key of the unassigned pool document
pub const TO_BE_BUDGETED_KEY: &str = "toBeBudgeted";
/// Key of the transaction log document
pub const TRANSACTIONS_KEY: &str = "transactions";
/// Key of the account list document
pub const ACCOUNTS_KEY: &str = "accounts";

/// Persistence backend holding JSON documents by key
pub trait DocumentStore: Send + Sync {
    /// Fetch a document; `Ok(None)` when it was never written
    fn get(&self, key: &str) -> LedgerResult<Option<Value>>;

    /// Replace a document
    fn set(&self, key: &str, value: &Value) -> LedgerResult<()>;

    /// Replace several documents together
    ///
    /// Backends that can should either replace all of them or none.
    fn set_many(&self, docs: &[(&str, Value)]) -> LedgerResult<()> {
        for (key, value) in docs {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Keep the current contents of a document under another name so the
    /// next write cannot destroy them
    ///
    /// Returns where the contents went, or `None` if there was nothing stored.
    fn set_aside(&self, key: &str) -> LedgerResult<Option<String>>;
}

/// One `<key>.json` file per document inside a directory
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    dir: PathBuf,
}

impl FileDocumentStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Path of the file backing a document
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl DocumentStore for FileDocumentStore {
    fn get(&self, key: &str) -> LedgerResult<Option<Value>> {
        read_json_value(self.path_for(key))
    }

    fn set(&self, key: &str, value: &Value) -> LedgerResult<()> {
        write_json_atomic(self.path_for(key), value)
    }

    /// Writes every temp file first and only then renames them into place
    fn set_many(&self, docs: &[(&str, Value)]) -> LedgerResult<()> {
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(docs.len());
        for (key, value) in docs {
            let path = self.path_for(key);
            match write_json_temp(&path, value) {
                Ok(temp) => staged.push((temp, path)),
                Err(err) => {
                    discard(&staged);
                    return Err(err);
                }
            }
        }

        for (index, (temp, path)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(temp, path) {
                discard(&staged[index..]);
                let detail = format!("Failed to replace {}: {}", path.display(), e);
                if index == 0 {
                    return Err(LedgerError::Storage(detail));
                }
                return Err(LedgerError::ConsistencyGap {
                    step: LedgerStep::Persist,
                    detail: format!(
                        "{} after {} of {} documents were replaced",
                        detail,
                        index,
                        staged.len()
                    ),
                });
            }
        }
        Ok(())
    }

    fn set_aside(&self, key: &str) -> LedgerResult<Option<String>> {
        Ok(move_aside(self.path_for(key))?.map(|path| path.display().to_string()))
    }
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (temp, _) in staged {
        let _ = fs::remove_file(temp);
    }
}

/// Documents kept in memory; used by tests and throwaway ledgers
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<String, Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a document
    pub fn with_document(self, key: &str, value: Value) -> Self {
        if let Ok(mut docs) = self.docs.write() {
            docs.insert(key.to_string(), value);
        }
        self
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, key: &str) -> LedgerResult<Option<Value>> {
        let docs = self
            .docs
            .read()
            .map_err(|e| LedgerError::poisoned("document read", e))?;
        Ok(docs.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> LedgerResult<()> {
        let mut docs = self
            .docs
            .write()
            .map_err(|e| LedgerError::poisoned("document write", e))?;
        docs.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn set_many(&self, batch: &[(&str, Value)]) -> LedgerResult<()> {
        let mut docs = self
            .docs
            .write()
            .map_err(|e| LedgerError::poisoned("document write", e))?;
        for (key, value) in batch {
            docs.insert(key.to_string(), value.clone());
        }
        Ok(())
    }

    /// Moves the document to `<key>.invalid`
    fn set_aside(&self, key: &str) -> LedgerResult<Option<String>> {
        let mut docs = self
            .docs
            .write()
            .map_err(|e| LedgerError::poisoned("document write", e))?;
        let Some(value) = docs.remove(key) else {
            return Ok(None);
        };
        let kept = format!("{}.invalid", key);
        docs.insert(kept.clone(), value);
        Ok(Some(kept))
    }
}
