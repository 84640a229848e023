//! Wallet store interface and the in-memory implementation.
//!
//! A store holds typed records (key sets, wallet transactions and signed
//! transactions), each addressed by its kind and a string key, in insertion
//! order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use veil_account_keys::{KeySet, SecretBuffer};
use veil_transaction_core::Transaction;

use crate::error::{Result, WalletError};
use crate::records::WalletTransaction;

/// A type that can be kept in a [`WalletStore`].
pub trait Record: Serialize + DeserializeOwned {
    /// Collection name
    const KIND: &'static str;

    /// Unique key within the collection
    fn key(&self) -> String;
}

impl Record for KeySet {
    const KIND: &'static str = "key_set";

    fn key(&self) -> String {
        self.key_path.clone()
    }
}

impl Record for WalletTransaction {
    const KIND: &'static str = "wallet_transaction";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Record for Transaction {
    const KIND: &'static str = "transaction";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Keyed record storage.
pub trait WalletStore: Send + Sync {
    /// Add a record. Fails if its key is taken.
    fn insert<R: Record>(&self, record: &R) -> Result<()>;

    /// Every record of a kind, in insertion order.
    fn query_all<R: Record>(&self) -> Result<Vec<R>>;

    /// Records of a kind matching `predicate`, in insertion order.
    fn query<R: Record>(&self, predicate: impl Fn(&R) -> bool) -> Result<Vec<R>> {
        Ok(self
            .query_all::<R>()?
            .into_iter()
            .filter(|r| predicate(r))
            .collect())
    }

    /// The record with `key`, if any.
    fn get<R: Record>(&self, key: &str) -> Result<Option<R>>;

    /// Replace the record with the same key. Returns whether one existed.
    fn update<R: Record>(&self, record: &R) -> Result<bool>;

    /// Delete the record with `key`. Returns whether one existed.
    fn remove<R: Record>(&self, key: &str) -> Result<bool>;
}

/// Opens stores by wallet identifier and passphrase.
pub trait StoreProvider: Send + Sync {
    type Store: WalletStore;

    /// Create an empty store. Fails if `identifier` exists.
    fn create(&self, identifier: &str, passphrase: &SecretBuffer) -> Result<Self::Store>;

    /// Open an existing store. Fails on a wrong passphrase.
    fn open(&self, identifier: &str, passphrase: &SecretBuffer) -> Result<Self::Store>;

    /// Identifiers of every known wallet.
    fn list(&self) -> Result<Vec<String>>;

    /// Delete a wallet and all its records. Returns whether it existed.
    fn remove(&self, identifier: &str) -> Result<bool>;
}

/// One stored record.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub(crate) struct Entry {
    kind: String,
    key: String,
    value: serde_json::Value,
}

/// Records in insertion order; the common core of every store.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub(crate) struct RecordSet {
    entries: Vec<Entry>,
}

impl RecordSet {
    fn position<R: Record>(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.kind == R::KIND && e.key == key)
    }

    pub(crate) fn insert<R: Record>(&mut self, record: &R) -> Result<()> {
        let key = record.key();
        if self.position::<R>(&key).is_some() {
            return Err(WalletError::Store(format!(
                "{} '{}' already exists",
                R::KIND,
                key
            )));
        }
        self.entries.push(Entry {
            kind: R::KIND.to_string(),
            key,
            value: serde_json::to_value(record)?,
        });
        Ok(())
    }

    pub(crate) fn query_all<R: Record>(&self) -> Result<Vec<R>> {
        self.entries
            .iter()
            .filter(|e| e.kind == R::KIND)
            .map(|e| R::deserialize(&e.value).map_err(WalletError::from))
            .collect()
    }

    pub(crate) fn get<R: Record>(&self, key: &str) -> Result<Option<R>> {
        self.position::<R>(key)
            .map(|i| R::deserialize(&self.entries[i].value).map_err(WalletError::from))
            .transpose()
    }

    pub(crate) fn update<R: Record>(&mut self, record: &R) -> Result<bool> {
        match self.position::<R>(&record.key()) {
            Some(i) => {
                self.entries[i].value = serde_json::to_value(record)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn remove<R: Record>(&mut self, key: &str) -> Result<bool> {
        match self.position::<R>(key) {
            Some(i) => {
                self.entries.remove(i);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// A store that lives only as long as the process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<RecordSet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecordSet> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl WalletStore for MemoryStore {
    fn insert<R: Record>(&self, record: &R) -> Result<()> {
        self.lock().insert(record)
    }

    fn query_all<R: Record>(&self) -> Result<Vec<R>> {
        self.lock().query_all()
    }

    fn get<R: Record>(&self, key: &str) -> Result<Option<R>> {
        self.lock().get(key)
    }

    fn update<R: Record>(&self, record: &R) -> Result<bool> {
        self.lock().update(record)
    }

    fn remove<R: Record>(&self, key: &str) -> Result<bool> {
        self.lock().remove::<R>(key)
    }
}

/// Hands out [`MemoryStore`]s; handles to the same wallet share records.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    wallets: Mutex<HashMap<String, (SecretBuffer, MemoryStore)>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (SecretBuffer, MemoryStore)>> {
        match self.wallets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl StoreProvider for MemoryProvider {
    type Store = MemoryStore;

    fn create(&self, identifier: &str, passphrase: &SecretBuffer) -> Result<MemoryStore> {
        let mut wallets = self.lock();
        if wallets.contains_key(identifier) {
            return Err(WalletError::Store(format!(
                "wallet '{identifier}' already exists"
            )));
        }
        let store = MemoryStore::new();
        wallets.insert(
            identifier.to_string(),
            (passphrase.duplicate(), store.clone()),
        );
        Ok(store)
    }

    fn open(&self, identifier: &str, passphrase: &SecretBuffer) -> Result<MemoryStore> {
        match self.lock().get(identifier) {
            Some((expected, store)) if expected == passphrase => Ok(store.clone()),
            Some(_) => Err(WalletError::Store("wrong passphrase".to_string())),
            None => Err(WalletError::Store(format!("wallet '{identifier}' not found"))),
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut identifiers: Vec<String> = self.lock().keys().cloned().collect();
        identifiers.sort();
        Ok(identifiers)
    }

    fn remove(&self, identifier: &str) -> Result<bool> {
        Ok(self.lock().remove(identifier).is_some())
    }
}
