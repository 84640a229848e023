//! Veil Wallet
//!
//! A wallet for a confidential-transaction currency. Keys, notes and
//! signatures never leave the wallet; nodes are asked only for outputs by
//! payment id and to relay signed transactions.
//!
//! ## Layout
//!
//! - [`service::WalletService`] is the entry point for front-ends
//! - [`ledger`] rebuilds balances from the wallet's own records
//! - [`session`] holds unlocked wallets
//! - [`store`] and [`storage`] persist records, in memory or encrypted on disk
//! - [`rpc`] talks to nodes

pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod records;
pub mod rpc;
pub mod service;
pub mod session;
pub mod storage;
pub mod store;

pub use config::WalletConfig;
pub use error::{Result, WalletError};
pub use ledger::{BalanceSheet, History};
pub use records::{WalletTransaction, WalletType};
pub use rpc::{BroadcastAck, NetworkClient, RpcClient};
pub use service::{generate_mnemonic, WalletService};
pub use session::{Session, SessionRegistry, SessionState};
pub use storage::{EncryptedFileStore, FileStoreProvider};
pub use store::{MemoryProvider, MemoryStore, Record, StoreProvider, WalletStore};
