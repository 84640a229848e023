//! Encrypted Wallet Storage
//!
//! One JSON file per wallet, holding every record of the wallet encrypted
//! with:
//! - Argon2id for password-based key derivation
//! - ChaCha20-Poly1305 for authenticated encryption
//!
//! The key is derived once when the store is opened. Every write re-encrypts
//! the whole record set under a fresh nonce.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHasher,
};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use veil_account_keys::SecretBuffer;
use zeroize::Zeroizing;

use crate::config::StoreConfig;
use crate::error::{Result, WalletError};
use crate::store::{Record, RecordSet, StoreProvider, WalletStore};

/// Current wallet file format version
const WALLET_VERSION: u32 = 1;

/// File extension of wallet files
const WALLET_EXTENSION: &str = "wallet";

/// Encrypted wallet file structure
#[derive(Serialize, Deserialize)]
struct WalletFile {
    /// File format version
    version: u32,

    /// Argon2 salt (base64 salt string)
    salt: String,

    /// ChaCha20-Poly1305 nonce (12 bytes, hex encoded)
    nonce: String,

    /// Encrypted record set (hex encoded)
    ciphertext: String,
}

/// A wallet store persisted to an encrypted file.
pub struct EncryptedFileStore {
    path: PathBuf,
    salt: String,
    key: Zeroizing<[u8; 32]>,
    records: Mutex<RecordSet>,
}

impl EncryptedFileStore {
    /// Create a new, empty wallet file at `path`
    pub fn create(path: &Path, passphrase: &SecretBuffer, params: &StoreConfig) -> Result<Self> {
        if path.exists() {
            return Err(WalletError::Store(format!(
                "{} already exists",
                path.display()
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let key = derive_key(passphrase.expose(), salt.as_str(), params)?;

        let store = Self {
            path: path.to_path_buf(),
            salt: salt.to_string(),
            key,
            records: Mutex::new(RecordSet::default()),
        };
        store.persist(&RecordSet::default())?;
        Ok(store)
    }

    /// Open and decrypt an existing wallet file
    pub fn open(path: &Path, passphrase: &SecretBuffer, params: &StoreConfig) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| WalletError::Store(format!("Failed to read wallet file: {}", e)))?;
        let file: WalletFile = serde_json::from_str(&json)
            .map_err(|e| WalletError::Store(format!("Failed to parse wallet file: {}", e)))?;

        if file.version != WALLET_VERSION {
            return Err(WalletError::Store(format!(
                "Unsupported wallet version: {} (expected {})",
                file.version, WALLET_VERSION
            )));
        }

        let key = derive_key(passphrase.expose(), &file.salt, params)?;

        let nonce_bytes = hex::decode(&file.nonce)
            .map_err(|_| WalletError::Store("Invalid nonce format".to_string()))?;
        let ciphertext = hex::decode(&file.ciphertext)
            .map_err(|_| WalletError::Store("Invalid ciphertext format".to_string()))?;

        if nonce_bytes.len() != 12 {
            return Err(WalletError::Store("Invalid nonce length".to_string()));
        }

        let cipher = ChaCha20Poly1305::new_from_slice(&key[..])
            .map_err(|_| WalletError::Store("Failed to create cipher".to_string()))?;

        let nonce = Nonce::from_slice(&nonce_bytes);
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(nonce, ciphertext.as_slice())
                .map_err(|_| WalletError::Store("Decryption failed - wrong passphrase?".to_string()))?,
        );

        let records: RecordSet = serde_json::from_slice(&plaintext)?;
        debug!(path = %path.display(), "wallet file opened");

        Ok(Self {
            path: path.to_path_buf(),
            salt: file.salt,
            key,
            records: Mutex::new(records),
        })
    }

    fn lock(&self) -> MutexGuard<'_, RecordSet> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Apply `f` to the records and write the result back to disk. The
    /// in-memory set only changes if the write succeeds.
    fn write<T>(&self, f: impl FnOnce(&mut RecordSet) -> Result<T>) -> Result<T> {
        let mut records = self.lock();
        let mut updated = records.clone();
        let out = f(&mut updated)?;
        self.persist(&updated)?;
        *records = updated;
        Ok(out)
    }

    fn persist(&self, records: &RecordSet) -> Result<()> {
        let plaintext = Zeroizing::new(serde_json::to_vec(records)?);

        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill(&mut nonce_bytes);

        let cipher = ChaCha20Poly1305::new_from_slice(&self.key[..])
            .map_err(|_| WalletError::Store("Failed to create cipher".to_string()))?;

        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|_| WalletError::Store("Encryption failed".to_string()))?;

        let file = WalletFile {
            version: WALLET_VERSION,
            salt: self.salt.clone(),
            nonce: hex::encode(nonce_bytes),
            ciphertext: hex::encode(ciphertext),
        };
        save_file(&self.path, &serde_json::to_string_pretty(&file)?)
    }
}

impl WalletStore for EncryptedFileStore {
    fn insert<R: Record>(&self, record: &R) -> Result<()> {
        self.write(|records| records.insert(record))
    }

    fn query_all<R: Record>(&self) -> Result<Vec<R>> {
        self.lock().query_all()
    }

    fn get<R: Record>(&self, key: &str) -> Result<Option<R>> {
        self.lock().get(key)
    }

    fn update<R: Record>(&self, record: &R) -> Result<bool> {
        self.write(|records| records.update(record))
    }

    fn remove<R: Record>(&self, key: &str) -> Result<bool> {
        self.write(|records| records.remove::<R>(key))
    }
}

/// Write `contents` to `path` with restricted permissions
fn save_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        file.write_all(contents.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents)?;
    }

    Ok(())
}

/// Derive a 32-byte encryption key from a passphrase using Argon2id
fn derive_key(passphrase: &[u8], salt: &str, params: &StoreConfig) -> Result<Zeroizing<[u8; 32]>> {
    let salt = SaltString::from_b64(salt)
        .map_err(|_| WalletError::Store("Invalid salt format".to_string()))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2::Params::new(
            params.argon2_memory_kb,
            params.argon2_iterations,
            params.argon2_parallelism,
            Some(32),
        )
        .map_err(|_| WalletError::Store("Invalid Argon2 parameters".to_string()))?,
    );

    let hash = argon2
        .hash_password(passphrase, &salt)
        .map_err(|_| WalletError::Store("Key derivation failed".to_string()))?;

    let hash_output = hash
        .hash
        .ok_or_else(|| WalletError::Store("No hash output".to_string()))?;

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&hash_output.as_bytes()[..32]);

    Ok(key)
}

/// Keeps one encrypted file per wallet in a directory.
#[derive(Debug, Clone)]
pub struct FileStoreProvider {
    dir: PathBuf,
    params: StoreConfig,
}

impl FileStoreProvider {
    pub fn new(dir: impl Into<PathBuf>, params: StoreConfig) -> Self {
        Self {
            dir: dir.into(),
            params,
        }
    }

    /// Path of the wallet file for `identifier`
    pub fn wallet_path(&self, identifier: &str) -> Result<PathBuf> {
        let valid = !identifier.is_empty()
            && identifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(WalletError::Store(format!(
                "invalid wallet identifier '{identifier}'"
            )));
        }
        Ok(self
            .dir
            .join(format!("{identifier}.{WALLET_EXTENSION}")))
    }
}

impl StoreProvider for FileStoreProvider {
    type Store = EncryptedFileStore;

    fn create(&self, identifier: &str, passphrase: &SecretBuffer) -> Result<EncryptedFileStore> {
        EncryptedFileStore::create(&self.wallet_path(identifier)?, passphrase, &self.params)
    }

    fn open(&self, identifier: &str, passphrase: &SecretBuffer) -> Result<EncryptedFileStore> {
        let path = self.wallet_path(identifier)?;
        if !path.exists() {
            return Err(WalletError::Store(format!("wallet '{identifier}' not found")));
        }
        EncryptedFileStore::open(&path, passphrase, &self.params)
    }

    fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut identifiers = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(WALLET_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    identifiers.push(stem.to_string());
                }
            }
        }
        identifiers.sort();
        Ok(identifiers)
    }

    fn remove(&self, identifier: &str) -> Result<bool> {
        let path = self.wallet_path(identifier)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        debug!(path = %path.display(), "wallet file removed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{WalletTransaction, WalletType};
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;
    use veil_transaction_core::Vout;

    const TEST_PASSWORD: &str = "test-password-123";

    fn fast_params() -> StoreConfig {
        StoreConfig {
            argon2_memory_kb: 1024,
            argon2_iterations: 1,
            argon2_parallelism: 1,
        }
    }

    fn record(memo: &str) -> WalletTransaction {
        WalletTransaction {
            id: Uuid::new_v4(),
            address: "tveil://1/me".into(),
            vout: Vout::default(),
            payment: 0,
            fee: 0,
            change: 7,
            balance: 7,
            spent: false,
            wallet_type: WalletType::Receive,
            date_time: Utc::now(),
            tx_id: "00".into(),
            memo: memo.into(),
        }
    }

    #[test]
    fn test_save_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("w.wallet");
        let pass = SecretBuffer::from_text(TEST_PASSWORD);

        let store = EncryptedFileStore::create(&path, &pass, &fast_params()).unwrap();
        let original = record("coffee");
        store.insert(&original).unwrap();
        drop(store);

        let reopened = EncryptedFileStore::open(&path, &pass, &fast_params()).unwrap();
        assert_eq!(
            reopened.query_all::<WalletTransaction>().unwrap(),
            vec![original]
        );
    }

    #[test]
    fn test_wrong_password() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("w.wallet");
        EncryptedFileStore::create(&path, &SecretBuffer::from_text(TEST_PASSWORD), &fast_params())
            .unwrap();

        let result = EncryptedFileStore::open(
            &path,
            &SecretBuffer::from_text("wrong-password"),
            &fast_params(),
        );
        assert!(matches!(result, Err(WalletError::Store(_))));
    }

    #[test]
    fn test_fresh_nonce_per_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("w.wallet");
        let pass = SecretBuffer::from_text(TEST_PASSWORD);
        let store = EncryptedFileStore::create(&path, &pass, &fast_params()).unwrap();

        let read_nonce = || {
            let file: WalletFile =
                serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
            file.nonce
        };
        let first = read_nonce();
        store.insert(&record("a")).unwrap();
        let second = read_nonce();
        assert_ne!(first, second);

        let plain = fs::read_to_string(&path).unwrap();
        assert!(!plain.contains("tveil://"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("w.wallet");
        EncryptedFileStore::create(&path, &SecretBuffer::from_text(TEST_PASSWORD), &fast_params())
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_provider_lists_wallets() {
        let temp_dir = TempDir::new().unwrap();
        let provider = FileStoreProvider::new(temp_dir.path().join("wallets"), fast_params());
        let pass = SecretBuffer::from_text(TEST_PASSWORD);

        assert!(provider.list().unwrap().is_empty());
        provider.create("id_b", &pass).unwrap();
        provider.create("id_a", &pass).unwrap();
        assert!(provider.create("id_a", &pass).is_err());
        assert_eq!(provider.list().unwrap(), vec!["id_a", "id_b"]);

        assert!(provider.open("id_c", &pass).is_err());
        assert!(provider.wallet_path("../escape").is_err());

        assert!(provider.remove("id_a").unwrap());
        assert!(!provider.remove("id_a").unwrap());
        assert_eq!(provider.list().unwrap(), vec!["id_b"]);
        assert!(provider.remove("../escape").is_err());
    }
}
