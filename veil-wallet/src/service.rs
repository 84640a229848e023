//! The wallet service.
//!
//! [`WalletService`] is the front-end facing API: it opens stores, keeps the
//! session registry, and drives the ledger and the transaction assembler.
//! Network calls are made with no registry or store lock held.

use bip39::{Language, Mnemonic, MnemonicType, Seed};
use chrono::Utc;
use rand_core::OsRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;
use veil_account_keys::{
    add_key_set, root_key_set, uncover_spend_key, unlock, KeySet, PublicAddress, RistrettoPrivate,
    RistrettoPublic, SecretBuffer,
};
use veil_transaction_core::{
    assemble,
    constants::{MAX_MEMO_LEN, MAX_TRANSACTION_SIZE},
    open_note,
    ring_signature::commit,
    Note, SessionType, SpendRequest, Transaction, Vout,
};

use crate::config::WalletConfig;
use crate::error::{Result, WalletError};
use crate::ledger::{self, History};
use crate::records::{WalletTransaction, WalletType};
use crate::rpc::NetworkClient;
use crate::session::{Session, SessionRegistry};
use crate::store::{Record, StoreProvider, WalletStore};

/// Number of words in a generated mnemonic
pub const MNEMONIC_WORDS: usize = 24;

/// A fresh 24-word English mnemonic.
pub fn generate_mnemonic() -> SecretBuffer {
    let mnemonic = Mnemonic::new(MnemonicType::Words24, Language::English);
    SecretBuffer::from_text(mnemonic.phrase())
}

/// Wallet operations over a store provider and a network client.
pub struct WalletService<P: StoreProvider, N: NetworkClient> {
    config: WalletConfig,
    provider: P,
    network: N,
    sessions: SessionRegistry,
    /// Stores opened at login, by session id
    stores: Mutex<HashMap<Uuid, Arc<P::Store>>>,
}

impl<P: StoreProvider, N: NetworkClient> WalletService<P, N> {
    pub fn new(config: WalletConfig, provider: P, network: N) -> Self {
        Self {
            config,
            provider,
            network,
            sessions: SessionRegistry::new(),
            stores: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Create a wallet from `mnemonic`, protected by `passphrase`.
    /// Returns the new wallet identifier.
    pub fn create_wallet(
        &self,
        mnemonic: &SecretBuffer,
        passphrase: &SecretBuffer,
    ) -> Result<String> {
        let phrase = mnemonic.expose_str()?;
        let mnemonic = Mnemonic::from_phrase(phrase, Language::English)
            .map_err(|e| WalletError::InvalidKeyMaterial(format!("Invalid mnemonic: {e}")))?;
        let seed = Seed::new(&mnemonic, "");
        let key_set = root_key_set(seed.as_bytes(), self.config.network)?;

        let identifier = format!("id_{}", hex::encode(rand::random::<[u8; 16]>()));
        let store = self.provider.create(&identifier, passphrase)?;
        store.insert(&key_set)?;

        info!(wallet = %identifier, "wallet created");
        Ok(identifier)
    }

    /// Open a wallet and start a session on it.
    pub fn login(&self, identifier: &str, passphrase: SecretBuffer) -> Result<Uuid> {
        let store = self.provider.open(identifier, &passphrase)?;
        let first = store
            .query_all::<KeySet>()?
            .into_iter()
            .next()
            .ok_or_else(|| WalletError::InvalidKeyMaterial("wallet has no key set".into()))?;

        let session = Session::new(identifier, passphrase);
        let mut state = session.state();
        state.sender_address = first.stealth_address.clone();
        let session = self.sessions.add_or_update(session.updated(state))?;

        let session_id = session.session_id();
        self.lock_stores().insert(session_id, Arc::new(store));
        info!(wallet = %identifier, session = %session_id, "logged in");
        Ok(session_id)
    }

    /// End a session. Returns whether it existed.
    pub fn logout(&self, session_id: &Uuid) -> bool {
        self.lock_stores().remove(session_id);
        let removed = self.sessions.remove(session_id);
        if removed {
            info!(session = %session_id, "logged out");
        }
        removed
    }

    /// Set the parameters of the next transfer.
    pub fn prepare_send(
        &self,
        session_id: &Uuid,
        recipient_address: &str,
        amount: u64,
        fee: Option<u64>,
        memo: &str,
        session_type: SessionType,
    ) -> Result<()> {
        let result = self.prepare_send_inner(
            session_id,
            recipient_address,
            amount,
            fee,
            memo,
            session_type,
        );
        self.track(session_id, result)
    }

    fn prepare_send_inner(
        &self,
        session_id: &Uuid,
        recipient_address: &str,
        amount: u64,
        fee: Option<u64>,
        memo: &str,
        session_type: SessionType,
    ) -> Result<()> {
        let session = self.sessions.require(session_id)?;
        if amount == 0 {
            return Err(WalletError::InvalidRequest("amount must be positive".into()));
        }
        if memo.len() > MAX_MEMO_LEN {
            return Err(WalletError::InvalidRequest(format!(
                "memo is {} bytes, at most {MAX_MEMO_LEN} allowed",
                memo.len()
            )));
        }
        let (_, network) = PublicAddress::parse(recipient_address)?;
        if network != self.config.network {
            return Err(WalletError::MalformedAddress(format!(
                "address is for {network:?}, wallet is on {:?}",
                self.config.network
            )));
        }

        let mut state = session.state();
        state.recipient_address = recipient_address.to_string();
        state.amount = amount;
        state.fee = fee;
        state.memo = memo.to_string();
        state.session_type = session_type;
        state.has_funds = false;
        self.sessions.add_or_update(session.updated(state))?;
        Ok(())
    }

    pub fn key_sets(&self, session_id: &Uuid) -> Result<Vec<KeySet>> {
        self.store(session_id)?.query_all()
    }

    /// Stealth addresses of every key set, oldest first.
    pub fn addresses(&self, session_id: &Uuid) -> Result<Vec<String>> {
        Ok(self
            .key_sets(session_id)?
            .into_iter()
            .map(|k| k.stealth_address.clone())
            .collect())
    }

    pub fn last_key_set(&self, session_id: &Uuid) -> Result<KeySet> {
        self.key_sets(session_id)?
            .pop()
            .ok_or_else(|| WalletError::InvalidKeyMaterial("wallet has no key set".into()))
    }

    /// Derive and store the key set of the next account.
    pub fn add_key_set(&self, session_id: &Uuid) -> Result<KeySet> {
        let last = self.last_key_set(session_id)?;
        let next = add_key_set(&last, self.config.network)?;
        self.store(session_id)?.insert(&next)?;
        debug!(key_path = %next.key_path, "key set added");
        Ok(next)
    }

    /// The wallet's (spend, scan) private keys.
    pub fn unlock(&self, session_id: &Uuid) -> Result<(RistrettoPrivate, RistrettoPrivate)> {
        let root = self
            .key_sets(session_id)?
            .into_iter()
            .next()
            .ok_or_else(|| WalletError::InvalidKeyMaterial("wallet has no key set".into()))?;
        Ok(unlock(&root)?)
    }

    pub fn available_balance(&self, session_id: &Uuid) -> Result<u64> {
        let (_, scan) = self.unlock(session_id)?;
        let records = self.store(session_id)?.query_all::<WalletTransaction>()?;
        ledger::balance(&records, &scan)
    }

    pub fn history(&self, session_id: &Uuid) -> Result<History> {
        let (_, scan) = self.unlock(session_id)?;
        let records = self.store(session_id)?.query_all::<WalletTransaction>()?;
        ledger::history(&records, &scan)
    }

    /// Select the output to spend for the session's pending transfer.
    pub fn sort_change(&self, session_id: &Uuid) -> Result<WalletTransaction> {
        let result = self.sort_change_inner(session_id);
        self.track(session_id, result)
    }

    fn sort_change_inner(&self, session_id: &Uuid) -> Result<WalletTransaction> {
        let session = self.sessions.require(session_id)?;
        let (_, scan) = self.unlock(session_id)?;
        let records = self.store(session_id)?.query_all::<WalletTransaction>()?;

        let mut state = session.state();
        let fee = self.effective_fee(state.fee);
        let mut wallet_tx = ledger::sort_change(&records, &scan, state.amount, fee)?;
        wallet_tx.address = state.sender_address.clone();
        wallet_tx.memo = state.memo.clone();

        state.has_funds = true;
        self.sessions.add_or_update(session.updated(state))?;
        Ok(wallet_tx)
    }

    /// Assemble the transaction spending `wallet_tx`.
    ///
    /// On success the record is rewritten to hold the change output and the
    /// transaction id.
    pub fn create_transaction(
        &self,
        session: &Session,
        wallet_tx: &mut WalletTransaction,
    ) -> Result<Transaction> {
        let (spend, scan) = self.unlock(&session.session_id())?;
        let state = session.state();

        let request = SpendRequest {
            spend_key: &spend,
            scan_key: &scan,
            spent_output: &wallet_tx.vout,
            input_value: wallet_tx.balance,
            payment: wallet_tx.payment,
            fee: wallet_tx.fee,
            change: wallet_tx.change,
            sender_address: &state.sender_address,
            recipient_address: &state.recipient_address,
            memo: &state.memo,
            session_type: state.session_type,
            ring_size: self.config.ring_size,
            now: Utc::now().timestamp(),
            session_id: session.session_id(),
        };
        let tx = assemble(&request, &mut OsRng)?;

        let change = tx
            .vout
            .last()
            .cloned()
            .ok_or_else(|| WalletError::InvalidRequest("transaction has no outputs".into()))?;
        wallet_tx.vout = change;
        wallet_tx.tx_id = tx.txn_id_hex();
        Ok(tx)
    }

    /// Fetch the output behind `payment_id` and keep it if it is ours.
    ///
    /// Returns `false` when the output was already received.
    pub async fn receive_payment(&self, session_id: &Uuid, payment_id: &str) -> Result<bool> {
        let result = self.receive_payment_inner(session_id, payment_id).await;
        self.track(session_id, result)
    }

    async fn receive_payment_inner(&self, session_id: &Uuid, payment_id: &str) -> Result<bool> {
        let session = self.sessions.require(session_id)?;
        let vout = self.network.get_output(payment_id).await?;
        let note = self.owned_note(session_id, &vout)?;

        let store = self.store(session_id)?;
        if Self::is_held(store.as_ref(), &vout)? {
            debug!(payment_id, "output already received");
            return Ok(false);
        }

        let record = output_record(
            session.state().sender_address,
            vout,
            &note,
            WalletType::Receive,
            payment_id,
        );
        store.insert(&record)?;
        info!(payment_id, "payment received");
        Ok(true)
    }

    /// Re-import the outputs behind `payment_ids` as restored records.
    ///
    /// With `reset`, every wallet transaction and stored transaction is
    /// dropped first. Outputs that belong to another wallet, or that are
    /// already held, are skipped. Returns the number of outputs restored.
    pub async fn recover_payments(
        &self,
        session_id: &Uuid,
        payment_ids: &[String],
        reset: bool,
    ) -> Result<usize> {
        let result = self
            .recover_payments_inner(session_id, payment_ids, reset)
            .await;
        self.track(session_id, result)
    }

    async fn recover_payments_inner(
        &self,
        session_id: &Uuid,
        payment_ids: &[String],
        reset: bool,
    ) -> Result<usize> {
        let session = self.sessions.require(session_id)?;
        let mut outputs = Vec::with_capacity(payment_ids.len());
        for payment_id in payment_ids {
            outputs.push((payment_id, self.network.get_output(payment_id).await?));
        }

        let store = self.store(session_id)?;
        if reset {
            for record in store.query_all::<WalletTransaction>()? {
                store.remove::<WalletTransaction>(&record.key())?;
            }
            for tx in store.query_all::<Transaction>()? {
                store.remove::<Transaction>(&tx.key())?;
            }
            info!(session = %session_id, "wallet transactions dropped for recovery");
        }

        let address = session.state().sender_address;
        let mut restored = 0;
        for (payment_id, vout) in outputs {
            let note = match self.owned_note(session_id, &vout) {
                Ok(note) => note,
                Err(WalletError::InvalidKeyMaterial(reason)) => {
                    debug!(payment_id = %payment_id, "skipping output: {}", reason);
                    continue;
                }
                Err(err) => return Err(err),
            };
            if Self::is_held(store.as_ref(), &vout)? {
                continue;
            }
            let record = output_record(
                address.clone(),
                vout,
                &note,
                WalletType::Restore,
                payment_id,
            );
            store.insert(&record)?;
            restored += 1;
        }
        info!(session = %session_id, restored, "payments recovered");
        Ok(restored)
    }

    /// Delete a wallet and end every session on it. Returns whether the
    /// wallet existed.
    pub fn remove_wallet(&self, identifier: &str) -> Result<bool> {
        for session_id in self.sessions.sessions_for(identifier) {
            self.logout(&session_id);
        }
        let removed = self.provider.remove(identifier)?;
        if removed {
            info!(wallet = %identifier, "wallet removed");
        }
        Ok(removed)
    }

    /// The note of `vout` if it is addressed to this wallet and opens to its
    /// commitment.
    fn owned_note(&self, session_id: &Uuid, vout: &Vout) -> Result<Note> {
        let (spend, scan) = self.unlock(session_id)?;
        let ephemeral = RistrettoPublic::try_from(&vout.ephemeral_key)?;
        let onetime = uncover_spend_key(&spend, &scan, &ephemeral);
        if !onetime.matches(&vout.one_time_key) {
            return Err(WalletError::InvalidKeyMaterial(
                "output is not addressed to this wallet".into(),
            ));
        }
        let note = open_note(&scan, &vout.note)?;
        if commit(note.amount, &note.blind).compress().to_bytes() != vout.commitment {
            return Err(WalletError::CommitmentMismatch);
        }
        Ok(note)
    }

    fn is_held(store: &P::Store, vout: &Vout) -> Result<bool> {
        let seen = store.query(|r: &WalletTransaction| r.vout.one_time_key == vout.one_time_key)?;
        Ok(!seen.is_empty())
    }

    /// Build, store and broadcast the session's pending transfer.
    pub async fn transfer_payment(&self, session_id: &Uuid) -> Result<Transaction> {
        let result = self.transfer_payment_inner(session_id).await;
        self.track(session_id, result)
    }

    async fn transfer_payment_inner(&self, session_id: &Uuid) -> Result<Transaction> {
        let session = self.sessions.require(session_id)?;
        let mut wallet_tx = self.sort_change_inner(session_id)?;
        let held = wallet_tx.vout.identity();
        let tx = self.create_transaction(&session, &mut wallet_tx)?;

        let store = self.store(session_id)?;
        let held_record = store
            .query(|r: &WalletTransaction| r.is_spendable() && r.vout.identity() == held)?
            .into_iter()
            .next();
        let outcome = {
            let pending = PendingTransfer {
                previous: store.get::<Transaction>(&tx.key())?,
                tx: &tx,
                wallet_tx: &wallet_tx,
                held_record: held_record.as_ref(),
            };
            if let Err(err) = pending.write(store.as_ref()) {
                warn!(session = %session_id, "storing transfer failed, rolling back: {}", err);
                pending.roll_back(store.as_ref());
                return Err(err);
            }

            match self.network.broadcast(&tx).await {
                Ok(ack) => {
                    info!(
                        session = %session_id,
                        txn_id = %wallet_tx.tx_id,
                        tx_hash = %ack.tx_hash,
                        "transaction broadcast"
                    );
                    Ok(())
                }
                Err(err) => {
                    warn!(session = %session_id, "broadcast failed, rolling back: {}", err);
                    pending.roll_back(store.as_ref());
                    Err(err)
                }
            }
        };
        outcome.map(|()| tx)
    }

    fn effective_fee(&self, session_fee: Option<u64>) -> u64 {
        session_fee
            .unwrap_or_else(|| ledger::fee_for(MAX_TRANSACTION_SIZE, self.config.fee_per_byte))
    }

    fn lock_stores(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<P::Store>>> {
        match self.stores.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The store of a session, opened again if it was dropped.
    fn store(&self, session_id: &Uuid) -> Result<Arc<P::Store>> {
        if let Some(store) = self.lock_stores().get(session_id) {
            return Ok(store.clone());
        }
        let session = self.sessions.require(session_id)?;
        let store = Arc::new(self.provider.open(session.identifier(), session.passphrase())?);
        self.lock_stores().insert(*session_id, store.clone());
        Ok(store)
    }

    /// Record the outcome of an operation on its session.
    fn track<T>(&self, session_id: &Uuid, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.sessions.clear_last_error(session_id),
            Err(err) => {
                debug!(session = %session_id, "operation failed: {}", err);
                self.sessions.set_last_error(session_id, err.clone());
            }
        }
        result
    }
}

/// The store writes of one transfer, and how to undo them.
struct PendingTransfer<'a> {
    /// Transaction stored earlier under the same session id
    previous: Option<Transaction>,
    tx: &'a Transaction,
    wallet_tx: &'a WalletTransaction,
    held_record: Option<&'a WalletTransaction>,
}

impl PendingTransfer<'_> {
    fn write<S: WalletStore>(&self, store: &S) -> Result<()> {
        if !store.update(self.tx)? {
            store.insert(self.tx)?;
        }
        store.insert(self.wallet_tx)?;
        if let Some(record) = self.held_record {
            let mut spent = record.clone();
            spent.spent = true;
            store.update(&spent)?;
        }
        Ok(())
    }

    /// Undo every write of [`PendingTransfer::write`] that took place.
    fn roll_back<S: WalletStore>(&self, store: &S) {
        let result = (|| -> Result<()> {
            match &self.previous {
                Some(previous) => {
                    store.update(previous)?;
                }
                None => {
                    store.remove::<Transaction>(&self.tx.key())?;
                }
            }
            store.remove::<WalletTransaction>(&self.wallet_tx.key())?;
            if let Some(record) = self.held_record {
                store.update(record)?;
            }
            Ok(())
        })();
        if let Err(err) = result {
            warn!(txn_id = %self.tx.txn_id_hex(), "rollback incomplete: {}", err);
        }
    }
}

/// A record holding a received or restored output.
fn output_record(
    address: String,
    vout: Vout,
    note: &Note,
    wallet_type: WalletType,
    payment_id: &str,
) -> WalletTransaction {
    WalletTransaction {
        id: Uuid::new_v4(),
        address,
        vout,
        payment: 0,
        fee: 0,
        change: note.amount,
        balance: note.amount,
        spent: false,
        wallet_type,
        date_time: Utc::now(),
        tx_id: payment_id.to_string(),
        memo: note.memo.clone(),
    }
}
