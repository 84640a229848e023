//! Sessions: one unit of work per unlocked wallet.
//!
//! A [`Session`] carries the wallet credentials and the parameters of the
//! pending operation. Sessions live in a [`SessionRegistry`]; outside the
//! registry the only way to change a session is to present an updated copy
//! to [`SessionRegistry::add_or_update`], which merges it atomically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::debug;
use uuid::Uuid;
use veil_account_keys::SecretBuffer;
use veil_transaction_core::SessionType;

use crate::error::{Result, WalletError};

/// Mutable session parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub session_type: SessionType,
    pub sender_address: String,
    pub recipient_address: String,
    pub amount: u64,
    /// Explicit fee; `None` derives it from the configured rate
    pub fee: Option<u64>,
    pub memo: String,
    pub has_funds: bool,
    pub last_error: Option<WalletError>,
}

/// An unlocked wallet.
#[derive(Debug)]
pub struct Session {
    session_id: Uuid,
    identifier: String,
    passphrase: SecretBuffer,
    state: RwLock<SessionState>,
}

impl Session {
    /// A new session with a fresh id.
    pub fn new(identifier: impl Into<String>, passphrase: SecretBuffer) -> Self {
        Self::with_state(Uuid::new_v4(), identifier, passphrase, SessionState::default())
    }

    /// A session with an explicit id and state.
    pub fn with_state(
        session_id: Uuid,
        identifier: impl Into<String>,
        passphrase: SecretBuffer,
        state: SessionState,
    ) -> Self {
        Self {
            session_id,
            identifier: identifier.into(),
            passphrase,
            state: RwLock::new(state),
        }
    }

    /// A copy of this session carrying `state`, to be merged back through
    /// the registry.
    pub fn updated(&self, state: SessionState) -> Self {
        Self::with_state(
            self.session_id,
            self.identifier.clone(),
            self.passphrase.duplicate(),
            state,
        )
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// The wallet identifier this session unlocked.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn passphrase(&self) -> &SecretBuffer {
        &self.passphrase
    }

    /// A snapshot of the mutable parameters.
    pub fn state(&self) -> SessionState {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn last_error(&self) -> Option<WalletError> {
        self.state().last_error
    }

    fn write_state(&self, f: impl FnOnce(&mut SessionState)) {
        match self.state.write() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// Copy the pending-operation fields of `other`. `last_error` is only
    /// written through the registry.
    fn merge_from(&self, other: &Session) {
        let incoming = other.state();
        self.write_state(|state| {
            state.session_type = incoming.session_type;
            state.sender_address = incoming.sender_address;
            state.recipient_address = incoming.recipient_address;
            state.amount = incoming.amount;
            state.fee = incoming.fee;
            state.memo = incoming.memo;
            state.has_funds = incoming.has_funds;
        });
    }
}

/// The set of active sessions, keyed by session id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<Session>>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Insert `session`, or merge its parameters into the registered session
    /// with the same id.
    ///
    /// Fails with [`WalletError::SessionConflict`] if the id is registered to
    /// a different wallet.
    pub fn add_or_update(&self, session: Session) -> Result<Arc<Session>> {
        let mut sessions = self.lock();
        match sessions.get(&session.session_id) {
            Some(existing) => {
                if existing.identifier != session.identifier {
                    return Err(WalletError::SessionConflict(session.session_id));
                }
                existing.merge_from(&session);
                Ok(existing.clone())
            }
            None => {
                debug!(session_id = %session.session_id, "session registered");
                let session = Arc::new(session);
                sessions.insert(session.session_id, session.clone());
                Ok(session)
            }
        }
    }

    /// Look up a session. `None` means not authenticated.
    pub fn get_session(&self, session_id: &Uuid) -> Option<Arc<Session>> {
        self.lock().get(session_id).cloned()
    }

    /// Like [`SessionRegistry::get_session`], failing with
    /// [`WalletError::NotAuthenticated`].
    pub fn require(&self, session_id: &Uuid) -> Result<Arc<Session>> {
        self.get_session(session_id)
            .ok_or(WalletError::NotAuthenticated)
    }

    /// Record `err` as the session's last error.
    pub fn set_last_error(&self, session_id: &Uuid, err: WalletError) {
        let sessions = self.lock();
        if let Some(session) = sessions.get(session_id) {
            session.write_state(|state| state.last_error = Some(err));
        }
    }

    /// Clear the session's last error.
    pub fn clear_last_error(&self, session_id: &Uuid) {
        let sessions = self.lock();
        if let Some(session) = sessions.get(session_id) {
            session.write_state(|state| state.last_error = None);
        }
    }

    /// Ids of every session opened on wallet `identifier`.
    pub fn sessions_for(&self, identifier: &str) -> Vec<Uuid> {
        self.lock()
            .values()
            .filter(|s| s.identifier == identifier)
            .map(|s| s.session_id)
            .collect()
    }

    /// Drop a session (logout). Returns whether it was registered.
    pub fn remove(&self, session_id: &Uuid) -> bool {
        self.lock().remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
