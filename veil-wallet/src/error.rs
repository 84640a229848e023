//! Wallet error taxonomy
//!
//! Every fallible wallet operation returns [`WalletError`]. Errors from the
//! key, ring signature and transaction crates convert into it so that the
//! stage that failed survives the trip to the caller.

use thiserror::Error;
use uuid::Uuid;
use veil_account_keys::KeyError;
use veil_transaction_core::{ring_signature::RingStage, TxBuildError};

/// Result type used throughout the wallet.
pub type Result<T> = std::result::Result<T, WalletError>;

/// A wallet operation failure.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum WalletError {
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    #[error("Ring signature {stage} failed: {reason}")]
    RingProofFailure { stage: RingStage, reason: String },

    #[error("Output commitments do not balance the input commitment")]
    CommitmentMismatch,

    #[error("Range proof rejected: {0}")]
    RangeProofFailure(String),

    #[error("Serialized transaction is {0} bytes, exceeding the limit")]
    TransactionOverflow(usize),

    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error("Session {0} is already registered to a different wallet")]
    SessionConflict(Uuid),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Wallet store: {0}")]
    Store(String),

    #[error("Network: {0}")]
    Network(String),
}

impl WalletError {
    /// Whether the caller may retry the operation, with corrected input or
    /// fresh randomness. Nothing is retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::MalformedAddress(_)
                | WalletError::RingProofFailure { .. }
                | WalletError::InsufficientFunds { .. }
                | WalletError::Network(_)
        )
    }
}

impl From<KeyError> for WalletError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::InvalidKeyMaterial(msg) => WalletError::InvalidKeyMaterial(msg),
            KeyError::MalformedAddress(msg) => WalletError::MalformedAddress(msg),
        }
    }
}

impl From<TxBuildError> for WalletError {
    fn from(err: TxBuildError) -> Self {
        match err {
            TxBuildError::Key(err) => err.into(),
            TxBuildError::RingProofFailure { stage, reason } => {
                WalletError::RingProofFailure { stage, reason }
            }
            TxBuildError::CommitmentMismatch => WalletError::CommitmentMismatch,
            TxBuildError::RangeProofFailure(reason) => WalletError::RangeProofFailure(reason),
            TxBuildError::TransactionOverflow(size) => WalletError::TransactionOverflow(size),
            TxBuildError::InvalidAmounts(msg) => WalletError::InvalidRequest(msg),
            TxBuildError::Note(msg) => {
                WalletError::InvalidKeyMaterial(format!("note could not be opened: {msg}"))
            }
            TxBuildError::Encoding(msg) => WalletError::Store(msg),
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::Store(err.to_string())
    }
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        WalletError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(WalletError::MalformedAddress("x".into()).is_retryable());
        assert!(WalletError::Network("timeout".into()).is_retryable());
        assert!(WalletError::InsufficientFunds {
            requested: 10,
            available: 5
        }
        .is_retryable());
        assert!(WalletError::RingProofFailure {
            stage: RingStage::Verify,
            reason: "ring did not close".into()
        }
        .is_retryable());

        assert!(!WalletError::CommitmentMismatch.is_retryable());
        assert!(!WalletError::TransactionOverflow(4000).is_retryable());
        assert!(!WalletError::InvalidKeyMaterial("x".into()).is_retryable());
        assert!(!WalletError::SessionConflict(Uuid::nil()).is_retryable());
        assert!(!WalletError::Store("disk".into()).is_retryable());
    }

    #[test]
    fn test_build_errors_keep_their_kind() {
        let err: WalletError = TxBuildError::TransactionOverflow(3600).into();
        assert_eq!(err, WalletError::TransactionOverflow(3600));

        let err: WalletError = TxBuildError::Key(KeyError::MalformedAddress("bad".into())).into();
        assert_eq!(err, WalletError::MalformedAddress("bad".into()));

        let err: WalletError = TxBuildError::RingProofFailure {
            stage: RingStage::Generate,
            reason: "secret mismatch".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Ring signature generate failed: secret mismatch"
        );
    }
}
