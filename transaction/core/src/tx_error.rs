// Copyright (c) 2024 The Veil Foundation

//! Errors that can occur while assembling a transaction

use displaydoc::Display;
use veil_account_keys::KeyError;
use veil_crypto_ring_signature::{Error as RingError, RingStage};

use crate::constants::MAX_TRANSACTION_SIZE;

/// An error that occurs when building a transaction.
///
/// No partially built transaction is ever returned alongside one of these.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum TxBuildError {
    /// Key: {0}
    Key(KeyError),

    /// Ring signature {stage} failed: {reason}
    RingProofFailure {
        /// Which step rejected the ring
        stage: RingStage,
        /// What was wrong
        reason: String,
    },

    /// Output commitments do not balance the input commitment
    CommitmentMismatch,

    /// Range proof rejected: {0}
    RangeProofFailure(String),

    /// Serialized transaction is {0} bytes, exceeding the limit
    TransactionOverflow(usize),

    /// Invalid amounts: {0}
    InvalidAmounts(String),

    /// Note could not be opened: {0}
    Note(String),

    /// Encoding: {0}
    Encoding(String),
}

impl TxBuildError {
    /// The size ceiling reported by [`TxBuildError::TransactionOverflow`].
    pub const fn size_limit() -> usize {
        MAX_TRANSACTION_SIZE
    }
}

impl std::error::Error for TxBuildError {}

impl From<KeyError> for TxBuildError {
    fn from(src: KeyError) -> Self {
        Self::Key(src)
    }
}

impl From<RingError> for TxBuildError {
    fn from(src: RingError) -> Self {
        match src {
            RingError::RingProofFailure { stage, reason } => {
                Self::RingProofFailure { stage, reason }
            }
            RingError::CommitmentMismatch => Self::CommitmentMismatch,
            RingError::RangeProofFailure(reason) => Self::RangeProofFailure(reason),
            other @ (RingError::LengthMismatch(..)
            | RingError::IndexOutOfBounds
            | RingError::InvalidCurvePoint) => Self::RingProofFailure {
                stage: RingStage::Prepare,
                reason: other.to_string(),
            },
        }
    }
}

impl From<bincode::Error> for TxBuildError {
    fn from(src: bincode::Error) -> Self {
        Self::Encoding(src.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_errors_keep_their_stage() {
        let err: TxBuildError = RingError::RingProofFailure {
            stage: RingStage::Generate,
            reason: "bad secret".into(),
        }
        .into();
        assert_eq!(
            err,
            TxBuildError::RingProofFailure {
                stage: RingStage::Generate,
                reason: "bad secret".into()
            }
        );
    }

    #[test]
    fn test_matrix_errors_are_prepare_failures() {
        let err: TxBuildError = RingError::IndexOutOfBounds.into();
        assert!(matches!(
            err,
            TxBuildError::RingProofFailure {
                stage: RingStage::Prepare,
                ..
            }
        ));
    }

    #[test]
    fn test_overflow_display() {
        let err = TxBuildError::TransactionOverflow(4000);
        assert_eq!(
            err.to_string(),
            "Serialized transaction is 4000 bytes, exceeding the limit"
        );
        assert_eq!(TxBuildError::size_limit(), 3538);
    }

    #[test]
    fn test_key_error_conversion() {
        let err: TxBuildError = KeyError::MalformedAddress("bad".into()).into();
        assert_eq!(err.to_string(), "Key: Malformed address: bad");
    }
}
