// Copyright (c) 2024 The Veil Foundation

//! Errors which can occur in connection to ring signatures, commitments and
//! range proofs

use displaydoc::Display;
use serde::{Deserialize, Serialize};

/// The ring signature step that failed.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum RingStage {
    /// prepare
    Prepare,
    /// generate
    Generate,
    /// verify
    Verify,
}

/// An error which can occur when building or checking confidential amounts
#[derive(Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum Error {
    /// Incorrect length for array copy, provided `{0}`, required `{1}`.
    LengthMismatch(usize, usize),

    /// Index out of bounds
    IndexOutOfBounds,

    /// Invalid curve point
    InvalidCurvePoint,

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
}

impl Error {
    pub(crate) fn ring(stage: RingStage, reason: impl Into<String>) -> Self {
        Self::RingProofFailure {
            stage,
            reason: reason.into(),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_failure_names_stage() {
        let err = Error::ring(RingStage::Verify, "challenge mismatch");
        assert_eq!(
            err.to_string(),
            "Ring signature verify failed: challenge mismatch"
        );
    }
}
