// Copyright (c) 2024 The Veil Foundation

//! Bulletproof range proofs for hidden amounts.

use bulletproofs_og::{BulletproofGens, RangeProof};
use curve25519_dalek::{ristretto::CompressedRistretto, scalar::Scalar};
use merlin::Transcript;
use rand_chacha::ChaCha20Rng;
use rand_core::{OsRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{domain_separators::RANGE_PROOF_TRANSCRIPT_TAG, ring_signature::generators, Error};

/// Bits of range proven: amounts lie in `[0, 2^64)`.
pub const RANGE_PROOF_BITS: usize = 64;

/// A serialized range proof and the commitment it is bound to.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RangeProofBundle {
    /// `RangeProof::to_bytes()`
    pub proof: Vec<u8>,
    /// The commitment the proof was generated for.
    pub commitment: CompressedRistretto,
}

fn bulletproof_gens() -> BulletproofGens {
    BulletproofGens::new(RANGE_PROOF_BITS, 1)
}

/// Prove that the value committed by `commit(amount, blind)` is in range.
///
/// Prover randomness is drawn from a ChaCha20 stream keyed by `seed`.
pub fn gen_proof(amount: u64, blind: &Scalar, seed: [u8; 32]) -> Result<RangeProofBundle, Error> {
    let mut rng = ChaCha20Rng::from_seed(seed);
    let mut transcript = Transcript::new(RANGE_PROOF_TRANSCRIPT_TAG);
    let (proof, commitment) = RangeProof::prove_single_with_rng(
        &bulletproof_gens(),
        &generators(),
        &mut transcript,
        amount,
        blind,
        RANGE_PROOF_BITS,
        &mut rng,
    )
    .map_err(|e| Error::RangeProofFailure(format!("{e:?}")))?;

    Ok(RangeProofBundle {
        proof: proof.to_bytes(),
        commitment,
    })
}

/// Verify a serialized range proof against `commitment`.
pub fn verify_proof(commitment: &CompressedRistretto, proof: &[u8]) -> Result<(), Error> {
    let proof =
        RangeProof::from_bytes(proof).map_err(|e| Error::RangeProofFailure(format!("{e:?}")))?;
    let mut transcript = Transcript::new(RANGE_PROOF_TRANSCRIPT_TAG);
    proof
        .verify_single_with_rng(
            &bulletproof_gens(),
            &generators(),
            &mut transcript,
            commitment,
            RANGE_PROOF_BITS,
            &mut OsRng,
        )
        .map_err(|e| Error::RangeProofFailure(format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit;
    use assert_matches::assert_matches;

    #[test]
    fn test_proof_verifies_against_its_commitment() {
        let blind = Scalar::random(&mut OsRng);
        let bundle = gen_proof(40, &blind, [7u8; 32]).unwrap();
        assert_eq!(bundle.commitment, commit(40, &blind).compress());
        assert!(verify_proof(&bundle.commitment, &bundle.proof).is_ok());
    }

    #[test]
    fn test_extreme_amounts() {
        for amount in [0u64, 1, u64::MAX] {
            let blind = Scalar::random(&mut OsRng);
            let bundle = gen_proof(amount, &blind, [1u8; 32]).unwrap();
            assert!(verify_proof(&bundle.commitment, &bundle.proof).is_ok());
        }
    }

    #[test]
    fn test_proof_rejects_other_commitment() {
        let blind = Scalar::random(&mut OsRng);
        let bundle = gen_proof(40, &blind, [2u8; 32]).unwrap();
        let other = commit(41, &blind).compress();
        assert_matches!(
            verify_proof(&other, &bundle.proof),
            Err(Error::RangeProofFailure(_))
        );
    }

    #[test]
    fn test_garbage_proof_rejected() {
        let commitment = commit(1, &Scalar::ONE).compress();
        assert_matches!(
            verify_proof(&commitment, &[0u8; 10]),
            Err(Error::RangeProofFailure(_))
        );
    }

    #[test]
    fn test_proof_is_deterministic_in_seed() {
        let blind = Scalar::random(&mut OsRng);
        let a = gen_proof(5, &blind, [3u8; 32]).unwrap();
        let b = gen_proof(5, &blind, [3u8; 32]).unwrap();
        assert_eq!(a, b);
    }
}
