// Copyright (c) 2024 The Veil Foundation

//! Pedersen commitments and blinding-factor arithmetic.
//!
//! A commitment to `v` with blind `b` is `C = v*H + b*G`. Because commitments
//! add homomorphically, a transaction balances exactly when
//! `sum(C_out) - sum(C_in)` is the identity, which anyone can check without
//! learning a single amount.

use blake2::{Blake2b512, Digest};
use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar, traits::Identity};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    domain_separators::{BLIND_SWITCH_DOMAIN_TAG, BLIND_SWITCH_GENERATOR_DOMAIN_TAG},
    ring_signature::{generators, Error},
};

/// `v*H + b*G`
pub fn commit(amount: u64, blind: &Scalar) -> RistrettoPoint {
    generators().commit(Scalar::from(amount), *blind)
}

/// Derive a blind from a random `seed`, bound to the committed amount.
///
/// `blind_switch(v, s) = s + Hs(tag || commit(v, s) || s*J)` where `J` is a
/// generator with no known relation to `G` or `H`.
pub fn blind_switch(amount: u64, seed: &Scalar) -> Scalar {
    let J = RistrettoPoint::hash_from_bytes::<Blake2b512>(BLIND_SWITCH_GENERATOR_DOMAIN_TAG);

    let mut hasher = Blake2b512::new();
    hasher.update(BLIND_SWITCH_DOMAIN_TAG);
    hasher.update(commit(amount, seed).compress().as_bytes());
    hasher.update((seed * J).compress().as_bytes());
    seed + Scalar::from_hash(hasher)
}

/// `sum(positives) - sum(negatives)`
pub fn blind_sum(positives: &[Scalar], negatives: &[Scalar]) -> Scalar {
    let plus: Scalar = positives.iter().sum();
    let minus: Scalar = negatives.iter().sum();
    plus - minus
}

/// `sum(positives) - sum(negatives)`
pub fn commit_sum(positives: &[RistrettoPoint], negatives: &[RistrettoPoint]) -> RistrettoPoint {
    let plus: RistrettoPoint = positives.iter().sum();
    let minus: RistrettoPoint = negatives.iter().sum();
    plus - minus
}

/// Fails with [`Error::CommitmentMismatch`] unless both sides commit to the
/// same value with the same total blind.
pub fn verify_commit_sum(
    positives: &[RistrettoPoint],
    negatives: &[RistrettoPoint],
) -> Result<(), Error> {
    if commit_sum(positives, negatives) == RistrettoPoint::identity() {
        Ok(())
    } else {
        Err(Error::CommitmentMismatch)
    }
}

/// Position of a value in [`AmountBlinds`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlindSlot {
    /// The spent output
    Input = 0,
    /// The public fee
    Fee = 1,
    /// The amount sent to the recipient
    Payment = 2,
    /// Change returned to the sender
    Change = 3,
}

/// Values, blinds and commitments for one transaction build.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AmountBlinds {
    values: [u64; 4],
    blinds: [Scalar; 4],
    commitments: [RistrettoPoint; 4],
}

impl Default for AmountBlinds {
    fn default() -> Self {
        Self {
            values: [0; 4],
            blinds: [Scalar::ZERO; 4],
            commitments: [RistrettoPoint::identity(); 4],
        }
    }
}

impl AmountBlinds {
    /// Record `value` and `blind` in `slot` and commit to them.
    pub fn set(&mut self, slot: BlindSlot, value: u64, blind: Scalar) {
        let i = slot as usize;
        self.values[i] = value;
        self.blinds[i] = blind;
        self.commitments[i] = commit(value, &blind);
    }

    /// The value in `slot`.
    pub fn value(&self, slot: BlindSlot) -> u64 {
        self.values[slot as usize]
    }

    /// The blind in `slot`.
    pub fn blind(&self, slot: BlindSlot) -> &Scalar {
        &self.blinds[slot as usize]
    }

    /// The commitment in `slot`.
    pub fn commitment(&self, slot: BlindSlot) -> RistrettoPoint {
        self.commitments[slot as usize]
    }

    /// Fee, payment and change commitments, in that order.
    pub fn output_commitments(&self) -> [RistrettoPoint; 3] {
        [
            self.commitment(BlindSlot::Fee),
            self.commitment(BlindSlot::Payment),
            self.commitment(BlindSlot::Change),
        ]
    }

    /// Input blind minus every output blind.
    pub fn residual_blind(&self) -> Scalar {
        blind_sum(
            &[*self.blind(BlindSlot::Input)],
            &[
                *self.blind(BlindSlot::Fee),
                *self.blind(BlindSlot::Payment),
                *self.blind(BlindSlot::Change),
            ],
        )
    }

    /// Make the change blind absorb the residual so that the output blinds
    /// sum to the input blind, then re-commit the change.
    pub fn realign_change(&mut self) {
        let change = blind_sum(
            &[*self.blind(BlindSlot::Input)],
            &[*self.blind(BlindSlot::Fee), *self.blind(BlindSlot::Payment)],
        );
        self.set(BlindSlot::Change, self.value(BlindSlot::Change), change);
    }

    /// Check that the outputs balance the input.
    pub fn verify(&self) -> Result<(), Error> {
        verify_commit_sum(
            &self.output_commitments(),
            &[self.commitment(BlindSlot::Input)],
        )
    }
}
