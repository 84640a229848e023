// Copyright (c) 2024 The Veil Foundation

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![allow(non_snake_case)]

//! Confidential amount primitives for Veil transactions.
//!
//! * [`amounts`]: Pedersen commitments and blinding-factor bookkeeping.
//! * [`ring_signature`]: a two-row MLSAG over one-time keys and commitment
//!   differences, with linkable key images.
//! * [`range_proof`]: 64-bit bulletproofs over change commitments.

pub mod amounts;
mod domain_separators;
pub mod range_proof;
pub mod ring_signature;

pub use crate::{
    amounts::{
        blind_sum, blind_switch, commit, commit_sum, verify_commit_sum, AmountBlinds, BlindSlot,
    },
    range_proof::{gen_proof, verify_proof, RangeProofBundle, RANGE_PROOF_BITS},
    ring_signature::{
        generators, hash_to_point, Error, KeyImage, Mlsag, MlsagSignature, PedersenGens,
        RingMatrix, RingStage, Scalar, B_BLINDING, N_ROWS,
    },
};

pub use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
