// Copyright (c) 2024 The Veil Foundation

//! Domain separation tags for every hash in this crate.

/// Tag hashed to a point to obtain the value generator `H`.
pub const VALUE_GENERATOR_DOMAIN_TAG: &[u8] = b"veil_value_generator";

/// Tag hashed to a point to obtain the blind-switch generator `J`.
pub const BLIND_SWITCH_GENERATOR_DOMAIN_TAG: &[u8] = b"veil_blind_switch_generator";

/// Domain separator for `blind_switch`.
pub const BLIND_SWITCH_DOMAIN_TAG: &[u8] = b"veil_blind_switch";

/// Domain separator for `Hp`, hashing a public key onto the curve.
pub const HASH_TO_POINT_DOMAIN_TAG: &[u8] = b"veil_hash_to_point";

/// Domain separator for MLSAG round challenges.
pub const MLSAG_ROUND_HASH_DOMAIN_TAG: &[u8] = b"veil_mlsag_round";

/// Domain separator for the digest of a ring matrix.
pub const MLSAG_MATRIX_DIGEST_DOMAIN_TAG: &[u8] = b"veil_mlsag_matrix";

/// Merlin transcript label for change range proofs.
pub const RANGE_PROOF_TRANSCRIPT_TAG: &[u8] = b"veil_change_range_proof";
