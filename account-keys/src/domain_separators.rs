// Copyright (c) 2024 The Veil Foundation

//! Domain separation tags for hashes used by this crate.

/// HMAC key used to turn a BIP-39 seed into the master extended key.
pub const MASTER_SEED_HMAC_KEY: &[u8] = b"veil-seed";

/// Domain separator for the stealth shared-secret scalar `Hs(r*S)`.
pub const STEALTH_SHARED_SECRET_DOMAIN_TAG: &[u8] = b"veil_stealth_shared_secret";
