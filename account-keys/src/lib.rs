// Copyright (c) 2024 The Veil Foundation

#![deny(missing_docs)]
#![deny(unsafe_code)]

//! Account key structures for the Veil wallet.
//!
//! This crate owns everything that touches long-lived key material:
//! hierarchical-deterministic derivation of (spend, scan) key pairs,
//! the stealth address string format, the dual-key stealth protocol used to
//! derive unlinkable one-time destination keys, and [`SecretBuffer`], the
//! scoped container every secret passes through.

mod address;
mod domain_separators;
mod error;
mod hd;
mod keys;
mod secmem;
mod secret;
mod stealth;

pub use crate::{
    address::{Network, PublicAddress, MAINNET_ADDRESS_PREFIX, TESTNET_ADDRESS_PREFIX},
    error::{KeyError, Result},
    hd::{
        add_key_set, derive_key_set, root_key_set, unlock, DerivationPath, ExtendedKey, KeySet,
        COIN_TYPE, HARDENED, PURPOSE, ROOT_KEY_PATH, SCAN_KEY_PATH, SPEND_KEY_PATH,
    },
    keys::{RistrettoPrivate, RistrettoPublic},
    secmem::LockResult,
    secret::SecretBuffer,
    stealth::{
        get_scan_public_key, make_stealth_payment, make_stealth_payment_to, uncover_spend_key,
        OneTimeKeyPair, StealthPayment,
    },
};
