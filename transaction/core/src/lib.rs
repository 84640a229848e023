// Copyright (c) 2024 The Veil Foundation

//! Veil transaction data types, output notes and the confidential
//! transaction assembler.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![allow(non_snake_case)]

pub mod assembler;
mod coin_type;
pub mod constants;
mod note;
mod script;
pub mod tx;
mod tx_error;

pub use assembler::{assemble, SpendRequest};
pub use coin_type::{CoinType, SessionType};
pub use note::{encrypt_note, open_note, Note};
pub use script::{lock_script, parse_lock_script};
pub use tx::{Bulletproof, RingSignatureData, Transaction, Vin, Vout};
pub use tx_error::TxBuildError;

/// Re-export the ring signature crate
pub mod ring_signature {
    pub use veil_crypto_ring_signature::*;
}
