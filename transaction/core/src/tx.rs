// Copyright (c) 2024 The Veil Foundation

//! Definition of a confidential transaction and its wire encoding.
//!
//! The wire form is the bincode encoding of the fields `version`, `mix`,
//! `vin`, `vout`, `bulletproof`, `ring_signature` and `txn_id`, in that
//! order. The local session id is not part of it.

use blake2::{digest::consts::U32, Blake2b, Digest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veil_crypto_ring_signature::{KeyImage, RingMatrix, Scalar};

use crate::{constants::MAX_TRANSACTION_SIZE, parse_lock_script, CoinType, TxBuildError};

type Blake2b256 = Blake2b<U32>;

/// A transaction output.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Vout {
    /// Public amount; zero when the value is hidden in the commitment.
    pub amount: u64,
    /// Pedersen commitment `C` to the amount.
    pub commitment: [u8; 32],
    /// Ephemeral stealth key `E`.
    pub ephemeral_key: [u8; 32],
    /// Unix time before which the output cannot be spent.
    pub lock_time: i64,
    /// Encrypted note `N`.
    pub note: Vec<u8>,
    /// One-time destination key `P`.
    pub one_time_key: [u8; 32],
    /// Lock script `S`, empty for unlocked outputs.
    pub script: String,
    /// Output type `T`.
    pub coin_type: CoinType,
}

impl Vout {
    /// The `(E, P)` pair identifying this output.
    pub fn identity(&self) -> ([u8; 32], [u8; 32]) {
        (self.ephemeral_key, self.one_time_key)
    }

    /// True for an output whose lock has not expired at `now`, or whose
    /// script does not encode its lock time. Coinbase outputs must carry a
    /// lock; other outputs without a script are spendable at once.
    pub fn is_locked_or_invalid(&self, now: i64) -> bool {
        if self.script.is_empty() {
            return self.coin_type == CoinType::Coinbase;
        }
        match parse_lock_script(&self.script) {
            Some(lock_time) if lock_time == self.lock_time => now < lock_time,
            _ => true,
        }
    }
}

/// A transaction input.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Vin {
    /// Key image of the spent one-time key.
    pub key_image: KeyImage,
    /// One offset per ring column.
    pub ring_offsets: Vec<u32>,
}

/// A serialized range proof for one hidden output.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Bulletproof {
    /// `RangeProof::to_bytes()`
    pub proof: Vec<u8>,
}

/// The ring signature over the input.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RingSignatureData {
    /// Pre-image bound into every round hash.
    pub image: [u8; 32],
    /// The signed ring matrix.
    pub matrix: RingMatrix,
    /// Initial challenge `c[0]`.
    pub challenge: Scalar,
    /// Responses, row-major.
    pub responses: Vec<Scalar>,
}

/// A signed confidential transaction.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Transaction {
    /// Session that produced the transaction. Local only.
    pub id: Uuid,
    /// Format version
    pub version: u32,
    /// Ring size
    pub mix: u32,
    /// Inputs
    pub vin: Vec<Vin>,
    /// Outputs: fee, payment, change
    pub vout: Vec<Vout>,
    /// Range proofs for hidden outputs
    pub bulletproof: Vec<Bulletproof>,
    /// Ring signature
    pub ring_signature: RingSignatureData,
    /// Content hash, see [`Transaction::compute_txn_id`]
    pub txn_id: [u8; 32],
}

#[derive(Serialize)]
struct WireRef<'a> {
    version: u32,
    mix: u32,
    vin: &'a [Vin],
    vout: &'a [Vout],
    bulletproof: &'a [Bulletproof],
    ring_signature: &'a RingSignatureData,
    txn_id: [u8; 32],
}

#[derive(Deserialize)]
struct Wire {
    version: u32,
    mix: u32,
    vin: Vec<Vin>,
    vout: Vec<Vout>,
    bulletproof: Vec<Bulletproof>,
    ring_signature: RingSignatureData,
    txn_id: [u8; 32],
}

impl Transaction {
    fn wire(&self, txn_id: [u8; 32]) -> WireRef<'_> {
        WireRef {
            version: self.version,
            mix: self.mix,
            vin: &self.vin,
            vout: &self.vout,
            bulletproof: &self.bulletproof,
            ring_signature: &self.ring_signature,
            txn_id,
        }
    }

    /// The wire encoding.
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, TxBuildError> {
        Ok(bincode::serialize(&self.wire(self.txn_id))?)
    }

    /// Decode a wire transaction. The local `id` is set to nil.
    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, TxBuildError> {
        if bytes.len() > MAX_TRANSACTION_SIZE {
            return Err(TxBuildError::TransactionOverflow(bytes.len()));
        }
        let wire: Wire = bincode::deserialize(bytes)?;
        Ok(Self {
            id: Uuid::nil(),
            version: wire.version,
            mix: wire.mix,
            vin: wire.vin,
            vout: wire.vout,
            bulletproof: wire.bulletproof,
            ring_signature: wire.ring_signature,
            txn_id: wire.txn_id,
        })
    }

    /// Size of the wire encoding in bytes.
    pub fn serialized_size(&self) -> Result<usize, TxBuildError> {
        Ok(bincode::serialized_size(&self.wire(self.txn_id))? as usize)
    }

    /// BLAKE2b-256 of the wire encoding with `txn_id` zeroed.
    pub fn compute_txn_id(&self) -> Result<[u8; 32], TxBuildError> {
        let bytes = bincode::serialize(&self.wire([0u8; 32]))?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&Blake2b256::digest(&bytes));
        Ok(out)
    }

    /// Hex of `txn_id`.
    pub fn txn_id_hex(&self) -> String {
        hex::encode(self.txn_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock_script;
    use veil_crypto_ring_signature::N_ROWS;

    fn sample() -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            version: 1,
            mix: 2,
            vin: vec![Vin {
                key_image: KeyImage::default(),
                ring_offsets: vec![0, 0],
            }],
            vout: vec![Vout {
                amount: 5,
                note: vec![1, 2, 3],
                script: lock_script(100),
                lock_time: 100,
                coin_type: CoinType::Fee,
                ..Default::default()
            }],
            bulletproof: vec![Bulletproof { proof: vec![9; 10] }],
            ring_signature: RingSignatureData {
                image: [4u8; 32],
                matrix: RingMatrix::new(N_ROWS, 2).unwrap(),
                challenge: Scalar::ONE,
                responses: vec![Scalar::ONE; 4],
            },
            txn_id: [0u8; 32],
        }
    }

    #[test]
    fn test_wire_roundtrip_drops_local_id() {
        let mut tx = sample();
        tx.txn_id = tx.compute_txn_id().unwrap();
        let bytes = tx.to_wire_bytes().unwrap();
        assert_eq!(bytes.len(), tx.serialized_size().unwrap());

        let decoded = Transaction::from_wire_bytes(&bytes).unwrap();
        assert_eq!(decoded.id, Uuid::nil());
        assert_eq!(Transaction { id: tx.id, ..decoded }, tx);
    }

    #[test]
    fn test_txn_id_ignores_stored_id_fields() {
        let mut tx = sample();
        let before = tx.compute_txn_id().unwrap();
        tx.txn_id = before;
        tx.id = Uuid::new_v4();
        assert_eq!(tx.compute_txn_id().unwrap(), before);

        tx.vout[0].amount += 1;
        assert_ne!(tx.compute_txn_id().unwrap(), before);
    }

    #[test]
    fn test_oversized_wire_rejected() {
        let bytes = vec![0u8; MAX_TRANSACTION_SIZE + 1];
        assert_eq!(
            Transaction::from_wire_bytes(&bytes),
            Err(TxBuildError::TransactionOverflow(MAX_TRANSACTION_SIZE + 1))
        );
    }

    #[test]
    fn test_coinbase_lock() {
        let mut vout = Vout {
            coin_type: CoinType::Coinbase,
            lock_time: 1000,
            script: lock_script(1000),
            ..Default::default()
        };
        assert!(vout.is_locked_or_invalid(999));
        assert!(!vout.is_locked_or_invalid(1000));

        vout.script = lock_script(1);
        assert!(vout.is_locked_or_invalid(5000));

        vout.script.clear();
        assert!(vout.is_locked_or_invalid(5000));
    }

    #[test]
    fn test_change_lock_applies_to_coin_outputs() {
        let mut vout = Vout {
            coin_type: CoinType::Coin,
            lock_time: 1300,
            script: lock_script(1300),
            ..Default::default()
        };
        assert!(vout.is_locked_or_invalid(1000));
        assert!(!vout.is_locked_or_invalid(1300));

        vout.script = "garbage".into();
        assert!(vout.is_locked_or_invalid(5000));

        vout.script.clear();
        vout.lock_time = 0;
        assert!(!vout.is_locked_or_invalid(0));
    }
}
