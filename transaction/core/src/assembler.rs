// Copyright (c) 2024 The Veil Foundation

//! Assembly of a signed confidential transaction from one owned output.
//!
//! The input is spent into three outputs, always in the order fee, payment,
//! change. The ring signature is computed over the provisional change
//! commitment; the change blind is then realigned so that the outputs
//! balance the input exactly, and the range proof covers the realigned
//! change commitment.

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand::Rng;
use rand_core::{CryptoRng, RngCore};
use tracing::debug;
use uuid::Uuid;
use veil_account_keys::{
    make_stealth_payment, uncover_spend_key, KeyError, PublicAddress, RistrettoPrivate,
    RistrettoPublic,
};
use veil_crypto_ring_signature::{
    blind_switch, commit, gen_proof, verify_proof, AmountBlinds, BlindSlot, Mlsag, RingMatrix,
    RingStage, N_ROWS,
};
use zeroize::Zeroizing;

use crate::{
    constants::{
        CHANGE_LOCK_SECS, FEE_LOCK_SECS, MAX_RING_SIZE, MAX_TRANSACTION_SIZE, MIN_RING_SIZE,
        TX_VERSION,
    },
    encrypt_note, lock_script, open_note, Bulletproof, Note, RingSignatureData, SessionType,
    Transaction, TxBuildError, Vin, Vout,
};

/// Everything needed to spend one output.
pub struct SpendRequest<'a> {
    /// Unlocked spend private key
    pub spend_key: &'a RistrettoPrivate,
    /// Unlocked scan private key
    pub scan_key: &'a RistrettoPrivate,
    /// The output being spent
    pub spent_output: &'a Vout,
    /// Amount held by `spent_output`
    pub input_value: u64,
    /// Amount sent to the recipient
    pub payment: u64,
    /// Public fee
    pub fee: u64,
    /// Amount returned to the sender
    pub change: u64,
    /// Sender's address string; fee and change are paid here
    pub sender_address: &'a str,
    /// Recipient's address string
    pub recipient_address: &'a str,
    /// Memo carried in the payment note
    pub memo: &'a str,
    /// What kind of spend this is
    pub session_type: SessionType,
    /// Number of ring columns, including the real one
    pub ring_size: usize,
    /// Current unix time, used for output locks
    pub now: i64,
    /// Session id recorded on the transaction
    pub session_id: Uuid,
}

impl SpendRequest<'_> {
    fn validate(&self) -> Result<(), TxBuildError> {
        let total = self
            .payment
            .checked_add(self.fee)
            .and_then(|v| v.checked_add(self.change))
            .ok_or_else(|| TxBuildError::InvalidAmounts("output sum overflows".into()))?;
        if total != self.input_value {
            return Err(TxBuildError::InvalidAmounts(format!(
                "input {} != payment {} + fee {} + change {}",
                self.input_value, self.payment, self.fee, self.change
            )));
        }
        if !(MIN_RING_SIZE..=MAX_RING_SIZE).contains(&self.ring_size) {
            return Err(TxBuildError::RingProofFailure {
                stage: RingStage::Prepare,
                reason: format!(
                    "ring size {} outside {MIN_RING_SIZE}..={MAX_RING_SIZE}",
                    self.ring_size
                ),
            });
        }
        Ok(())
    }
}

/// Build, sign and size-check a transaction for `request`.
pub fn assemble<R: CryptoRng + RngCore>(
    request: &SpendRequest,
    rng: &mut R,
) -> Result<Transaction, TxBuildError> {
    request.validate()?;
    let (sender, _) = PublicAddress::parse(request.sender_address)?;
    let (recipient, _) = PublicAddress::parse(request.recipient_address)?;

    // Uncover the spent output and recover its blind.
    let spent = request.spent_output;
    let ephemeral = RistrettoPublic::try_from(&spent.ephemeral_key)?;
    let onetime = uncover_spend_key(request.spend_key, request.scan_key, &ephemeral);
    if !onetime.matches(&spent.one_time_key) {
        return Err(KeyError::InvalidKeyMaterial(
            "spent output is not addressed to this key set".into(),
        )
        .into());
    }
    let held = open_note(request.scan_key, &spent.note)?;
    let input_commitment = CompressedRistretto(spent.commitment)
        .decompress()
        .ok_or(TxBuildError::CommitmentMismatch)?;
    if commit(request.input_value, &held.blind) != input_commitment {
        return Err(TxBuildError::CommitmentMismatch);
    }

    let mut blinds = AmountBlinds::default();
    blinds.set(BlindSlot::Input, request.input_value, held.blind);
    for (slot, value) in [
        (BlindSlot::Fee, request.fee),
        (BlindSlot::Payment, request.payment),
        (BlindSlot::Change, request.change),
    ] {
        let seed = Scalar::random(rng);
        blinds.set(slot, value, blind_switch(value, &seed));
    }

    // Ring matrix: one-time keys in row 0, input commitments in row 1.
    let ring_size = request.ring_size;
    let real_index = rng.gen_range(0..ring_size);
    let mut matrix = RingMatrix::new(N_ROWS, ring_size)?;
    for col in 0..ring_size {
        let (key, input) = if col == real_index {
            (*onetime.public_key().as_ref(), input_commitment)
        } else {
            let decoy = RistrettoPrivate::from_random(rng);
            let key: RistrettoPoint = *RistrettoPublic::from(&decoy).as_ref();
            (key, commit(1, &Scalar::random(rng)))
        };
        matrix.set(0, col, &key.compress())?;
        matrix.set(1, col, &input.compress())?;
    }

    let mut pre_image = Zeroizing::new([0u8; 32]);
    rng.fill_bytes(&mut pre_image[..]);
    let mut seed = Zeroizing::new([0u8; 32]);
    rng.fill_bytes(&mut seed[..]);

    let mlsag = Mlsag::prepare(
        matrix,
        &blinds.residual_blind(),
        &blinds.output_commitments(),
        ring_size,
        N_ROWS,
    )?;
    let signature = mlsag.generate(real_index, onetime.private_key(), &pre_image, *seed)?;
    let matrix = mlsag.into_matrix();
    Mlsag::verify(
        &signature.challenge,
        ring_size,
        N_ROWS,
        &matrix,
        &signature.key_image,
        &pre_image,
        &signature.responses,
    )?;
    debug!(ring_size, "ring signature verified");

    blinds.realign_change();
    blinds.verify()?;

    rng.fill_bytes(&mut seed[..]);
    let change_commitment = blinds.commitment(BlindSlot::Change).compress();
    let range_proof = gen_proof(request.change, blinds.blind(BlindSlot::Change), *seed)?;
    if range_proof.commitment != change_commitment {
        return Err(TxBuildError::RangeProofFailure(
            "proof is not bound to the change commitment".into(),
        ));
    }
    verify_proof(&change_commitment, &range_proof.proof)?;

    let session_type = request.session_type;
    let fee_lock = request.now + FEE_LOCK_SECS;
    let change_lock = request.now + CHANGE_LOCK_SECS;
    let payment_amount = if session_type.has_public_payment() {
        request.payment
    } else {
        0
    };

    let fee = OutputPlan {
        to: &sender,
        slot: BlindSlot::Fee,
        public_amount: request.fee,
        memo: "",
        lock_time: fee_lock,
        script: lock_script(fee_lock),
        coin_type: session_type.fee_coin_type(),
    };
    let payment = OutputPlan {
        to: &recipient,
        slot: BlindSlot::Payment,
        public_amount: payment_amount,
        memo: request.memo,
        lock_time: 0,
        script: String::new(),
        coin_type: session_type.payment_coin_type(),
    };
    let change = OutputPlan {
        to: &sender,
        slot: BlindSlot::Change,
        public_amount: 0,
        memo: "",
        lock_time: change_lock,
        script: lock_script(change_lock),
        coin_type: crate::CoinType::Coin,
    };
    let vout = [fee, payment, change]
        .into_iter()
        .map(|plan| plan.build(&blinds, rng))
        .collect::<Result<Vec<_>, _>>()?;

    let mut tx = Transaction {
        id: request.session_id,
        version: TX_VERSION,
        mix: ring_size as u32,
        vin: vec![Vin {
            key_image: signature.key_image,
            ring_offsets: vec![0; ring_size],
        }],
        vout,
        bulletproof: vec![Bulletproof {
            proof: range_proof.proof,
        }],
        ring_signature: RingSignatureData {
            image: *pre_image,
            matrix,
            challenge: signature.challenge,
            responses: signature.responses,
        },
        txn_id: [0u8; 32],
    };
    tx.txn_id = tx.compute_txn_id()?;

    let size = tx.serialized_size()?;
    if size > MAX_TRANSACTION_SIZE {
        return Err(TxBuildError::TransactionOverflow(size));
    }
    debug!(size, txn_id = %tx.txn_id_hex(), "transaction assembled");
    Ok(tx)
}

struct OutputPlan<'a> {
    to: &'a PublicAddress,
    slot: BlindSlot,
    public_amount: u64,
    memo: &'a str,
    lock_time: i64,
    script: String,
    coin_type: crate::CoinType,
}

impl OutputPlan<'_> {
    fn build<R: CryptoRng + RngCore>(
        self,
        blinds: &AmountBlinds,
        rng: &mut R,
    ) -> Result<Vout, TxBuildError> {
        let (one_time_public, payment) = make_stealth_payment(self.to, rng);
        let note = Note {
            amount: blinds.value(self.slot),
            blind: *blinds.blind(self.slot),
            memo: self.memo.to_string(),
        };
        Ok(Vout {
            amount: self.public_amount,
            commitment: blinds.commitment(self.slot).compress().to_bytes(),
            ephemeral_key: payment.ephemeral_public.to_bytes(),
            lock_time: self.lock_time,
            note: encrypt_note(self.to.scan_public_key(), &note, rng)?,
            one_time_key: one_time_public.to_bytes(),
            script: self.script,
            coin_type: self.coin_type,
        })
    }
}
