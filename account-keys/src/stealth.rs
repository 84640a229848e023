// Copyright (c) 2024 The Veil Foundation

//! Dual-key stealth payments.
//!
//! A sender holding the recipient's public spend key `B` and scan key `S`
//! picks an ephemeral `r` and publishes `R = r*G` together with the one-time
//! key
//!
//! ```text
//! P = Hs(r*S)*G + B
//! ```
//!
//! The recipient, holding `b` and `s`, recognizes the output because
//! `Hs(s*R)*G + B == P`, and can spend it with `x = Hs(s*R) + b`.

#![allow(non_snake_case)]

use blake2::{Blake2b512, Digest};
use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand_core::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::{
    domain_separators::STEALTH_SHARED_SECRET_DOMAIN_TAG, Network, PublicAddress, Result,
    RistrettoPrivate, RistrettoPublic,
};

/// Data a sender embeds in an output so the recipient can find it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StealthPayment {
    /// `R = r*G`
    pub ephemeral_public: RistrettoPublic,
    /// `P = Hs(r*S)*G + B`
    pub one_time_public: RistrettoPublic,
}

/// The recipient's view of an owned one-time output.
#[derive(Clone, Debug)]
pub struct OneTimeKeyPair {
    private_key: RistrettoPrivate,
    public_key: RistrettoPublic,
}

impl OneTimeKeyPair {
    /// The one-time private key `x`.
    pub fn private_key(&self) -> &RistrettoPrivate {
        &self.private_key
    }

    /// The one-time public key `P = x*G`.
    pub fn public_key(&self) -> &RistrettoPublic {
        &self.public_key
    }

    /// Constant-time check that `embedded` is this pair's public key.
    pub fn matches(&self, embedded: &[u8; 32]) -> bool {
        self.public_key.to_bytes()[..].ct_eq(&embedded[..]).into()
    }
}

/// `Hs(tag || compressed(point))`
fn shared_secret_scalar(point: &RistrettoPoint) -> Scalar {
    let mut hasher = Blake2b512::new();
    hasher.update(STEALTH_SHARED_SECRET_DOMAIN_TAG);
    hasher.update(point.compress().as_bytes());
    Scalar::from_hash(hasher)
}

/// Create a one-time destination for `address`.
///
/// Returns the one-time public key and the payment data to embed in the
/// output.
pub fn make_stealth_payment<R: CryptoRng + RngCore>(
    address: &PublicAddress,
    rng: &mut R,
) -> (RistrettoPublic, StealthPayment) {
    let r = RistrettoPrivate::from_random(rng);
    let R = RistrettoPublic::from(&r);

    let rS = r.as_ref() * address.scan_public_key().as_ref();
    let mut hs = shared_secret_scalar(&rS);
    let P = RistrettoPoint::mul_base(&hs) + address.spend_public_key().as_ref();
    hs.zeroize();

    let one_time_public = RistrettoPublic::from(P);
    (
        one_time_public,
        StealthPayment {
            ephemeral_public: R,
            one_time_public,
        },
    )
}

/// [`make_stealth_payment`] for an encoded address string.
pub fn make_stealth_payment_to<R: CryptoRng + RngCore>(
    address: &str,
    rng: &mut R,
) -> Result<(RistrettoPublic, StealthPayment, Network)> {
    let (address, network) = PublicAddress::parse(address)?;
    let (one_time_public, payment) = make_stealth_payment(&address, rng);
    Ok((one_time_public, payment, network))
}

/// Recover the one-time key pair for an output carrying `ephemeral_public`.
///
/// The result only corresponds to a real output if
/// [`OneTimeKeyPair::matches`] accepts the output's embedded key.
pub fn uncover_spend_key(
    spend_private: &RistrettoPrivate,
    scan_private: &RistrettoPrivate,
    ephemeral_public: &RistrettoPublic,
) -> OneTimeKeyPair {
    let sR = scan_private.as_ref() * ephemeral_public.as_ref();
    let mut hs = shared_secret_scalar(&sR);
    let x = hs + spend_private.as_ref();
    hs.zeroize();

    let private_key = RistrettoPrivate::from(x);
    let public_key = RistrettoPublic::from(&private_key);
    OneTimeKeyPair {
        private_key,
        public_key,
    }
}

/// The public scan key encoded in an address string.
pub fn get_scan_public_key(address: &str) -> Result<RistrettoPublic> {
    let (address, _) = PublicAddress::parse(address)?;
    Ok(*address.scan_public_key())
}
