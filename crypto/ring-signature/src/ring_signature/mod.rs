// Copyright (c) 2024 The Veil Foundation

//! Linkable ring signatures over a two-row key/commitment matrix.

mod error;
mod key_image;
mod matrix;
mod mlsag;

pub use bulletproofs_og::PedersenGens;
pub use curve25519_dalek::scalar::Scalar;
pub use error::{Error, RingStage};
pub use key_image::KeyImage;
pub use matrix::{RingMatrix, N_ROWS};
pub use mlsag::{Mlsag, MlsagSignature};

use blake2::{Blake2b512, Digest};
use curve25519_dalek::{constants::RISTRETTO_BASEPOINT_POINT, ristretto::RistrettoPoint};
use veil_account_keys::RistrettoPublic;

use crate::domain_separators::{HASH_TO_POINT_DOMAIN_TAG, VALUE_GENERATOR_DOMAIN_TAG};

/// The blinding generator `G`, the Ristretto basepoint.
pub const B_BLINDING: RistrettoPoint = RISTRETTO_BASEPOINT_POINT;

/// Pedersen generators: `B` is the value generator `H`, `B_blinding` is `G`.
pub fn generators() -> PedersenGens {
    PedersenGens {
        B: RistrettoPoint::hash_from_bytes::<Blake2b512>(VALUE_GENERATOR_DOMAIN_TAG),
        B_blinding: B_BLINDING,
    }
}

/// `Hp(P)`: hash a public key onto the curve.
pub fn hash_to_point(public_key: &RistrettoPublic) -> RistrettoPoint {
    let mut hasher = Blake2b512::new();
    hasher.update(HASH_TO_POINT_DOMAIN_TAG);
    hasher.update(public_key.to_bytes());
    RistrettoPoint::from_hash(hasher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_account_keys::RistrettoPrivate;

    #[test]
    fn test_generators_are_independent() {
        let gens = generators();
        assert_ne!(gens.B, gens.B_blinding);
        assert_eq!(gens.B, generators().B);
    }

    #[test]
    fn test_hash_to_point_is_deterministic() {
        let key = RistrettoPublic::from(&RistrettoPrivate::from_random(&mut rand_core::OsRng));
        assert_eq!(hash_to_point(&key), hash_to_point(&key));
        assert_ne!(hash_to_point(&key), *key.as_ref());
    }
}
