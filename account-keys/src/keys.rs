// Copyright (c) 2024 The Veil Foundation

//! Ristretto private and public key wrappers.

use core::fmt;
use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::KeyError;

/// A Ristretto private key. Zeroed when dropped and never `Copy`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RistrettoPrivate(Scalar);

impl RistrettoPrivate {
    /// Sample a uniformly random private key.
    pub fn from_random<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        Self(Scalar::random(rng))
    }

    /// The canonical little-endian encoding of the scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl From<Scalar> for RistrettoPrivate {
    fn from(scalar: Scalar) -> Self {
        Self(scalar)
    }
}

impl AsRef<Scalar> for RistrettoPrivate {
    fn as_ref(&self) -> &Scalar {
        &self.0
    }
}

impl TryFrom<&[u8; 32]> for RistrettoPrivate {
    type Error = KeyError;

    fn try_from(src: &[u8; 32]) -> Result<Self, KeyError> {
        Option::<Scalar>::from(Scalar::from_canonical_bytes(*src))
            .map(Self)
            .ok_or_else(|| KeyError::InvalidKeyMaterial("non-canonical scalar".to_string()))
    }
}

impl fmt::Debug for RistrettoPrivate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RistrettoPrivate(<redacted>)")
    }
}

/// A Ristretto public key.
#[derive(Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RistrettoPublic(RistrettoPoint);

impl RistrettoPublic {
    /// Compressed 32-byte encoding.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }

    /// Compressed form of the point.
    pub fn compress(&self) -> CompressedRistretto {
        self.0.compress()
    }
}

impl From<&RistrettoPrivate> for RistrettoPublic {
    fn from(private: &RistrettoPrivate) -> Self {
        Self(RistrettoPoint::mul_base(private.as_ref()))
    }
}

impl From<RistrettoPoint> for RistrettoPublic {
    fn from(point: RistrettoPoint) -> Self {
        Self(point)
    }
}

impl AsRef<RistrettoPoint> for RistrettoPublic {
    fn as_ref(&self) -> &RistrettoPoint {
        &self.0
    }
}

impl TryFrom<&[u8]> for RistrettoPublic {
    type Error = KeyError;

    fn try_from(src: &[u8]) -> Result<Self, KeyError> {
        let compressed = CompressedRistretto::from_slice(src).map_err(|_| {
            KeyError::InvalidKeyMaterial(format!("expected 32 bytes, found {}", src.len()))
        })?;
        compressed
            .decompress()
            .map(Self)
            .ok_or_else(|| KeyError::InvalidKeyMaterial("invalid curve point".to_string()))
    }
}

impl TryFrom<&[u8; 32]> for RistrettoPublic {
    type Error = KeyError;

    fn try_from(src: &[u8; 32]) -> Result<Self, KeyError> {
        Self::try_from(&src[..])
    }
}

impl core::hash::Hash for RistrettoPublic {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state)
    }
}

impl fmt::Debug for RistrettoPublic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RistrettoPublic({})", hex::encode(self.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn test_public_from_private_is_deterministic() {
        let private = RistrettoPrivate::from_random(&mut OsRng);
        assert_eq!(
            RistrettoPublic::from(&private),
            RistrettoPublic::from(&private)
        );
    }

    #[test]
    fn test_public_bytes_roundtrip() {
        let private = RistrettoPrivate::from_random(&mut OsRng);
        let public = RistrettoPublic::from(&private);
        let recovered = RistrettoPublic::try_from(&public.to_bytes()).unwrap();
        assert_eq!(public, recovered);
    }

    #[test]
    fn test_public_rejects_wrong_length() {
        let result = RistrettoPublic::try_from(&[1u8; 16][..]);
        assert!(matches!(result, Err(KeyError::InvalidKeyMaterial(_))));
    }

    #[test]
    fn test_private_rejects_non_canonical() {
        let result = RistrettoPrivate::try_from(&[0xffu8; 32]);
        assert!(result.is_err());
    }

    #[test]
    fn test_private_debug_is_redacted() {
        let private = RistrettoPrivate::from_random(&mut OsRng);
        let rendered = format!("{private:?}");
        assert!(!rendered.contains(&hex::encode(private.to_bytes())));
    }
}
