// Copyright (c) 2024 The Veil Foundation

use super::{hash_to_point, Error};
use core::{cmp::Ordering, fmt};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use serde::{Deserialize, Serialize};
use veil_account_keys::{RistrettoPrivate, RistrettoPublic};
use zeroize::Zeroize;

/// The "image" of a private key `x`: I = x * Hp(x * G) = x * Hp(P).
#[derive(Clone, Copy, Default, Deserialize, Eq, Hash, PartialEq, Serialize, Zeroize)]
pub struct KeyImage {
    /// The curve point corresponding to the key image
    pub point: CompressedRistretto,
}

impl KeyImage {
    /// View the underlying `CompressedRistretto` as an array of bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.point.as_bytes()
    }

    /// Decompress, failing on an invalid encoding.
    pub fn decompress(&self) -> Result<RistrettoPoint, Error> {
        self.point.decompress().ok_or(Error::InvalidCurvePoint)
    }
}

impl From<&RistrettoPrivate> for KeyImage {
    fn from(x: &RistrettoPrivate) -> Self {
        let P = RistrettoPublic::from(x);
        let Hp = hash_to_point(&P);
        let point = x.as_ref() * Hp;
        KeyImage {
            point: point.compress(),
        }
    }
}

impl TryFrom<[u8; 32]> for KeyImage {
    type Error = Error;
    fn try_from(src: [u8; 32]) -> Result<Self, Self::Error> {
        Self::try_from(&src[..])
    }
}

impl TryFrom<&[u8]> for KeyImage {
    type Error = Error;
    fn try_from(src: &[u8]) -> Result<Self, Error> {
        if src.len() != 32 {
            return Err(Error::LengthMismatch(src.len(), 32));
        }
        let point = CompressedRistretto::from_slice(src).map_err(|_e| Error::InvalidCurvePoint)?;
        Ok(Self { point })
    }
}

impl AsRef<[u8; 32]> for KeyImage {
    fn as_ref(&self) -> &[u8; 32] {
        self.as_bytes()
    }
}

impl Ord for KeyImage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl PartialOrd for KeyImage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for KeyImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyImage({})", hex::encode(self.as_bytes()))
    }
}

impl fmt::Display for KeyImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.as_bytes()))
    }
}
