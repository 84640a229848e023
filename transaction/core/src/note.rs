// Copyright (c) 2024 The Veil Foundation

//! Output notes: the amount, blind and memo of an output, readable only by
//! the holder of the recipient's scan key.
//!
//! Layout: `R(32) || nonce(12) || ChaCha20-Poly1305(key, nonce, note)` where
//! `R = r*G` is a fresh ephemeral key and `key = HKDF-SHA256(r*S)`.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use curve25519_dalek::scalar::Scalar;
use hkdf::Hkdf;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use veil_account_keys::{RistrettoPrivate, RistrettoPublic};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::TxBuildError;

const NOTE_KDF_SALT: &[u8] = b"veil-note-okm";
const EPHEMERAL_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;

/// The plaintext of an output note.
#[derive(Clone, Deserialize, Eq, PartialEq, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct Note {
    /// Committed amount
    pub amount: u64,
    /// Blind of the output commitment
    pub blind: Scalar,
    /// Free-form memo, empty for fee and change
    pub memo: String,
}

impl core::fmt::Debug for Note {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Note")
            .field("amount", &self.amount)
            .field("memo", &self.memo)
            .finish_non_exhaustive()
    }
}

fn note_key(shared_secret: &RistrettoPublic) -> Result<Zeroizing<[u8; 32]>, TxBuildError> {
    let kdf = Hkdf::<Sha256>::new(Some(NOTE_KDF_SALT), &shared_secret.to_bytes());
    let mut key = Zeroizing::new([0u8; 32]);
    kdf.expand(b"", &mut key[..])
        .map_err(|e| TxBuildError::Note(e.to_string()))?;
    Ok(key)
}

/// Encrypt `note` so that only the holder of `scan_public`'s private key can
/// open it.
pub fn encrypt_note<R: CryptoRng + RngCore>(
    scan_public: &RistrettoPublic,
    note: &Note,
    rng: &mut R,
) -> Result<Vec<u8>, TxBuildError> {
    let r = RistrettoPrivate::from_random(rng);
    let R = RistrettoPublic::from(&r);
    let shared = RistrettoPublic::from(r.as_ref() * scan_public.as_ref());
    let key = note_key(&shared)?;

    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);

    let plaintext = Zeroizing::new(bincode::serialize(note)?);
    let cipher = ChaCha20Poly1305::new_from_slice(&key[..])
        .map_err(|e| TxBuildError::Note(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
        .map_err(|e| TxBuildError::Note(e.to_string()))?;

    let mut out = Vec::with_capacity(EPHEMERAL_SIZE + NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&R.to_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a note with the recipient's scan private key.
pub fn open_note(scan_private: &RistrettoPrivate, encrypted: &[u8]) -> Result<Note, TxBuildError> {
    if encrypted.len() < EPHEMERAL_SIZE + NONCE_SIZE + TAG_SIZE {
        return Err(TxBuildError::Note(format!(
            "note is {} bytes, too short",
            encrypted.len()
        )));
    }
    let (R, rest) = encrypted.split_at(EPHEMERAL_SIZE);
    let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

    let R = RistrettoPublic::try_from(R).map_err(|e| TxBuildError::Note(e.to_string()))?;
    let shared = RistrettoPublic::from(scan_private.as_ref() * R.as_ref());
    let key = note_key(&shared)?;

    let cipher = ChaCha20Poly1305::new_from_slice(&key[..])
        .map_err(|e| TxBuildError::Note(e.to_string()))?;
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| TxBuildError::Note("decryption failed".to_string()))?,
    );

    Ok(bincode::deserialize(&plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    fn note(memo: &str) -> Note {
        Note {
            amount: 60,
            blind: Scalar::random(&mut OsRng),
            memo: memo.to_string(),
        }
    }

    #[test]
    fn test_note_opens_with_scan_key() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        let original = note("rent");
        let encrypted = encrypt_note(&(&scan).into(), &original, &mut OsRng).unwrap();

        let opened = open_note(&scan, &encrypted).unwrap();
        assert_eq!(opened, original);
    }

    #[test]
    fn test_note_rejects_other_key() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        let other = RistrettoPrivate::from_random(&mut OsRng);
        let encrypted = encrypt_note(&(&scan).into(), &note(""), &mut OsRng).unwrap();

        let result = open_note(&other, &encrypted);
        assert_eq!(
            result.unwrap_err(),
            TxBuildError::Note("decryption failed".into())
        );
    }

    #[test]
    fn test_note_rejects_tampering() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        let mut encrypted = encrypt_note(&(&scan).into(), &note("x"), &mut OsRng).unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x80;
        assert!(open_note(&scan, &encrypted).is_err());
        assert!(open_note(&scan, &encrypted[..40]).is_err());
    }

    #[test]
    fn test_notes_are_randomized() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        let original = note("same");
        let a = encrypt_note(&(&scan).into(), &original, &mut OsRng).unwrap();
        let b = encrypt_note(&(&scan).into(), &original, &mut OsRng).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_hides_blind() {
        let original = note("memo");
        let rendered = format!("{original:?}");
        assert!(!rendered.contains("blind"));
    }
}
