// Copyright (c) 2024 The Veil Foundation

//! A scoped container for secret bytes.

use core::fmt;
use zeroize::Zeroize;

use crate::{
    secmem::{LockResult, LockedRegion},
    KeyError,
};

/// Heap-allocated secret bytes, locked in memory while alive and zeroed on
/// drop.
///
/// The type is deliberately neither `Clone` nor `Copy`: a secret has exactly
/// one owner, and it is scrubbed on every exit path when that owner goes out
/// of scope. Use [`SecretBuffer::expose`] for the narrowest possible borrow.
pub struct SecretBuffer {
    bytes: Box<[u8]>,
    lock: Option<LockedRegion>,
}

impl SecretBuffer {
    /// Copy `src` into a new locked buffer.
    pub fn from_slice(src: &[u8]) -> Self {
        let bytes: Box<[u8]> = src.into();
        // SAFETY: the boxed slice is never reallocated and `Drop` releases the
        // lock before the allocation is freed.
        let lock = Some(unsafe_lock(&bytes));
        Self { bytes, lock }
    }

    /// Take ownership of a 32-byte array, zeroing the caller's copy.
    pub fn from_array(mut src: [u8; 32]) -> Self {
        let buffer = Self::from_slice(&src);
        src.zeroize();
        buffer
    }

    /// Wrap a UTF-8 secret such as a passphrase.
    pub fn from_text(src: &str) -> Self {
        Self::from_slice(src.as_bytes())
    }

    /// Decode a hex string into a secret buffer.
    pub fn from_hex(src: &str) -> Result<Self, KeyError> {
        let mut decoded = hex::decode(src)
            .map_err(|e| KeyError::InvalidKeyMaterial(format!("invalid hex: {e}")))?;
        let buffer = Self::from_slice(&decoded);
        decoded.zeroize();
        Ok(buffer)
    }

    /// Borrow the secret bytes.
    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    /// Borrow the secret as UTF-8, e.g. a passphrase.
    pub fn expose_str(&self) -> Result<&str, KeyError> {
        core::str::from_utf8(&self.bytes)
            .map_err(|_| KeyError::InvalidKeyMaterial("secret is not valid UTF-8".to_string()))
    }

    /// Number of secret bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the backing pages could be pinned in memory.
    pub fn lock_result(&self) -> LockResult {
        self.lock
            .as_ref()
            .map(LockedRegion::result)
            .unwrap_or(LockResult::Unsupported)
    }

    /// Make an independent copy. This is explicit so that every duplicate of
    /// a secret is visible at the call site.
    pub fn duplicate(&self) -> Self {
        Self::from_slice(&self.bytes)
    }
}

#[allow(unsafe_code)]
fn unsafe_lock(bytes: &[u8]) -> LockedRegion {
    // SAFETY: see `SecretBuffer::from_slice`.
    unsafe { LockedRegion::new(bytes) }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        self.bytes.zeroize();
        self.lock.take();
    }
}

impl PartialEq for SecretBuffer {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.bytes.len() == other.bytes.len() && bool::from(self.bytes.ct_eq(&other.bytes))
    }
}

impl Eq for SecretBuffer {}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBuffer([REDACTED; {}])", self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expose_returns_contents() {
        let secret = SecretBuffer::from_slice(b"hunter2");
        assert_eq!(secret.expose(), b"hunter2");
        assert_eq!(secret.expose_str().unwrap(), "hunter2");
        assert_eq!(secret.len(), 7);
    }

    #[test]
    fn test_debug_does_not_leak() {
        let secret = SecretBuffer::from_text("correct horse battery staple");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("horse"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_from_hex() {
        let secret = SecretBuffer::from_hex("00ff10").unwrap();
        assert_eq!(secret.expose(), &[0x00, 0xff, 0x10]);
        assert!(SecretBuffer::from_hex("zz").is_err());
    }

    #[test]
    fn test_duplicate_is_equal() {
        let secret = SecretBuffer::from_array([9u8; 32]);
        let copy = secret.duplicate();
        assert_eq!(secret, copy);
        assert_ne!(secret, SecretBuffer::from_array([8u8; 32]));
    }

    #[test]
    fn test_empty_buffer() {
        let secret = SecretBuffer::from_slice(&[]);
        assert!(secret.is_empty());
        assert_eq!(secret.lock_result(), LockResult::Locked);
    }
}
