// Copyright (c) 2024 The Veil Foundation

//! Errors which can occur while deriving keys or decoding addresses

use displaydoc::Display;

/// A `Result` specialized to [`KeyError`].
pub type Result<T> = core::result::Result<T, KeyError>;

/// An error related to key material or address strings
#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
pub enum KeyError {
    /// Invalid key material: {0}
    InvalidKeyMaterial(String),

    /// Malformed address: {0}
    MalformedAddress(String),
}

impl std::error::Error for KeyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KeyError::InvalidKeyMaterial("secret exceeds 32 bytes".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid key material: secret exceeds 32 bytes"
        );

        let err = KeyError::MalformedAddress("bad checksum".to_string());
        assert_eq!(err.to_string(), "Malformed address: bad checksum");
    }
}
