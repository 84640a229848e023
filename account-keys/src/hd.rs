// Copyright (c) 2024 The Veil Foundation

//! Hierarchical-deterministic key derivation over Ristretto.
//!
//! Derivation follows the shape of BIP-32: an extended key is a secret scalar
//! plus a 32-byte chain code, and a child is produced from
//! `HMAC-SHA512(chain_code, data || index)`. Hardened children hash the
//! parent secret, normal children hash the parent public key. The left half
//! of the HMAC output is added to the parent scalar modulo the group order,
//! the right half becomes the child chain code.
//!
//! Paths use the grammar `m/44'/847177'/account'/change/index`.

use core::{fmt, str::FromStr};
use curve25519_dalek::scalar::Scalar;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{
    domain_separators::MASTER_SEED_HMAC_KEY, Network, PublicAddress, RistrettoPrivate,
    RistrettoPublic, SecretBuffer,
};
use crate::{KeyError, Result};

type HmacSha512 = Hmac<Sha512>;

/// Hardened key offset
pub const HARDENED: u32 = 0x8000_0000;

/// BIP-44 purpose component
pub const PURPOSE: u32 = 44;

/// Registered coin type component
pub const COIN_TYPE: u32 = 847177;

/// Path of the first key set created with a wallet.
pub const ROOT_KEY_PATH: &str = "m/44'/847177'/0'/0/0";

/// Fixed sub-path of the spend key used when unlocking a wallet.
pub const SPEND_KEY_PATH: &str = "m/44'/847177'/0'/0/0";

/// Fixed sub-path of the scan key used when unlocking a wallet.
pub const SCAN_KEY_PATH: &str = "m/44'/847177'/0'/0/1";

const KEY_SIZE: usize = 32;

/// A parsed derivation path such as `m/44'/847177'/0'/0/0`.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    /// The standard path for the first address of `account`.
    pub fn for_account(account: u32) -> Self {
        Self(vec![
            PURPOSE | HARDENED,
            COIN_TYPE | HARDENED,
            account | HARDENED,
            0,
            0,
        ])
    }

    /// Raw components, hardened ones carrying the `HARDENED` bit.
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// The unhardened account component, if the path is long enough.
    pub fn account(&self) -> Option<u32> {
        self.0.get(2).map(|c| c & !HARDENED)
    }

    /// The same path with its terminal index incremented by one.
    pub fn increment(&self) -> Result<Self> {
        let mut components = self.0.clone();
        let last = components
            .last_mut()
            .ok_or_else(|| KeyError::InvalidKeyMaterial("cannot increment empty path".into()))?;
        let hardened = *last & HARDENED;
        let next = (*last & !HARDENED)
            .checked_add(1)
            .filter(|n| n & HARDENED == 0)
            .ok_or_else(|| KeyError::InvalidKeyMaterial("path index overflow".into()))?;
        *last = next | hardened;
        Ok(Self(components))
    }
}

impl FromStr for DerivationPath {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('/');
        if parts.next() != Some("m") {
            return Err(KeyError::InvalidKeyMaterial(format!(
                "derivation path must start with 'm': {s}"
            )));
        }

        let mut components = Vec::new();
        for part in parts {
            let (digits, hardened) = match part.strip_suffix('\'') {
                Some(digits) => (digits, true),
                None => (part, false),
            };
            let index: u32 = digits.parse().map_err(|_| {
                KeyError::InvalidKeyMaterial(format!("invalid path component '{part}'"))
            })?;
            if index & HARDENED != 0 {
                return Err(KeyError::InvalidKeyMaterial(format!(
                    "path component out of range: {index}"
                )));
            }
            components.push(if hardened { index | HARDENED } else { index });
        }

        Ok(Self(components))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for component in &self.0 {
            if component & HARDENED != 0 {
                write!(f, "/{}'", component & !HARDENED)?;
            } else {
                write!(f, "/{component}")?;
            }
        }
        Ok(())
    }
}

/// A private key together with its chain code.
#[derive(Clone)]
pub struct ExtendedKey {
    private_key: RistrettoPrivate,
    chain_code: Zeroizing<[u8; KEY_SIZE]>,
}

impl ExtendedKey {
    /// Master key from a BIP-39 seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        if seed.is_empty() {
            return Err(KeyError::InvalidKeyMaterial("empty seed".into()));
        }
        let mut mac = HmacSha512::new_from_slice(MASTER_SEED_HMAC_KEY)
            .map_err(|_| KeyError::InvalidKeyMaterial("hmac key".into()))?;
        mac.update(seed);
        let mut result = Zeroizing::new([0u8; 64]);
        result.copy_from_slice(&mac.finalize().into_bytes());

        Self::from_parts(&result[..KEY_SIZE], &result[KEY_SIZE..])
    }

    /// Rebuild an extended key from stored secret and chain code bytes.
    ///
    /// Both inputs must be between 1 and 32 bytes long; shorter inputs are
    /// zero-extended.
    pub fn from_parts(secret: &[u8], chain_code: &[u8]) -> Result<Self> {
        check_key_material("secret", secret)?;
        check_key_material("chain code", chain_code)?;

        let mut secret_bytes = Zeroizing::new([0u8; KEY_SIZE]);
        secret_bytes[..secret.len()].copy_from_slice(secret);
        let scalar = Scalar::from_bytes_mod_order(*secret_bytes);
        if scalar == Scalar::ZERO {
            return Err(KeyError::InvalidKeyMaterial("secret reduces to zero".into()));
        }

        let mut chain = Zeroizing::new([0u8; KEY_SIZE]);
        chain[..chain_code.len()].copy_from_slice(chain_code);

        Ok(Self {
            private_key: RistrettoPrivate::from(scalar),
            chain_code: chain,
        })
    }

    /// Derive the child at `index`. Indices with the `HARDENED` bit set use
    /// hardened derivation.
    pub fn derive_child(&self, index: u32) -> Result<Self> {
        let mut mac = HmacSha512::new_from_slice(&self.chain_code[..])
            .map_err(|_| KeyError::InvalidKeyMaterial("hmac key".into()))?;

        if index & HARDENED != 0 {
            let secret = Zeroizing::new(self.private_key.to_bytes());
            mac.update(&[0x00]);
            mac.update(&secret[..]);
        } else {
            mac.update(&self.public_key().to_bytes());
        }
        mac.update(&index.to_be_bytes());

        let mut result = Zeroizing::new([0u8; 64]);
        result.copy_from_slice(&mac.finalize().into_bytes());
        let mut tweak_bytes = Zeroizing::new([0u8; KEY_SIZE]);
        tweak_bytes.copy_from_slice(&result[..KEY_SIZE]);
        let mut tweak = Scalar::from_bytes_mod_order(*tweak_bytes);

        let child = self.private_key.as_ref() + tweak;
        tweak.zeroize();
        if child == Scalar::ZERO {
            return Err(KeyError::InvalidKeyMaterial(format!(
                "child key at index {index} is zero"
            )));
        }

        let mut chain_code = Zeroizing::new([0u8; KEY_SIZE]);
        chain_code.copy_from_slice(&result[KEY_SIZE..]);

        Ok(Self {
            private_key: RistrettoPrivate::from(child),
            chain_code,
        })
    }

    /// Derive the descendant at `path`, starting from this key as `m`.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self> {
        path.components()
            .iter()
            .try_fold(self.clone(), |key, index| key.derive_child(*index))
    }

    /// The private key.
    pub fn private_key(&self) -> &RistrettoPrivate {
        &self.private_key
    }

    /// The public key `x*G`.
    pub fn public_key(&self) -> RistrettoPublic {
        RistrettoPublic::from(&self.private_key)
    }

    /// The chain code.
    pub fn chain_code(&self) -> &[u8; KEY_SIZE] {
        &self.chain_code
    }
}

fn check_key_material(what: &str, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(KeyError::InvalidKeyMaterial(format!("{what} is empty")));
    }
    if bytes.len() > KEY_SIZE {
        return Err(KeyError::InvalidKeyMaterial(format!(
            "{what} is {} bytes, at most {KEY_SIZE} allowed",
            bytes.len()
        )));
    }
    Ok(())
}

/// Root key material and the stealth address derived from it.
///
/// `root_key` and `chain_code` are hex encoded and only ever live in the
/// encrypted wallet store; the strings are zeroed when the value is dropped.
#[derive(Clone, Deserialize, Eq, PartialEq, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct KeySet {
    /// Hex of the 32-byte chain code of the master key.
    pub chain_code: String,
    /// Path of the scan key of this set, e.g. `m/44'/847177'/0'/0/1`.
    pub key_path: String,
    /// Hex of the 32-byte master private key.
    pub root_key: String,
    /// Stealth address string for the (spend, scan) pair of this set.
    pub stealth_address: String,
}

impl KeySet {
    /// Decode the root key and chain code into secret buffers.
    pub fn root_material(&self) -> Result<(SecretBuffer, SecretBuffer)> {
        Ok((
            SecretBuffer::from_hex(&self.root_key)?,
            SecretBuffer::from_hex(&self.chain_code)?,
        ))
    }

    /// The parsed `key_path`.
    pub fn derivation_path(&self) -> Result<DerivationPath> {
        self.key_path.parse()
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet")
            .field("key_path", &self.key_path)
            .field("stealth_address", &self.stealth_address)
            .finish_non_exhaustive()
    }
}

/// Derive a key set at `path` from master `secret` and `chain_code`.
///
/// The spend key is derived at `path` and the scan key at the path with its
/// terminal index incremented; the returned set records the scan path.
pub fn derive_key_set(
    path: &DerivationPath,
    secret: &[u8],
    chain_code: &[u8],
    network: Network,
) -> Result<KeySet> {
    let master = ExtendedKey::from_parts(secret, chain_code)?;
    let spend = master.derive_path(path)?;
    let scan_path = path.increment()?;
    let scan = master.derive_path(&scan_path)?;

    let address = PublicAddress::new(&spend.public_key(), &scan.public_key());

    Ok(KeySet {
        chain_code: hex::encode(master.chain_code()),
        key_path: scan_path.to_string(),
        root_key: hex::encode(&Zeroizing::new(master.private_key().to_bytes())[..]),
        stealth_address: address.to_address_string(network),
    })
}

/// The first key set of a wallet, derived from a BIP-39 seed.
pub fn root_key_set(seed: &[u8], network: Network) -> Result<KeySet> {
    let master = ExtendedKey::from_seed(seed)?;
    let secret = Zeroizing::new(master.private_key().to_bytes());
    let path: DerivationPath = ROOT_KEY_PATH.parse()?;
    derive_key_set(&path, &secret[..], master.chain_code(), network)
}

/// The key set for the account after the one `last` belongs to.
pub fn add_key_set(last: &KeySet, network: Network) -> Result<KeySet> {
    let account = last
        .derivation_path()?
        .account()
        .ok_or_else(|| KeyError::InvalidKeyMaterial("key path has no account".into()))?;
    let next = account
        .checked_add(1)
        .filter(|n| n & HARDENED == 0)
        .ok_or_else(|| KeyError::InvalidKeyMaterial("account index overflow".into()))?;

    let (secret, chain_code) = last.root_material()?;
    derive_key_set(
        &DerivationPath::for_account(next),
        secret.expose(),
        chain_code.expose(),
        network,
    )
}

/// Re-derive the (spend, scan) private keys of a key set from its root.
pub fn unlock(key_set: &KeySet) -> Result<(RistrettoPrivate, RistrettoPrivate)> {
    let (secret, chain_code) = key_set.root_material()?;
    let master = ExtendedKey::from_parts(secret.expose(), chain_code.expose())?;

    let spend = master.derive_path(&SPEND_KEY_PATH.parse()?)?;
    let scan = master.derive_path(&SCAN_KEY_PATH.parse()?)?;

    Ok((spend.private_key().clone(), scan.private_key().clone()))
}
