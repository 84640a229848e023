// Copyright (c) 2024 The Veil Foundation

//! Stealth address strings.
//!
//! Mainnet: `veil://1/<base58(spend||scan||network_id||checksum)>`
//! Testnet: `tveil://1/<base58(spend||scan||network_id||checksum)>`
//!
//! The checksum is the first four bytes of a double SHA-256 over the
//! preceding 65 bytes.

use core::fmt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{KeyError, Result, RistrettoPublic};

/// Mainnet address prefix
pub const MAINNET_ADDRESS_PREFIX: &str = "veil://1/";

/// Testnet address prefix
pub const TESTNET_ADDRESS_PREFIX: &str = "tveil://1/";

const KEY_LEN: usize = 32;
const CHECKSUM_LEN: usize = 4;
const PAYLOAD_LEN: usize = 2 * KEY_LEN + 1 + CHECKSUM_LEN;

/// The network an address belongs to.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production network
    #[default]
    Mainnet,
    /// Test network
    Testnet,
}

impl Network {
    /// The byte embedded in the address payload.
    pub const fn id(&self) -> u8 {
        match self {
            Network::Mainnet => 0x56,
            Network::Testnet => 0x74,
        }
    }

    /// Inverse of [`Network::id`].
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x56 => Some(Network::Mainnet),
            0x74 => Some(Network::Testnet),
            _ => None,
        }
    }

    /// Address string prefix for this network.
    pub const fn address_prefix(&self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_ADDRESS_PREFIX,
            Network::Testnet => TESTNET_ADDRESS_PREFIX,
        }
    }

    /// Human-readable name.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Network::Mainnet => "Mainnet",
            Network::Testnet => "Testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A published (spend, scan) public key pair.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct PublicAddress {
    spend_public_key: RistrettoPublic,
    scan_public_key: RistrettoPublic,
}

impl PublicAddress {
    /// Build an address from its two public keys.
    pub fn new(spend_public_key: &RistrettoPublic, scan_public_key: &RistrettoPublic) -> Self {
        Self {
            spend_public_key: *spend_public_key,
            scan_public_key: *scan_public_key,
        }
    }

    /// The public spend key `B`.
    pub fn spend_public_key(&self) -> &RistrettoPublic {
        &self.spend_public_key
    }

    /// The public scan key `S`.
    pub fn scan_public_key(&self) -> &RistrettoPublic {
        &self.scan_public_key
    }

    /// Encode as an address string for `network`.
    pub fn to_address_string(&self, network: Network) -> String {
        let mut payload = Vec::with_capacity(PAYLOAD_LEN);
        payload.extend_from_slice(&self.spend_public_key.to_bytes());
        payload.extend_from_slice(&self.scan_public_key.to_bytes());
        payload.push(network.id());
        let checksum = checksum(&payload);
        payload.extend_from_slice(&checksum);

        format!(
            "{}{}",
            network.address_prefix(),
            bs58::encode(payload).into_string()
        )
    }

    /// Decode an address string, returning the keys and the network it
    /// names.
    pub fn parse(s: &str) -> Result<(Self, Network)> {
        let s = s.trim();

        // Testnet first: its prefix is the longer one.
        let (encoded, network) = if let Some(rest) = s.strip_prefix(TESTNET_ADDRESS_PREFIX) {
            (rest, Network::Testnet)
        } else if let Some(rest) = s.strip_prefix(MAINNET_ADDRESS_PREFIX) {
            (rest, Network::Mainnet)
        } else {
            return Err(KeyError::MalformedAddress(format!(
                "expected '{MAINNET_ADDRESS_PREFIX}' or '{TESTNET_ADDRESS_PREFIX}' prefix"
            )));
        };

        let payload = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| KeyError::MalformedAddress(format!("invalid base58: {e}")))?;
        if payload.len() != PAYLOAD_LEN {
            return Err(KeyError::MalformedAddress(format!(
                "expected {PAYLOAD_LEN} byte payload, found {}",
                payload.len()
            )));
        }

        let (body, expected) = payload.split_at(PAYLOAD_LEN - CHECKSUM_LEN);
        if checksum(body)[..] != *expected {
            return Err(KeyError::MalformedAddress("checksum mismatch".to_string()));
        }

        let id = body[2 * KEY_LEN];
        if Network::from_id(id) != Some(network) {
            return Err(KeyError::MalformedAddress(format!(
                "network byte {id:#04x} does not match {network} prefix"
            )));
        }

        let spend = RistrettoPublic::try_from(&body[..KEY_LEN])
            .map_err(|e| KeyError::MalformedAddress(format!("spend key: {e}")))?;
        let scan = RistrettoPublic::try_from(&body[KEY_LEN..2 * KEY_LEN])
            .map_err(|e| KeyError::MalformedAddress(format!("scan key: {e}")))?;

        Ok((Self::new(&spend, &scan), network))
    }

    /// Decode an address string that must belong to `expected`.
    pub fn parse_for_network(s: &str, expected: Network) -> Result<Self> {
        let (address, network) = Self::parse(s)?;
        if network != expected {
            return Err(KeyError::MalformedAddress(format!(
                "address is for {network} but expected {expected}"
            )));
        }
        Ok(address)
    }
}

fn checksum(body: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(Sha256::digest(body));
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RistrettoPrivate;
    use rand_core::OsRng;

    fn random_address() -> PublicAddress {
        let spend = RistrettoPrivate::from_random(&mut OsRng);
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        PublicAddress::new(&(&spend).into(), &(&scan).into())
    }

    #[test]
    fn test_network_prefixes() {
        let address = random_address();
        let mainnet = address.to_address_string(Network::Mainnet);
        let testnet = address.to_address_string(Network::Testnet);
        assert!(mainnet.starts_with("veil://1/"));
        assert!(testnet.starts_with("tveil://1/"));
    }

    #[test]
    fn test_parse_roundtrip() {
        let address = random_address();
        for network in [Network::Mainnet, Network::Testnet] {
            let encoded = address.to_address_string(network);
            let (decoded, decoded_network) = PublicAddress::parse(&encoded).unwrap();
            assert_eq!(decoded, address);
            assert_eq!(decoded_network, network);
        }
    }

    #[test]
    fn test_wrong_network_rejected() {
        let encoded = random_address().to_address_string(Network::Testnet);
        let result = PublicAddress::parse_for_network(&encoded, Network::Mainnet);
        assert!(matches!(result, Err(KeyError::MalformedAddress(_))));
    }

    #[test]
    fn test_network_byte_must_match_prefix() {
        let encoded = random_address().to_address_string(Network::Testnet);
        let swapped = encoded.replacen(TESTNET_ADDRESS_PREFIX, MAINNET_ADDRESS_PREFIX, 1);
        assert!(PublicAddress::parse(&swapped).is_err());
    }

    #[test]
    fn test_corrupted_checksum_rejected() {
        let address = random_address();
        let encoded = address.to_address_string(Network::Mainnet);
        let payload = &encoded[MAINNET_ADDRESS_PREFIX.len()..];
        let mut bytes = bs58::decode(payload).into_vec().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let corrupted = format!(
            "{MAINNET_ADDRESS_PREFIX}{}",
            bs58::encode(bytes).into_string()
        );

        let err = PublicAddress::parse(&corrupted).unwrap_err();
        assert_eq!(err, KeyError::MalformedAddress("checksum mismatch".into()));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(PublicAddress::parse("").is_err());
        assert!(PublicAddress::parse("veil://1/").is_err());
        assert!(PublicAddress::parse("veil://1/0OIl").is_err());
        assert!(PublicAddress::parse("bitcoin:1abc").is_err());
    }
}
