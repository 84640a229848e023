// Copyright (c) 2024 The Veil Foundation

use core::fmt;
use serde::{Deserialize, Serialize};

/// What an output pays for.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[repr(u8)]
pub enum CoinType {
    /// Internal system output
    System = 0x00,
    /// Ordinary payment or change
    #[default]
    Coin = 0x01,
    /// Block reward
    Coinbase = 0x02,
    /// Stake deposit
    Coinstake = 0x03,
    /// Transaction fee
    Fee = 0x04,
    /// Genesis allocation
    Genesis = 0x05,
    /// Payment
    Payment = 0x06,
    /// Change
    Change = 0x07,
    /// Time-based reward
    Timebase = 0x08,
    /// Burnt value
    Burn = 0x09,
    /// Newly minted value
    Mint = 0x0A,
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The kind of spend a session is building.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SessionType {
    /// Ordinary payment
    #[default]
    Coin = 0x00,
    /// Stake deposit; the payment amount is public
    Coinstake = 0x01,
    /// Burn
    Burn = 0x02,
    /// Mint
    Mint = 0x03,
}

impl SessionType {
    /// Coin type of the fee output for this kind of spend.
    pub fn fee_coin_type(&self) -> CoinType {
        match self {
            SessionType::Coin => CoinType::Fee,
            _ => CoinType::Coinbase,
        }
    }

    /// Coin type of the payment output for this kind of spend.
    pub fn payment_coin_type(&self) -> CoinType {
        match self {
            SessionType::Coinstake => CoinType::Coinstake,
            _ => CoinType::Coin,
        }
    }

    /// Whether the payment amount is written in the clear.
    pub fn has_public_payment(&self) -> bool {
        matches!(self, SessionType::Coinstake)
    }
}
