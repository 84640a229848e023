//! Local bookkeeping records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veil_transaction_core::Vout;

/// What a wallet record describes.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum WalletType {
    /// A spend prepared by this wallet; holds the change output
    Send,
    /// An output received from the network
    #[default]
    Receive,
    /// An output recovered from a backup
    Restore,
    /// Burnt value
    Burn,
}

/// A wallet-local record of an output received or a spend made.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WalletTransaction {
    /// Record id
    pub id: Uuid,
    /// Our stealth address the record belongs to
    pub address: String,
    /// The output this record holds
    pub vout: Vout,
    pub payment: u64,
    pub fee: u64,
    pub change: u64,
    /// Value held before the spend; for receives, the amount received
    pub balance: u64,
    /// Whether the held output has been spent
    pub spent: bool,
    pub wallet_type: WalletType,
    pub date_time: DateTime<Utc>,
    /// Hex transaction or payment id
    pub tx_id: String,
    pub memo: String,
}

impl WalletTransaction {
    /// Whether this record holds an output that can still be spent.
    pub fn is_spendable(&self) -> bool {
        !self.spent
            && match self.wallet_type {
                WalletType::Receive | WalletType::Restore => true,
                WalletType::Send => self.change > 0,
                WalletType::Burn => false,
            }
    }

    /// Value that left the wallet through this record.
    pub fn money_out(&self) -> u64 {
        match self.wallet_type {
            WalletType::Send | WalletType::Burn => self.balance.saturating_sub(self.change),
            WalletType::Receive | WalletType::Restore => 0,
        }
    }
}
