//! Balance reconstruction and change selection over wallet records.
//!
//! Amounts are never stored in the clear for received outputs: every
//! function here opens the record notes with the scan key.

use chrono::{DateTime, Utc};
use tracing::debug;
use veil_account_keys::RistrettoPrivate;
use veil_transaction_core::open_note;

use crate::error::{Result, WalletError};
use crate::records::{WalletTransaction, WalletType};

/// Default fee rate, in base units per serialized byte.
pub const DEFAULT_FEE_PER_BYTE: u64 = 12;

/// Amount held by a record's output, read from its note.
pub fn held_amount(record: &WalletTransaction, scan: &RistrettoPrivate) -> Result<u64> {
    Ok(open_note(scan, &record.vout.note)?.amount)
}

/// Net spendable value: received amounts minus `balance - change` of every
/// send. Zero when nothing has been received.
pub fn balance(records: &[WalletTransaction], scan: &RistrettoPrivate) -> Result<u64> {
    let mut received = 0u64;
    let mut sent = 0u64;
    for record in records {
        match record.wallet_type {
            WalletType::Receive | WalletType::Restore => {
                received = received.saturating_add(held_amount(record, scan)?);
            }
            WalletType::Send | WalletType::Burn => {
                sent = sent.saturating_add(record.money_out());
            }
        }
    }
    Ok(received.saturating_sub(sent))
}

/// Pick the first unspent, unlocked output-holding record that covers
/// `amount + fee` on its own, and describe spending it as a new send record.
///
/// The returned record has a fresh id, our address and no memo; the caller
/// fills in the session details.
pub fn sort_change(
    records: &[WalletTransaction],
    scan: &RistrettoPrivate,
    amount: u64,
    fee: u64,
) -> Result<WalletTransaction> {
    let requested = amount
        .checked_add(fee)
        .ok_or_else(|| WalletError::InvalidRequest("amount plus fee overflows".into()))?;
    let available = balance(records, scan)?;
    if available < requested {
        return Err(WalletError::InsufficientFunds {
            requested,
            available,
        });
    }

    let now = Utc::now();
    for record in records.iter().filter(|r| r.is_spendable()) {
        if record.vout.is_locked_or_invalid(now.timestamp()) {
            debug!(record = %record.id, "skipping locked output");
            continue;
        }
        let held = held_amount(record, scan)?;
        if held >= requested {
            let change = held - requested;
            return Ok(WalletTransaction {
                id: uuid::Uuid::new_v4(),
                address: record.address.clone(),
                vout: record.vout.clone(),
                payment: amount,
                fee,
                change,
                balance: held,
                spent: change == 0,
                wallet_type: WalletType::Send,
                date_time: now,
                tx_id: String::new(),
                memo: String::new(),
            });
        }
    }

    Err(WalletError::InsufficientFunds {
        requested,
        available,
    })
}

/// One row of the balance sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceSheet {
    pub date_time: DateTime<Utc>,
    pub memo: String,
    pub money_in: u64,
    pub money_out: u64,
    /// Running balance after this row
    pub balance: u64,
}

#[derive(Clone, Debug)]
struct HistoryEntry {
    date_time: DateTime<Utc>,
    memo: String,
    money_in: u64,
    money_out: u64,
}

/// Wallet history in ascending date order.
#[derive(Clone, Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Rows with their running balance, computed as the iterator advances.
    /// Each call starts again from the first row.
    pub fn iter(&self) -> impl Iterator<Item = BalanceSheet> + '_ {
        self.entries.iter().scan(0u64, |credit, entry| {
            *credit = credit
                .saturating_add(entry.money_in)
                .saturating_sub(entry.money_out);
            Some(BalanceSheet {
                date_time: entry.date_time,
                memo: entry.memo.clone(),
                money_in: entry.money_in,
                money_out: entry.money_out,
                balance: *credit,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the history of `records`.
pub fn history(records: &[WalletTransaction], scan: &RistrettoPrivate) -> Result<History> {
    let mut sorted: Vec<&WalletTransaction> = records.iter().collect();
    sorted.sort_by_key(|r| r.date_time);

    let entries = sorted
        .into_iter()
        .map(|record| {
            let entry = match record.wallet_type {
                WalletType::Receive | WalletType::Restore => {
                    let note = open_note(scan, &record.vout.note)?;
                    HistoryEntry {
                        date_time: record.date_time,
                        memo: note.memo.clone(),
                        money_in: note.amount,
                        money_out: 0,
                    }
                }
                WalletType::Send | WalletType::Burn => HistoryEntry {
                    date_time: record.date_time,
                    memo: record.memo.clone(),
                    money_in: 0,
                    money_out: record.money_out(),
                },
            };
            Ok(entry)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(History { entries })
}

/// Fee for a transaction of `n_bytes` at `per_byte`.
pub fn fee_for(n_bytes: usize, per_byte: u64) -> u64 {
    (n_bytes as u64).saturating_mul(per_byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;
    use rand_core::OsRng;
    use uuid::Uuid;
    use veil_account_keys::RistrettoPublic;
    use veil_transaction_core::ring_signature::Scalar;
    use veil_transaction_core::{encrypt_note, lock_script, CoinType, Note, Vout};

    fn output(scan: &RistrettoPrivate, amount: u64, memo: &str) -> Vout {
        let note = Note {
            amount,
            blind: Scalar::random(&mut OsRng),
            memo: memo.to_string(),
        };
        Vout {
            note: encrypt_note(&RistrettoPublic::from(scan), &note, &mut OsRng).unwrap(),
            ..Default::default()
        }
    }

    fn receive(scan: &RistrettoPrivate, amount: u64, days_ago: i64) -> WalletTransaction {
        WalletTransaction {
            id: Uuid::new_v4(),
            address: "tveil://1/me".into(),
            vout: output(scan, amount, "salary"),
            payment: 0,
            fee: 0,
            change: amount,
            balance: amount,
            spent: false,
            wallet_type: WalletType::Receive,
            date_time: Utc::now() - Duration::days(days_ago),
            tx_id: String::new(),
            memo: String::new(),
        }
    }

    fn send(scan: &RistrettoPrivate, balance: u64, change: u64, days_ago: i64) -> WalletTransaction {
        WalletTransaction {
            vout: output(scan, change, ""),
            payment: balance - change,
            change,
            balance,
            spent: change == 0,
            wallet_type: WalletType::Send,
            memo: "rent".into(),
            ..receive(scan, 0, days_ago)
        }
    }

    #[test]
    fn test_balance_of_empty_wallet() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        assert_eq!(balance(&[], &scan).unwrap(), 0);
    }

    #[test]
    fn test_balance_nets_sends() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        let records = vec![receive(&scan, 100, 3), send(&scan, 100, 40, 2)];
        assert_eq!(balance(&records, &scan).unwrap(), 40);

        let records = vec![send(&scan, 100, 40, 2)];
        assert_eq!(balance(&records, &scan).unwrap(), 0);
    }

    #[test]
    fn test_balance_needs_scan_key() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        let other = RistrettoPrivate::from_random(&mut OsRng);
        let records = vec![receive(&scan, 100, 1)];
        assert_matches!(
            balance(&records, &other),
            Err(WalletError::InvalidKeyMaterial(_))
        );
    }

    #[test]
    fn test_sort_change_picks_first_covering_record() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        let records = vec![
            receive(&scan, 30, 5),
            receive(&scan, 100, 4),
            receive(&scan, 200, 3),
        ];

        let picked = sort_change(&records, &scan, 60, 2).unwrap();
        assert_eq!(picked.vout, records[1].vout);
        assert_eq!(picked.wallet_type, WalletType::Send);
        assert_eq!(picked.balance, 100);
        assert_eq!(picked.payment, 60);
        assert_eq!(picked.fee, 2);
        assert_eq!(picked.change, 38);
        assert!(!picked.spent);
    }

    #[test]
    fn test_sort_change_exact_amount_is_spent() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        let records = vec![receive(&scan, 100, 1)];
        let picked = sort_change(&records, &scan, 98, 2).unwrap();
        assert_eq!(picked.change, 0);
        assert!(picked.spent);
    }

    #[test]
    fn test_sort_change_skips_spent_and_locked() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        let mut spent = receive(&scan, 500, 3);
        spent.spent = true;
        let mut locked = receive(&scan, 500, 2);
        let lock = Utc::now().timestamp() + 3600;
        locked.vout.coin_type = CoinType::Coinbase;
        locked.vout.lock_time = lock;
        locked.vout.script = lock_script(lock);
        let open = receive(&scan, 80, 1);

        let records = vec![spent, locked, open.clone()];
        let picked = sort_change(&records, &scan, 50, 0).unwrap();
        assert_eq!(picked.vout, open.vout);
    }

    #[test]
    fn test_sort_change_waits_for_change_lock() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        let mut received = receive(&scan, 100, 2);
        received.spent = true;
        let mut sent = send(&scan, 100, 38, 1);
        let lock = Utc::now().timestamp() + 300;
        sent.vout.lock_time = lock;
        sent.vout.script = lock_script(lock);

        let records = vec![received.clone(), sent.clone()];
        assert_eq!(
            sort_change(&records, &scan, 10, 0).unwrap_err(),
            WalletError::InsufficientFunds {
                requested: 10,
                available: 38
            }
        );

        let expired = Utc::now().timestamp() - 1;
        sent.vout.lock_time = expired;
        sent.vout.script = lock_script(expired);
        let picked = sort_change(&[received, sent.clone()], &scan, 10, 0).unwrap();
        assert_eq!(picked.vout, sent.vout);
        assert_eq!(picked.change, 28);
    }

    #[test]
    fn test_sort_change_insufficient_total() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        let records = vec![receive(&scan, 30, 2), receive(&scan, 20, 1)];
        assert_eq!(
            sort_change(&records, &scan, 60, 0).unwrap_err(),
            WalletError::InsufficientFunds {
                requested: 60,
                available: 50
            }
        );
    }

    #[test]
    fn test_sort_change_no_single_covering_record() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        let records = vec![receive(&scan, 40, 2), receive(&scan, 40, 1)];
        assert_matches!(
            sort_change(&records, &scan, 60, 0),
            Err(WalletError::InsufficientFunds {
                requested: 60,
                available: 80
            })
        );
    }

    #[test]
    fn test_history_is_ordered_and_restartable() {
        let scan = RistrettoPrivate::from_random(&mut OsRng);
        let records = vec![send(&scan, 100, 40, 1), receive(&scan, 100, 2)];
        let history = history(&records, &scan).unwrap();
        assert_eq!(history.len(), 2);

        let rows: Vec<BalanceSheet> = history.iter().collect();
        assert_eq!(rows[0].money_in, 100);
        assert_eq!(rows[0].memo, "salary");
        assert_eq!(rows[0].balance, 100);
        assert_eq!(rows[1].money_out, 60);
        assert_eq!(rows[1].memo, "rent");
        assert_eq!(rows[1].balance, 40);

        let again: Vec<BalanceSheet> = history.iter().collect();
        assert_eq!(rows, again);
        assert_eq!(history.iter().take(1).count(), 1);
    }

    #[test]
    fn test_fee_for() {
        assert_eq!(fee_for(3000, DEFAULT_FEE_PER_BYTE), 36_000);
        assert_eq!(fee_for(usize::MAX, u64::MAX), u64::MAX);
    }
}
