// Copyright (c) 2024 The Veil Foundation

//! Transaction limits and lock periods.

/// Version written into every assembled transaction.
pub const TX_VERSION: u32 = 1;

/// Maximum serialized transaction size in bytes.
pub const MAX_TRANSACTION_SIZE: usize = 3474 + 64;

/// Seconds a fee output stays time-locked.
pub const FEE_LOCK_SECS: i64 = 21 * 60 * 60;

/// Seconds a change output stays time-locked.
pub const CHANGE_LOCK_SECS: i64 = 5 * 60;

/// Ring size used when none is configured.
pub const DEFAULT_RING_SIZE: usize = 11;

/// Smallest ring that hides the real input at all.
pub const MIN_RING_SIZE: usize = 2;

/// Largest ring that still fits [`MAX_TRANSACTION_SIZE`] with a full memo.
pub const MAX_RING_SIZE: usize = 12;

/// Longest memo, in bytes, accepted for a payment note.
pub const MAX_MEMO_LEN: usize = 256;
