// Copyright (c) 2024 The Veil Foundation

//! Memory locking for secret buffers.
//!
//! Pages backing a [`crate::SecretBuffer`] are pinned with `mlock()` on Unix so
//! that spend keys, root keys and passphrases are not written to swap.
//! Locking failures are logged and otherwise ignored; zeroing on drop is
//! still performed by the owner.

#![allow(unsafe_code)]

use std::ptr::NonNull;

/// Result of a memory lock operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockResult {
    /// Memory was successfully locked
    Locked,
    /// Memory locking failed (warning logged, continuing without lock)
    Failed,
    /// Memory locking not supported on this platform
    Unsupported,
}

/// Lock a memory region to prevent it from being swapped to disk.
///
/// # Safety
/// `ptr` must point to valid memory of at least `len` bytes.
unsafe fn mlock(ptr: NonNull<u8>, len: usize) -> LockResult {
    if len == 0 {
        return LockResult::Locked;
    }

    #[cfg(unix)]
    {
        let result = libc::mlock(ptr.as_ptr() as *const libc::c_void, len);
        if result == 0 {
            LockResult::Locked
        } else {
            let error = std::io::Error::last_os_error();
            let errno = error.raw_os_error().unwrap_or(0);
            let reason = match errno {
                libc::ENOMEM => "insufficient memory or exceeds RLIMIT_MEMLOCK",
                libc::EPERM => "insufficient permissions (may need CAP_IPC_LOCK)",
                libc::EINVAL => "invalid address range",
                _ => "unknown error",
            };
            tracing::warn!(
                "Failed to lock {} bytes of secret memory: {} (errno {})",
                len,
                reason,
                errno
            );
            LockResult::Failed
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ptr;
        tracing::warn!("Memory locking not supported on this platform");
        LockResult::Unsupported
    }
}

/// Unlock a region previously locked with [`mlock`].
///
/// # Safety
/// `ptr` must point to valid memory of at least `len` bytes that was locked
/// by this module.
unsafe fn munlock(ptr: NonNull<u8>, len: usize) {
    if len == 0 {
        return;
    }

    #[cfg(unix)]
    {
        if libc::munlock(ptr.as_ptr() as *const libc::c_void, len) != 0 {
            tracing::debug!("munlock returned non-zero (likely already unlocked)");
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ptr;
    }
}

/// RAII guard that keeps a heap region locked while it is alive.
#[derive(Debug)]
pub(crate) struct LockedRegion {
    ptr: NonNull<u8>,
    len: usize,
    result: LockResult,
}

impl LockedRegion {
    /// Lock the memory backing `bytes`.
    ///
    /// # Safety
    /// The allocation behind `bytes` must outlive the returned region and must
    /// not be moved or reallocated while the region exists.
    pub(crate) unsafe fn new(bytes: &[u8]) -> Self {
        match NonNull::new(bytes.as_ptr() as *mut u8) {
            Some(ptr) if !bytes.is_empty() => Self {
                ptr,
                len: bytes.len(),
                result: mlock(ptr, bytes.len()),
            },
            _ => Self {
                ptr: NonNull::dangling(),
                len: 0,
                result: LockResult::Locked,
            },
        }
    }

    pub(crate) fn result(&self) -> LockResult {
        self.result
    }
}

impl Drop for LockedRegion {
    fn drop(&mut self) {
        if self.result == LockResult::Locked {
            // SAFETY: only regions we successfully locked are unlocked, and the
            // owner drops this guard before releasing the allocation.
            unsafe { munlock(self.ptr, self.len) }
        }
    }
}

// SAFETY: the pointer is never dereferenced, only handed to the OS.
unsafe impl Send for LockedRegion {}
unsafe impl Sync for LockedRegion {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_region_raii() {
        let data = vec![7u8; 4096].into_boxed_slice();
        // SAFETY: data outlives the region
        let region = unsafe { LockedRegion::new(&data) };
        assert!(matches!(
            region.result(),
            LockResult::Locked | LockResult::Failed | LockResult::Unsupported
        ));
        drop(region);
    }

    #[test]
    fn test_empty_region_is_trivially_locked() {
        let data: Box<[u8]> = Box::new([]);
        // SAFETY: no memory is accessed for an empty region
        let region = unsafe { LockedRegion::new(&data) };
        assert_eq!(region.result(), LockResult::Locked);
    }
}
