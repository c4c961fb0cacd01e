//! Fixed-capacity buffer pool with round-robin slot selection.
//!
//! The pool owns `N` slots, each holding one pre-allocated buffer behind its
//! own lock. A shared counter picks the next slot; the caller then waits on
//! that slot until it is free. Callers are never redirected to a different
//! idle slot, so selection stays O(1) and allocation-free.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::pool::ClearPolicy;

/// One reusable buffer and the lock serializing access to it.
#[derive(Debug)]
pub struct Slot {
    buffer: Mutex<Vec<u8>>,
}

impl Slot {
    /// Pre-allocate a slot whose buffer holds `size` bytes without growing.
    fn with_capacity(size: usize) -> Result<Self> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size)?;
        Ok(Self {
            buffer: Mutex::new(buffer),
        })
    }

    /// Wait until no other caller holds this slot, then take it.
    ///
    /// The slot is released when the returned guard is dropped.
    pub async fn acquire(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buffer.lock().await
    }

    /// Blocking variant of [`Slot::acquire`] for plain threads.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async execution context.
    pub fn acquire_blocking(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buffer.blocking_lock()
    }

    /// Take the slot only if it is free right now.
    pub fn try_acquire(&self) -> Option<MutexGuard<'_, Vec<u8>>> {
        self.buffer.try_lock().ok()
    }
}

/// Exclusive access to one slot of a [`BoundedBufferPool`].
///
/// Hand it back with [`BoundedBufferPool::put`]; dropping it has the same
/// effect, so the slot is released on every exit path.
pub struct Lease<'a> {
    index: usize,
    guard: MutexGuard<'a, Vec<u8>>,
    clear: ClearPolicy,
}

impl Lease<'_> {
    /// Index of the slot this lease holds.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Clear the buffer when this lease is released, whatever the pool's
    /// policy. Also applies when the lease is dropped mid-use.
    #[inline]
    pub fn clear_on_release(&mut self) {
        self.clear = ClearPolicy::OnRelease;
    }
}

impl Deref for Lease<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for Lease<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        // Runs before `guard` is dropped, so the slot is still held here.
        self.clear.apply(&mut *self.guard);
    }
}

impl std::fmt::Debug for Lease<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("index", &self.index)
            .field("len", &self.guard.len())
            .finish()
    }
}

/// Object pool with a hard upper bound on the number of live buffers.
#[derive(Debug)]
pub struct BoundedBufferPool {
    slots: Box<[Slot]>,
    buffer_size: usize,
    /// Round-robin ticket counter. Wraps at u64::MAX.
    next: AtomicU64,
    clear: ClearPolicy,
    acquisitions: AtomicU64,
    contended: AtomicU64,
}

impl BoundedBufferPool {
    /// Create a pool of `slot_count` buffers, each `buffer_size` bytes.
    ///
    /// Every buffer is allocated up front. Fails with
    /// [`Error::InvalidArgument`] when `slot_count` is zero and with
    /// [`Error::Allocation`] when memory cannot be reserved.
    pub fn new(buffer_size: usize, slot_count: usize) -> Result<Self> {
        if slot_count == 0 {
            return Err(Error::InvalidArgument(
                "slot count must be greater than zero".to_string(),
            ));
        }

        let slots = (0..slot_count)
            .map(|_| Slot::with_capacity(buffer_size))
            .collect::<Result<Vec<_>>>()?
            .into_boxed_slice();

        Ok(Self {
            slots,
            buffer_size,
            next: AtomicU64::new(0),
            clear: ClearPolicy::default(),
            acquisitions: AtomicU64::new(0),
            contended: AtomicU64::new(0),
        })
    }

    /// Set who clears buffers between uses.
    pub fn with_clear_policy(mut self, policy: ClearPolicy) -> Self {
        self.clear = policy;
        self
    }

    /// Pick the next slot round-robin.
    #[inline]
    fn next_index(&self) -> usize {
        let ticket = self.next.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        (ticket % self.slots.len() as u64) as usize
    }

    /// Acquire the next slot, waiting until its current holder releases it.
    pub async fn get(&self) -> Lease<'_> {
        let index = self.next_index();
        let slot = &self.slots[index];

        let guard = match slot.try_acquire() {
            Some(guard) => guard,
            None => {
                self.contended.fetch_add(1, Ordering::Relaxed);
                slot.acquire().await
            }
        };

        self.lease(index, guard)
    }

    /// Blocking variant of [`BoundedBufferPool::get`] for plain threads.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async execution context.
    pub fn get_blocking(&self) -> Lease<'_> {
        let index = self.next_index();
        let slot = &self.slots[index];

        let guard = match slot.try_acquire() {
            Some(guard) => guard,
            None => {
                self.contended.fetch_add(1, Ordering::Relaxed);
                slot.acquire_blocking()
            }
        };

        self.lease(index, guard)
    }

    #[inline]
    fn lease<'a>(&'a self, index: usize, guard: MutexGuard<'a, Vec<u8>>) -> Lease<'a> {
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        Lease {
            index,
            guard,
            clear: self.clear,
        }
    }

    /// Return a lease to the pool.
    #[inline]
    pub fn put(&self, lease: Lease<'_>) {
        drop(lease);
    }

    /// Direct access to a slot, mainly for inspection.
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Number of slots. Fixed for the lifetime of the pool.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Configured per-buffer capacity in bytes.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Upper bound on the memory held by the pool's buffers.
    #[inline]
    pub fn capacity_bytes(&self) -> usize {
        self.slots.len() * self.buffer_size
    }

    /// Clearing policy applied on release.
    #[inline]
    pub fn clear_policy(&self) -> ClearPolicy {
        self.clear
    }

    /// Get pool statistics.
    pub fn stats(&self) -> BoundedPoolStats {
        BoundedPoolStats {
            slots: self.slots.len(),
            buffer_size: self.buffer_size,
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
        }
    }
}

/// Bounded pool statistics for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedPoolStats {
    /// Number of slots.
    pub slots: usize,
    /// Per-buffer capacity in bytes.
    pub buffer_size: usize,
    /// Leases handed out.
    pub acquisitions: u64,
    /// Leases that had to wait for the slot's previous holder.
    pub contended: u64,
}

impl BoundedPoolStats {
    /// Fraction of acquisitions that waited (0.0 to 1.0).
    pub fn contention_rate(&self) -> f64 {
        if self.acquisitions == 0 {
            0.0
        } else {
            self.contended as f64 / self.acquisitions as f64
        }
    }
}
