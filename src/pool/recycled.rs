//! Unbounded lock-free pool of reusable BytesMut buffers.
//!
//! Buffers are created lazily when no idle one is available and are pushed
//! back onto a shared free-list on release. Nothing caps the number of live
//! buffers, which is what separates it from the bounded pool.

use bytes::BytesMut;
use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::pool::ClearPolicy;

/// Unbounded recycling pool of fixed-capacity buffers.
#[derive(Debug)]
pub struct RecycledPool {
    /// Idle buffers waiting for reuse.
    idle: SegQueue<BytesMut>,
    /// Capacity given to newly created buffers.
    buffer_size: usize,
    clear: ClearPolicy,
    /// Statistics: buffers taken from the idle list.
    hits: AtomicUsize,
    /// Statistics: buffers created new (idle list empty).
    misses: AtomicUsize,
    /// Statistics: buffers returned to the idle list.
    returns: AtomicUsize,
}

impl RecycledPool {
    /// Create an empty pool handing out buffers of `buffer_size` bytes.
    ///
    /// Buffers are cleared before being recycled unless another policy is
    /// set with [`RecycledPool::with_clear_policy`].
    pub fn new(buffer_size: usize) -> Self {
        Self {
            idle: SegQueue::new(),
            buffer_size,
            clear: ClearPolicy::OnRelease,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            returns: AtomicUsize::new(0),
        }
    }

    /// Set who clears buffers between uses.
    pub fn with_clear_policy(mut self, policy: ClearPolicy) -> Self {
        self.clear = policy;
        self
    }

    /// Take an idle buffer, or create one when none is available.
    #[inline]
    pub fn get(&self) -> RecycledBuffer<'_> {
        let buf = match self.idle.pop() {
            Some(buf) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                buf
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                BytesMut::with_capacity(self.buffer_size)
            }
        };

        RecycledBuffer {
            pool: self,
            buf,
            clear_on_release: false,
        }
    }

    /// Return a buffer to the idle list.
    #[inline]
    pub fn put(&self, mut buf: BytesMut) {
        // A detached buffer that was split or frozen may have lost its backing storage.
        if buf.capacity() < self.buffer_size {
            return;
        }

        self.clear.apply(&mut buf);
        self.idle.push(buf);
        self.returns.fetch_add(1, Ordering::Relaxed);
    }

    /// Clearing policy applied on release.
    #[inline]
    pub fn clear_policy(&self) -> ClearPolicy {
        self.clear
    }

    /// Configured per-buffer capacity in bytes.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Get pool statistics.
    pub fn stats(&self) -> RecycledPoolStats {
        RecycledPoolStats {
            idle: self.idle.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
        }
    }

    /// Number of idle buffers.
    #[inline]
    pub fn len(&self) -> usize {
        self.idle.len()
    }

    /// Check if no buffer is idle.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idle.is_empty()
    }
}

/// Recycled pool statistics for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecycledPoolStats {
    /// Buffers currently idle.
    pub idle: usize,
    /// Buffers reused from the idle list.
    pub hits: usize,
    /// Buffers created because none was idle.
    pub misses: usize,
    /// Buffers put back.
    pub returns: usize,
}

impl RecycledPoolStats {
    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// RAII guard that returns its buffer to the pool on drop.
pub struct RecycledBuffer<'a> {
    pool: &'a RecycledPool,
    buf: BytesMut,
    clear_on_release: bool,
}

impl RecycledBuffer<'_> {
    /// Clear the buffer before it goes back to the pool, whatever the
    /// pool's policy. Also applies when the guard is dropped mid-use.
    #[inline]
    pub fn clear_on_release(&mut self) {
        self.clear_on_release = true;
    }

    /// Take the buffer, preventing return to pool.
    pub fn detach(mut self) -> BytesMut {
        std::mem::take(&mut self.buf)
    }
}

impl std::ops::Deref for RecycledBuffer<'_> {
    type Target = BytesMut;

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl std::ops::DerefMut for RecycledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl Drop for RecycledBuffer<'_> {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        if self.clear_on_release {
            buf.clear();
        }
        // Detached guards hold an empty, unallocated buffer.
        if buf.capacity() > 0 {
            self.pool.put(buf);
        }
    }
}
