//! Buffer pools for reusing request body buffers.
//!
//! Two pools are provided:
//! - [`BoundedBufferPool`]: a fixed number of slots, picked round-robin, each
//!   guarded by its own lock. Memory never exceeds `slots × buffer_size`.
//! - [`RecycledPool`]: an unbounded lock-free free-list that lazily creates
//!   buffers on demand. Used as a comparison baseline.

mod bounded;
mod recycled;

pub use bounded::{BoundedBufferPool, BoundedPoolStats, Lease, Slot};
pub use recycled::{RecycledBuffer, RecycledPool, RecycledPoolStats};

/// Who is responsible for wiping a buffer between uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ClearPolicy {
    /// The pool never touches buffer contents; callers clear before release.
    #[default]
    Caller,
    /// The pool truncates the buffer to zero length just before release.
    OnRelease,
}

impl ClearPolicy {
    /// Apply the policy to a buffer that is about to be released.
    #[inline]
    pub(crate) fn apply<B: Clearable>(self, buf: &mut B) {
        if self == ClearPolicy::OnRelease {
            buf.clear_contents();
        }
    }
}

/// Buffers a [`ClearPolicy`] knows how to wipe.
pub(crate) trait Clearable {
    fn clear_contents(&mut self);
}

impl Clearable for Vec<u8> {
    #[inline]
    fn clear_contents(&mut self) {
        self.clear();
    }
}

impl Clearable for bytes::BytesMut {
    #[inline]
    fn clear_contents(&mut self) {
        self.clear();
    }
}
