//! The buffer provisioning strategies under comparison.

use std::fmt;

/// How a request handler obtains the buffer it drains the body into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Allocate a fresh buffer for every request.
    Basic,
    /// Reuse buffers from the unbounded recycled pool.
    ObjectPool,
    /// Lease a slot from the fixed-size bounded pool.
    BoundedPool,
}

impl Strategy {
    /// Number of strategies.
    pub const COUNT: usize = 3;

    pub const ALL: [Strategy; Self::COUNT] =
        [Strategy::Basic, Strategy::ObjectPool, Strategy::BoundedPool];

    /// Route serving this strategy.
    pub fn path(self) -> &'static str {
        match self {
            Strategy::Basic => "/basic-handler",
            Strategy::ObjectPool => "/object-pool-handler",
            Strategy::BoundedPool => "/bounded-pool-handler",
        }
    }

    /// Look up the strategy served on `path`.
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.path() == path)
    }

    /// Label used in logs and metrics.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Basic => "basic",
            Strategy::ObjectPool => "object_pool",
            Strategy::BoundedPool => "bounded_pool",
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
