//! Lock-free latency histogram for request handling times.
//!
//! Four linear bands of 16 buckets each. Resolution grows 16x per band and
//! each band starts where the previous one ends.

use std::sync::atomic::{AtomicU64, Ordering};

use super::LatencyPercentiles;

/// Buckets per band.
const BAND_WIDTH: usize = 16;

/// Number of buckets in the histogram.
const NUM_BUCKETS: usize = BAND_WIDTH * 4;

/// Lower bound (microseconds) and resolution of each band.
///
/// Band 0 covers 0-15us, band 1 16-271us, band 2 272-4367us and band 3
/// 4368us and above, with the last bucket absorbing overflow.
const BANDS: [(u64, u64); 4] = [(0, 1), (16, 16), (272, 256), (4368, 4096)];

/// Latency histogram in microseconds.
pub struct LatencyHistogram {
    buckets: [AtomicU64; NUM_BUCKETS],
    count: AtomicU64,
    max: AtomicU64,
}

impl LatencyHistogram {
    /// Create a new empty histogram.
    pub fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            count: AtomicU64::new(0),
            max: AtomicU64::new(0),
        }
    }

    /// Record a latency value in microseconds.
    #[inline]
    pub fn record(&self, value_us: u64) {
        self.buckets[Self::bucket_of(value_us)].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max.fetch_max(value_us, Ordering::Relaxed);
    }

    #[inline]
    fn bucket_of(value_us: u64) -> usize {
        for (band, &(floor, step)) in BANDS.iter().enumerate().rev() {
            if value_us >= floor {
                let offset = ((value_us - floor) / step) as usize;
                return band * BAND_WIDTH + offset.min(BAND_WIDTH - 1);
            }
        }
        0
    }

    /// Lower bound of a bucket in microseconds.
    #[inline]
    fn floor_of(bucket: usize) -> u64 {
        let (floor, step) = BANDS[bucket / BAND_WIDTH];
        floor + (bucket % BAND_WIDTH) as u64 * step
    }

    /// Get total count of recorded values.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Calculate p50, p95, p99 percentiles.
    pub fn percentiles(&self) -> LatencyPercentiles {
        let total = self.count.load(Ordering::Relaxed);
        if total == 0 {
            return LatencyPercentiles::default();
        }

        let targets = [total / 2, total * 95 / 100, total * 99 / 100];
        let mut found = [None; 3];
        let mut cumulative = 0u64;

        for (bucket, counter) in self.buckets.iter().enumerate() {
            cumulative += counter.load(Ordering::Relaxed);
            for (slot, &target) in found.iter_mut().zip(targets.iter()) {
                if slot.is_none() && cumulative >= target {
                    *slot = Some(Self::floor_of(bucket));
                }
            }
        }

        LatencyPercentiles {
            count: total,
            p50: found[0].unwrap_or(0),
            p95: found[1].unwrap_or(0),
            p99: found[2].unwrap_or(0),
            max: self.max.load(Ordering::Relaxed),
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LatencyHistogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyHistogram")
            .field("count", &self.count())
            .field("max", &self.max.load(Ordering::Relaxed))
            .finish()
    }
}
