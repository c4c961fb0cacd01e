//! Observability for the buffer strategies under test.
//!
//! Lock-free per-strategy counters and latency histograms, plus a text
//! exposition in Prometheus format served on `GET /metrics`.

mod histogram;

pub use histogram::LatencyHistogram;

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::pool::{BoundedPoolStats, RecycledPoolStats};
use crate::strategy::Strategy;

/// Relaxed ordering for counters (eventual visibility is fine for metrics).
const RELAXED: Ordering = Ordering::Relaxed;

/// Counters for one buffer strategy.
#[derive(Debug, Default)]
pub struct StrategyMetrics {
    pub requests: AtomicU64,
    /// Body read failures answered with 500.
    pub failures: AtomicU64,
    /// Oversized bodies answered with 413.
    pub rejected: AtomicU64,
    pub bytes_drained: AtomicU64,
    pub latency: LatencyHistogram,
}

/// Collection of all server metrics.
#[derive(Debug)]
pub struct Metrics {
    strategies: [StrategyMetrics; Strategy::COUNT],
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    started: Instant,
}

impl Metrics {
    /// Create a new metrics instance with all counters at zero.
    pub fn new() -> Self {
        Self {
            strategies: Default::default(),
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Counters for one strategy.
    #[inline]
    pub fn strategy(&self, strategy: Strategy) -> &StrategyMetrics {
        &self.strategies[strategy.index()]
    }

    /// Increment active connections.
    #[inline]
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, RELAXED);
        self.connections_active.fetch_add(1, RELAXED);
    }

    /// Decrement active connections.
    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, RELAXED);
    }

    /// Record one handled request and its outcome.
    pub fn record(&self, strategy: Strategy, start: Instant, outcome: &Result<usize>) {
        let m = self.strategy(strategy);
        m.requests.fetch_add(1, RELAXED);
        m.latency.record(start.elapsed().as_micros() as u64);

        match outcome {
            Ok(bytes) => {
                m.bytes_drained.fetch_add(*bytes as u64, RELAXED);
            }
            Err(Error::BodyTooLarge { .. }) => {
                m.rejected.fetch_add(1, RELAXED);
            }
            Err(_) => {
                m.failures.fetch_add(1, RELAXED);
            }
        }
    }

    /// Get a snapshot of all metrics for reporting.
    pub fn snapshot(&self, bounded: BoundedPoolStats, recycled: RecycledPoolStats) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.started.elapsed().as_secs(),
            connections_total: self.connections_total.load(RELAXED),
            connections_active: self.connections_active.load(RELAXED),
            strategies: Strategy::ALL.map(|strategy| {
                let m = self.strategy(strategy);
                StrategySnapshot {
                    strategy,
                    requests: m.requests.load(RELAXED),
                    failures: m.failures.load(RELAXED),
                    rejected: m.rejected.load(RELAXED),
                    bytes_drained: m.bytes_drained.load(RELAXED),
                    latency: m.latency.percentiles(),
                }
            }),
            bounded,
            recycled,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency percentiles in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyPercentiles {
    pub count: u64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub max: u64,
}

/// Point-in-time counters for one strategy.
#[derive(Debug, Clone, Copy)]
pub struct StrategySnapshot {
    pub strategy: Strategy,
    pub requests: u64,
    pub failures: u64,
    pub rejected: u64,
    pub bytes_drained: u64,
    pub latency: LatencyPercentiles,
}

/// Point-in-time snapshot of all metrics.
#[derive(Debug)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub connections_total: u64,
    pub connections_active: u64,
    pub strategies: [StrategySnapshot; Strategy::COUNT],
    pub bounded: BoundedPoolStats,
    pub recycled: RecycledPoolStats,
}

impl MetricsSnapshot {
    /// Format in the Prometheus text exposition format.
    pub fn to_prometheus_string(&self) -> String {
        let mut out = String::with_capacity(2048);

        // Writing into a String cannot fail.
        let _ = self.write_prometheus(&mut out);
        out
    }

    fn write_prometheus(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "# TYPE pool_perf_uptime_seconds gauge")?;
        writeln!(out, "pool_perf_uptime_seconds {}", self.uptime_secs)?;
        writeln!(out, "# TYPE pool_perf_connections_total counter")?;
        writeln!(out, "pool_perf_connections_total {}", self.connections_total)?;
        writeln!(out, "# TYPE pool_perf_connections_active gauge")?;
        writeln!(out, "pool_perf_connections_active {}", self.connections_active)?;

        let counters: [(&str, fn(&StrategySnapshot) -> u64); 4] = [
            ("requests_total", |s| s.requests),
            ("failures_total", |s| s.failures),
            ("rejected_total", |s| s.rejected),
            ("bytes_drained_total", |s| s.bytes_drained),
        ];
        for (name, value) in counters {
            writeln!(out, "# TYPE pool_perf_{} counter", name)?;
            for s in &self.strategies {
                writeln!(
                    out,
                    "pool_perf_{}{{strategy=\"{}\"}} {}",
                    name,
                    s.strategy.name(),
                    value(s)
                )?;
            }
        }

        writeln!(out, "# TYPE pool_perf_latency_microseconds summary")?;
        for s in &self.strategies {
            let name = s.strategy.name();
            for (quantile, value) in [("0.5", s.latency.p50), ("0.95", s.latency.p95), ("0.99", s.latency.p99)] {
                writeln!(
                    out,
                    "pool_perf_latency_microseconds{{strategy=\"{}\",quantile=\"{}\"}} {}",
                    name, quantile, value
                )?;
            }
            writeln!(
                out,
                "pool_perf_latency_microseconds_count{{strategy=\"{}\"}} {}",
                name, s.latency.count
            )?;
        }

        writeln!(out, "# TYPE pool_perf_bounded_slots gauge")?;
        writeln!(out, "pool_perf_bounded_slots {}", self.bounded.slots)?;
        writeln!(out, "# TYPE pool_perf_bounded_capacity_bytes gauge")?;
        writeln!(
            out,
            "pool_perf_bounded_capacity_bytes {}",
            self.bounded.slots * self.bounded.buffer_size
        )?;
        writeln!(out, "# TYPE pool_perf_bounded_acquisitions_total counter")?;
        writeln!(out, "pool_perf_bounded_acquisitions_total {}", self.bounded.acquisitions)?;
        writeln!(out, "# TYPE pool_perf_bounded_contended_total counter")?;
        writeln!(out, "pool_perf_bounded_contended_total {}", self.bounded.contended)?;

        writeln!(out, "# TYPE pool_perf_recycled_idle gauge")?;
        writeln!(out, "pool_perf_recycled_idle {}", self.recycled.idle)?;
        writeln!(out, "# TYPE pool_perf_recycled_hits_total counter")?;
        writeln!(out, "pool_perf_recycled_hits_total {}", self.recycled.hits)?;
        writeln!(out, "# TYPE pool_perf_recycled_misses_total counter")?;
        writeln!(out, "pool_perf_recycled_misses_total {}", self.recycled.misses)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_stats() -> (BoundedPoolStats, RecycledPoolStats) {
        (
            BoundedPoolStats {
                slots: 10,
                buffer_size: 2048,
                acquisitions: 7,
                contended: 2,
            },
            RecycledPoolStats {
                idle: 3,
                hits: 5,
                misses: 3,
                returns: 8,
            },
        )
    }

    #[test]
    fn test_connection_tracking() {
        let m = Metrics::new();

        m.connection_opened();
        m.connection_opened();
        assert_eq!(m.connections_active.load(RELAXED), 2);

        m.connection_closed();
        assert_eq!(m.connections_active.load(RELAXED), 1);
        assert_eq!(m.connections_total.load(RELAXED), 2);
    }

    #[test]
    fn test_record_outcomes() {
        let m = Metrics::new();
        let start = Instant::now();

        m.record(Strategy::BoundedPool, start, &Ok(1024));
        m.record(Strategy::BoundedPool, start, &Ok(512));
        m.record(Strategy::BoundedPool, start, &Err(Error::BodyTooLarge { limit: 2048 }));
        m.record(Strategy::Basic, start, &Err(Error::Body("reset".into())));

        let bounded = m.strategy(Strategy::BoundedPool);
        assert_eq!(bounded.requests.load(RELAXED), 3);
        assert_eq!(bounded.bytes_drained.load(RELAXED), 1536);
        assert_eq!(bounded.rejected.load(RELAXED), 1);
        assert_eq!(bounded.failures.load(RELAXED), 0);
        assert_eq!(bounded.latency.count(), 3);

        let basic = m.strategy(Strategy::Basic);
        assert_eq!(basic.failures.load(RELAXED), 1);
        assert_eq!(m.strategy(Strategy::ObjectPool).requests.load(RELAXED), 0);
    }

    #[test]
    fn test_prometheus_output() {
        let m = Metrics::new();
        m.record(Strategy::ObjectPool, Instant::now(), &Ok(1024));

        let (bounded, recycled) = pool_stats();
        let text = m.snapshot(bounded, recycled).to_prometheus_string();

        assert!(text.contains("pool_perf_requests_total{strategy=\"object_pool\"} 1"));
        assert!(text.contains("pool_perf_requests_total{strategy=\"basic\"} 0"));
        assert!(text.contains("pool_perf_bytes_drained_total{strategy=\"object_pool\"} 1024"));
        assert!(text.contains("pool_perf_bounded_slots 10"));
        assert!(text.contains("pool_perf_bounded_capacity_bytes 20480"));
        assert!(text.contains("pool_perf_bounded_contended_total 2"));
        assert!(text.contains("pool_perf_recycled_hits_total 5"));
    }
}
