use bytes::BytesMut;
use hyper::body::Body;

use crate::config::Config;
use crate::error::{BoxError, Result};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::pool::{BoundedBufferPool, ClearPolicy, RecycledPool};
use crate::server::body::drain_body;
use crate::strategy::Strategy;

/// Everything the request handlers share: both pools and the metrics.
///
/// Built once at startup and handed to the listener behind an `Arc`.
#[derive(Debug)]
pub struct AppState {
    bounded: BoundedBufferPool,
    recycled: RecycledPool,
    buffer_size: usize,
    metrics: Metrics,
}

impl AppState {
    /// Build the pools described by `config`.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let bounded = BoundedBufferPool::new(config.buffer_size, config.slots)?
            .with_clear_policy(config.bounded_clear);
        let recycled =
            RecycledPool::new(config.buffer_size).with_clear_policy(config.recycled_clear);

        Ok(Self {
            bounded,
            recycled,
            buffer_size: config.buffer_size,
            metrics: Metrics::new(),
        })
    }

    pub fn bounded(&self) -> &BoundedBufferPool {
        &self.bounded
    }

    pub fn recycled(&self) -> &RecycledPool {
        &self.recycled
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Largest body accepted by any strategy.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Drain one request body with the given strategy.
    ///
    /// Pooled buffers are released on every path, including read errors and
    /// cancellation of this future. Under the `Caller` policy this handler is
    /// the caller, so it arms the guard to clear before draining; the wipe
    /// then happens in the guard's `Drop` while the buffer is still held.
    pub async fn drain<B>(&self, strategy: Strategy, body: B) -> Result<usize>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let limit = self.buffer_size;

        match strategy {
            Strategy::Basic => {
                let mut buf = BytesMut::with_capacity(limit);
                drain_body(body, &mut buf, limit).await
            }
            Strategy::ObjectPool => {
                let mut buf = self.recycled.get();
                if self.recycled.clear_policy() == ClearPolicy::Caller {
                    buf.clear_on_release();
                }
                drain_body(body, &mut *buf, limit).await
            }
            Strategy::BoundedPool => {
                let mut lease = self.bounded.get().await;
                if self.bounded.clear_policy() == ClearPolicy::Caller {
                    lease.clear_on_release();
                }
                let result = drain_body(body, &mut *lease, limit).await;
                self.bounded.put(lease);
                result
            }
        }
    }

    /// Metrics together with current pool statistics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics
            .snapshot(self.bounded.stats(), self.recycled.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::server::testing::ChunkedBody;
    use bytes::Bytes;
    use http_body_util::Full;
    use std::io;
    use std::time::Duration;

    fn small_config() -> Config {
        Config {
            buffer_size: 64,
            slots: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config {
            slots: 0,
            ..Default::default()
        };
        assert!(matches!(AppState::new(&config), Err(Error::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_every_strategy_drains() {
        let state = AppState::new(&small_config()).unwrap();

        for strategy in Strategy::ALL {
            let body = Full::new(Bytes::from_static(&[b'0'; 48]));
            assert_eq!(state.drain(strategy, body).await.unwrap(), 48, "{}", strategy);
        }

        assert_eq!(state.bounded().stats().acquisitions, 1);
        assert_eq!(state.recycled().stats().returns, 1);
    }

    #[tokio::test]
    async fn test_bounded_slot_reusable_after_each_request() {
        let state = AppState::new(&small_config()).unwrap();

        // Caller policy: the handler clears, so a full-size body fits every time.
        for _ in 0..10 {
            let body = Full::new(Bytes::from_static(&[1u8; 64]));
            assert_eq!(state.drain(Strategy::BoundedPool, body).await.unwrap(), 64);
        }

        for i in 0..state.bounded().slot_count() {
            let guard = state.bounded().slot(i).unwrap().try_acquire().unwrap();
            assert!(guard.is_empty());
        }
    }

    #[tokio::test]
    async fn test_slot_released_after_read_error() {
        let config = Config {
            buffer_size: 64,
            slots: 1,
            ..Default::default()
        };
        let state = AppState::new(&config).unwrap();

        let failing = ChunkedBody::new(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated")),
        ]);
        let err = state.drain(Strategy::BoundedPool, failing).await.unwrap_err();
        assert!(matches!(err, Error::Body(_)));

        let lease = state.bounded().slot(0).unwrap().try_acquire();
        assert!(lease.is_some_and(|buf| buf.is_empty()));
    }

    #[tokio::test]
    async fn test_cancelled_drain_leaves_pooled_buffers_clean() {
        let config = Config {
            buffer_size: 64,
            slots: 1,
            bounded_clear: ClearPolicy::Caller,
            recycled_clear: ClearPolicy::Caller,
            ..Default::default()
        };
        let state = AppState::new(&config).unwrap();

        for strategy in [Strategy::ObjectPool, Strategy::BoundedPool] {
            // Client sends part of the body, then goes quiet.
            let stalled = ChunkedBody::stalling(vec![Ok(Bytes::from_static(&[7u8; 40]))]);
            let dropped =
                tokio::time::timeout(Duration::from_millis(50), state.drain(strategy, stalled)).await;
            assert!(dropped.is_err(), "{}", strategy);

            if strategy == Strategy::BoundedPool {
                let slot = state.bounded().slot(0).unwrap().try_acquire();
                assert!(slot.is_some_and(|buf| buf.is_empty()));
            } else {
                assert_eq!(state.recycled().len(), 1);
                assert!(state.recycled().get().is_empty());
            }

            let body = Full::new(Bytes::from_static(&[1u8; 40]));
            assert_eq!(state.drain(strategy, body).await.unwrap(), 40, "{}", strategy);
        }
    }

    #[tokio::test]
    async fn test_oversized_body_rejected_for_all_strategies() {
        let state = AppState::new(&small_config()).unwrap();

        for strategy in Strategy::ALL {
            let body = Full::new(Bytes::from_static(&[0u8; 65]));
            let err = state.drain(strategy, body).await.unwrap_err();
            assert!(matches!(err, Error::BodyTooLarge { limit: 64 }), "{}", strategy);
        }
    }
}
