pub mod config;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod server;
pub mod strategy;

pub use config::Config;
pub use error::{Error, Result};
pub use pool::{BoundedBufferPool, ClearPolicy, Lease, RecycledPool};
pub use strategy::Strategy;
