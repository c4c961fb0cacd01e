use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};

use crate::error::{Error, Result};
use crate::pool::ClearPolicy;

/// Size in bytes of one request body buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 2048;

/// Number of slots in the bounded pool.
pub const DEFAULT_SLOTS: usize = 10;

/// pool-perf - compare buffer reuse strategies for HTTP request bodies
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Network binding address
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Capacity in bytes of every request body buffer
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,

    /// Number of slots in the bounded pool
    #[arg(short, long, default_value_t = DEFAULT_SLOTS)]
    pub slots: usize,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    pub max_connections: usize,

    /// Who clears bounded pool buffers between uses
    #[arg(long, value_enum, default_value_t = ClearPolicy::Caller)]
    pub bounded_clear: ClearPolicy,

    /// Who clears recycled pool buffers between uses
    #[arg(long, value_enum, default_value_t = ClearPolicy::OnRelease)]
    pub recycled_clear: ClearPolicy,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse_args() -> Self {
        Config::parse()
    }

    /// Reject settings the pools cannot be built with.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::InvalidArgument(
                "buffer size must be greater than zero".to_string(),
            ));
        }
        if self.slots == 0 {
            return Err(Error::InvalidArgument(
                "slot count must be greater than zero".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(Error::InvalidArgument(
                "max connections must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            buffer_size: DEFAULT_BUFFER_SIZE,
            slots: DEFAULT_SLOTS,
            max_connections: 10_000,
            bounded_clear: ClearPolicy::Caller,
            recycled_clear: ClearPolicy::OnRelease,
            log_level: "info".to_string(),
        }
    }
}
