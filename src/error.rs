use std::collections::TryReserveError;
use std::fmt;
use std::io;

/// Boxed error produced by an HTTP body stream.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for pool-perf operations
#[derive(Debug)]
pub enum Error {
    /// I/O error from listener or socket operations
    Io(io::Error),

    /// Invalid construction argument (zero slots, zero buffer size)
    InvalidArgument(String),

    /// Pre-allocating a pool buffer failed
    Allocation(TryReserveError),

    /// Reading the request body failed before end-of-stream
    Body(BoxError),

    /// Request body does not fit in the buffer
    BodyTooLarge { limit: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::Allocation(e) => write!(f, "Buffer allocation failed: {}", e),
            Error::Body(e) => write!(f, "Body read error: {}", e),
            Error::BodyTooLarge { limit } => {
                write!(f, "Request body exceeds buffer capacity of {} bytes", limit)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Allocation(e) => Some(e),
            Error::Body(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<TryReserveError> for Error {
    fn from(e: TryReserveError) -> Self {
        Error::Allocation(e)
    }
}

/// Result type alias for pool-perf operations
pub type Result<T> = std::result::Result<T, Error>;
