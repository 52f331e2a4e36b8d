//! Error types for the HTTP boundary.

use smol_str::SmolStr;
use thiserror::Error;

/// Failures starting or configuring the server.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The listen address could not be bound.
    #[error("cannot bind {listen}: {message}")]
    Bind {
        /// Requested address.
        listen: SmolStr,
        /// Reason reported by the socket layer.
        message: SmolStr,
    },

    /// The configuration file is unreadable or holds bad values.
    #[error("invalid config: {0}")]
    InvalidConfig(SmolStr),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
