//! Error types for the binder layer.

use courier_core::CourierError;
use thiserror::Error;

/// Convenience alias for binder operations.
pub type Result<T> = std::result::Result<T, BinderError>;

/// Errors surfaced while establishing or operating a binding.
#[derive(Error, Debug)]
pub enum BinderError {
    /// The binding configuration is unusable as written.
    #[error("invalid binding configuration: {0}")]
    Config(String),

    /// The consuming side of a channel went away.
    #[error("channel closed before the message could be delivered")]
    ChannelClosed,

    /// Failure bubbled up from the core messaging layer.
    #[error(transparent)]
    Core(#[from] CourierError),
}
