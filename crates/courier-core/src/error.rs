//! Error types for the messaging template and sender factory.
//!
//! Two layers of errors exist. [`ClientError`] is the vocabulary of the broker
//! client seam: whatever implements [`crate::client::BrokerClient`] reports
//! failures through it. [`CourierError`] is what the template and factory
//! surface to callers; client failures are wrapped with the topic they
//! occurred on.
//!
//! ## Error Handling Strategy
//!
//! - **Pre-flight errors** (`DestinationUnresolved`, `SchemaUnresolved`):
//!   raised synchronously, before any broker interaction starts.
//! - **Dispatch errors** (`SenderCreation`, `SendFailed`): delivered through
//!   the same async completion path as success, never swallowed.
//!
//! No retry happens at this layer; retry policy belongs to the broker client.
//!
//! ## Examples
//!
//! ```ignore
//! use courier_core::{CourierError, CourierTemplate};
//!
//! match template.send(payload).await {
//!     Ok(id) => println!("acknowledged as {}", id),
//!     Err(CourierError::DestinationUnresolved) => {
//!         eprintln!("no topic given and no default configured");
//!     }
//!     Err(e) => eprintln!("send failed: {}", e),
//! }
//! ```

use std::time::Duration;

use thiserror::Error;

/// Convenience type alias for `Result<T, CourierError>`.
///
/// This is the standard Result type used throughout the template and
/// factory APIs.
pub type Result<T> = std::result::Result<T, CourierError>;

/// Convenience type alias for `Result<T, ClientError>`.
///
/// Used at the broker client seam ([`crate::client::BrokerClient`] and
/// [`crate::client::MessageSender`]).
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the template and sender factory.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Neither an explicit per-call topic nor a factory default is available.
    ///
    /// Raised before any broker interaction. Configure a default topic on the
    /// factory or pass a topic with the send call.
    #[error("no destination: no topic specified and no default topic configured")]
    DestinationUnresolved,

    /// Required schema information is missing.
    ///
    /// Either a declared schema request lacked its type declarations (a
    /// struct kind with no message type, a key-value kind missing one side),
    /// or no mapping was found for the payload type with the default
    /// fallback disabled. Raised before any sender is created.
    #[error("schema could not be resolved: {0}")]
    SchemaUnresolved(String),

    /// The broker client failed to construct a sender.
    ///
    /// Propagated as the call's failure; the factory does not retry.
    #[error("failed to create sender for topic '{topic}': {source}")]
    SenderCreation {
        topic: String,
        #[source]
        source: ClientError,
    },

    /// The broker client rejected or timed out a send.
    ///
    /// Surfaced as the failure outcome of that specific message, logged once
    /// at the point of failure.
    #[error("send to topic '{topic}' failed: {source}")]
    SendFailed {
        topic: String,
        #[source]
        source: ClientError,
    },
}

/// Errors reported by broker client implementations.
///
/// Implementations of [`crate::client::BrokerClient`] and
/// [`crate::client::MessageSender`] map their transport-level failures onto
/// these variants; the template wraps them into [`CourierError`] with topic
/// context.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not reach the broker.
    #[error("connection error: {0}")]
    Connection(String),

    /// Operation exceeded the configured timeout.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The broker received the message and refused it.
    #[error("broker rejected the message: {0}")]
    Rejected(String),

    /// The sender has already been closed.
    #[error("sender is closed")]
    SenderClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CourierError::DestinationUnresolved;
        assert_eq!(
            err.to_string(),
            "no destination: no topic specified and no default topic configured"
        );

        let err = CourierError::SendFailed {
            topic: "orders".to_string(),
            source: ClientError::Rejected("quota exceeded".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "send to topic 'orders' failed: broker rejected the message: quota exceeded"
        );
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error as _;

        let err = CourierError::SenderCreation {
            topic: "orders".to_string(),
            source: ClientError::Connection("refused".to_string()),
        };
        let source = err.source().expect("source should be present");
        assert_eq!(source.to_string(), "connection error: refused");
    }
}
