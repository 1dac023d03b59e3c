//! Broker client seam.
//!
//! The dispatch pipeline never talks to a broker directly; it drives these
//! traits. A [`BrokerClient`] owns connections and constructs senders; a
//! [`MessageSender`] is bound to one destination and one schema and moves
//! messages. Implementations adapt a concrete broker library (or an
//! in-memory double in tests) onto this surface.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ClientResult;
use crate::message::{MessageId, OutboundMessage};
use crate::schema::WireSchema;

/// Sender-level configuration assembled from customizers before construction.
///
/// Customizers are applied in the order supplied; each may overwrite what an
/// earlier one set, so the last write wins on conflicting options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderConfig {
    /// Identity the sender announces to the broker.
    pub name: Option<String>,

    /// Per-send timeout enforced by the client.
    pub send_timeout: Option<Duration>,

    /// Whether the client may batch messages for this sender.
    pub batching_enabled: Option<bool>,
}

/// Callback mutating sender configuration before the sender is built.
pub type SenderCustomizerFn = dyn Fn(&mut SenderConfig) + Send + Sync;

/// A sender bound to one destination and one schema.
#[async_trait]
pub trait MessageSender<T>: Send + Sync {
    /// Send one message, resolving once with the broker-assigned id.
    async fn send(&self, message: OutboundMessage<T>) -> ClientResult<MessageId>;

    /// Send a stream of messages.
    ///
    /// Identifiers are produced lazily, one per input element, in input
    /// order. The sender may pipeline elements internally; failure semantics
    /// across the stream are the implementation's contract.
    fn send_many(
        &self,
        messages: BoxStream<'static, OutboundMessage<T>>,
    ) -> BoxStream<'static, ClientResult<MessageId>>;

    /// Release broker-side resources held by this sender. Idempotent.
    async fn close(&self);
}

/// Connection-owning client able to construct senders.
#[async_trait]
pub trait BrokerClient<T>: Send + Sync {
    /// Build a sender for the topic under the given schema and configuration.
    async fn create_sender(
        &self,
        topic: &str,
        schema: &WireSchema,
        config: SenderConfig,
    ) -> ClientResult<Arc<dyn MessageSender<T>>>;
}
