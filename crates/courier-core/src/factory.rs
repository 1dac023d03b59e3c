//! Sender construction and reuse.
//!
//! The template obtains senders through the [`SenderFactory`] seam; the
//! default implementation, [`CachingSenderFactory`], resolves the effective
//! destination (explicit per-call topic first, factory default second),
//! applies sender customizers in order, and reuses previously constructed
//! senders through a [`SenderCache`].
//!
//! ## Examples
//!
//! ```ignore
//! use courier_core::CachingSenderFactory;
//!
//! let factory = CachingSenderFactory::builder(client)
//!     .default_topic("greetings")
//!     .idle_timeout(Duration::from_secs(30))
//!     .build();
//!
//! let sender = factory.create_sender(None, &WireSchema::Text, &[]).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::{SenderCache, SenderKey};
use crate::client::{BrokerClient, MessageSender, SenderConfig, SenderCustomizerFn};
use crate::error::{CourierError, Result};
use crate::schema::WireSchema;

/// Produces ready-to-use senders for the template.
///
/// `create_sender` must fail with [`CourierError::DestinationUnresolved`]
/// when `topic` is `None` and no default destination is configured, before
/// any broker interaction.
#[async_trait]
pub trait SenderFactory<T>: Send + Sync {
    /// Resolve the destination and return a sender bound to it.
    ///
    /// Customizers are applied to the sender configuration in the order
    /// supplied; the last write wins on conflicting options.
    async fn create_sender(
        &self,
        topic: Option<&str>,
        schema: &WireSchema,
        customizers: &[Arc<SenderCustomizerFn>],
    ) -> Result<Arc<dyn MessageSender<T>>>;

    /// Factory-level default destination, if one is configured.
    fn default_topic(&self) -> Option<&str>;
}

/// Caching factory over a broker client.
///
/// At most one live sender exists per destination + schema + customizer
/// identity; see [`SenderKey`] for how customizer identity is derived. Idle
/// senders are released through [`CachingSenderFactory::evict_idle`] or
/// [`CachingSenderFactory::close_all`].
pub struct CachingSenderFactory<T> {
    client: Arc<dyn BrokerClient<T>>,
    default_topic: Option<String>,
    cache: SenderCache<T>,
}

impl<T: Send + Sync + 'static> CachingSenderFactory<T> {
    /// Factory with no default topic and a 60s idle timeout.
    pub fn new(client: Arc<dyn BrokerClient<T>>) -> Self {
        Self::builder(client).build()
    }

    /// Create a `SenderFactoryBuilder` for custom configuration.
    pub fn builder(client: Arc<dyn BrokerClient<T>>) -> SenderFactoryBuilder<T> {
        SenderFactoryBuilder::new(client)
    }

    fn resolve_topic(&self, topic: Option<&str>) -> Result<String> {
        topic
            .map(str::to_owned)
            .or_else(|| self.default_topic.clone())
            .ok_or(CourierError::DestinationUnresolved)
    }

    /// Evict idle, unreferenced senders. Returns how many were closed.
    pub async fn evict_idle(&self) -> usize {
        self.cache.evict_idle().await
    }

    /// Close every cached sender. Called during graceful shutdown.
    pub async fn close_all(&self) {
        self.cache.close_all().await
    }

    /// Cache statistics: `(entries, in_use)`.
    pub async fn stats(&self) -> (usize, usize) {
        self.cache.stats().await
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> SenderFactory<T> for CachingSenderFactory<T> {
    async fn create_sender(
        &self,
        topic: Option<&str>,
        schema: &WireSchema,
        customizers: &[Arc<SenderCustomizerFn>],
    ) -> Result<Arc<dyn MessageSender<T>>> {
        let topic = self.resolve_topic(topic)?;

        let key = SenderKey::with_customizers(topic.clone(), schema.clone(), customizers.to_vec());

        if let Some(sender) = self.cache.get(&key).await {
            return Ok(sender);
        }

        let mut config = SenderConfig::default();
        for customizer in customizers {
            customizer(&mut config);
        }

        debug!(topic = %topic, schema = %schema, "creating sender");
        let sender = self
            .client
            .create_sender(&topic, schema, config)
            .await
            .map_err(|source| CourierError::SenderCreation {
                topic: topic.clone(),
                source,
            })?;

        Ok(self.cache.insert_or_existing(key, sender).await)
    }

    fn default_topic(&self) -> Option<&str> {
        self.default_topic.as_deref()
    }
}

/// Builder for [`CachingSenderFactory`].
pub struct SenderFactoryBuilder<T> {
    client: Arc<dyn BrokerClient<T>>,

    /// Destination used when a send specifies none (default: unset).
    default_topic: Option<String>,

    /// Idle timeout for cached senders (default: 60s).
    idle_timeout: Duration,
}

impl<T: Send + Sync + 'static> SenderFactoryBuilder<T> {
    fn new(client: Arc<dyn BrokerClient<T>>) -> Self {
        Self {
            client,
            default_topic: None,
            idle_timeout: Duration::from_secs(60),
        }
    }

    /// Set the factory-level default destination.
    pub fn default_topic(mut self, topic: impl Into<String>) -> Self {
        self.default_topic = Some(topic.into());
        self
    }

    /// Set the idle timeout for cached senders.
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn build(self) -> CachingSenderFactory<T> {
        CachingSenderFactory {
            client: self.client,
            default_topic: self.default_topic,
            cache: SenderCache::new(self.idle_timeout),
        }
    }
}
