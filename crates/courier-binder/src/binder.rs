//! Binds configuration to live producer and consumer endpoints.
//!
//! A [`CourierBinder`] is the loosely coupled seam between a channel-based
//! application and the core messaging layer: outbound bindings publish
//! channel messages through a [`CourierTemplate`], inbound bindings pump a
//! raw consumer into a [`MessageChannel`]. Schema declarations are resolved
//! when the binding is established, so a bad declaration fails the bind
//! rather than the first send.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use courier_core::{
    BrokerClient, CachingSenderFactory, CourierTemplate, DefaultSchemaResolver, SchemaKind,
    SchemaResolver, SchemaSpec, WireSchema,
};

use crate::channel::{ChannelMessage, MessageChannel};
use crate::config::{BinderConfig, BindingConfig};
use crate::error::{BinderError, Result};
use crate::listener::{InboundBridge, RawConsumer};

/// Establishes bindings against one broker client.
///
/// All bindings share the binder's schema resolver; custom mappings
/// registered on [`CourierBinder::resolver`] apply to every later bind.
pub struct CourierBinder {
    client: Arc<dyn BrokerClient<Bytes>>,
    resolver: Arc<DefaultSchemaResolver>,
    config: BinderConfig,
}

impl CourierBinder {
    pub fn new(client: Arc<dyn BrokerClient<Bytes>>, config: BinderConfig) -> Self {
        Self {
            client,
            resolver: Arc::new(DefaultSchemaResolver::new()),
            config,
        }
    }

    /// Shared schema resolver for custom mapping registration.
    pub fn resolver(&self) -> &DefaultSchemaResolver {
        &self.resolver
    }

    /// Establish an outbound binding.
    ///
    /// A schema kind declared on the binding overrides the kind in `spec`;
    /// a binding that leaves the kind unset keeps the spec's own
    /// declaration. The declared types in `spec` fill in the rest.
    pub fn bind_producer(
        &self,
        binding: &BindingConfig,
        spec: SchemaSpec,
    ) -> Result<OutboundBinding> {
        if binding.destination.is_empty() {
            return Err(BinderError::Config(
                "binding requires a destination topic".to_string(),
            ));
        }

        let spec = if binding.schema_kind == SchemaKind::None {
            spec
        } else {
            SchemaSpec {
                kind: binding.schema_kind,
                ..spec
            }
        };
        let schema = self.resolver.resolve_spec(&spec)?;

        let factory = CachingSenderFactory::builder(Arc::clone(&self.client))
            .default_topic(&binding.destination)
            .build();
        let template = CourierTemplate::with_resolver(
            Arc::new(factory),
            self.resolver.clone() as Arc<dyn SchemaResolver>,
        );

        info!(
            destination = %binding.destination,
            schema = %schema,
            partitions = self.config.partition_count,
            "outbound binding established"
        );
        Ok(OutboundBinding {
            destination: binding.destination.clone(),
            schema,
            template,
            dropped: AtomicU64::new(0),
        })
    }

    /// Establish an inbound binding over an already-subscribed consumer.
    pub fn bind_consumer(
        &self,
        binding: &BindingConfig,
        consumer: Box<dyn RawConsumer>,
        channel: Arc<dyn MessageChannel>,
    ) -> Result<InboundBinding> {
        if binding.destination.is_empty() {
            return Err(BinderError::Config(
                "binding requires a destination topic".to_string(),
            ));
        }

        info!(destination = %binding.destination, "inbound binding established");
        let bridge = InboundBridge::start(binding.destination.clone(), consumer, channel);
        Ok(InboundBinding {
            destination: binding.destination.clone(),
            bridge,
        })
    }
}

/// Live outbound endpoint for one binding.
pub struct OutboundBinding {
    destination: String,
    schema: WireSchema,
    template: CourierTemplate<Bytes>,
    dropped: AtomicU64,
}

impl OutboundBinding {
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Schema resolved when the binding was established.
    pub fn schema(&self) -> &WireSchema {
        &self.schema
    }

    /// Messages dropped after a failed send.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Publish one channel message to the binding's destination.
    ///
    /// A failed send is logged and dropped so one bad message never wedges
    /// the binding; the drop is visible through [`OutboundBinding::dropped`].
    pub async fn handle(&self, message: ChannelMessage) {
        let ChannelMessage { payload, headers } = message;
        let result = self
            .template
            .new_message(payload)
            .topic(self.destination.clone())
            .schema(self.schema.clone())
            .customize_message(move |outbound| {
                outbound.properties = headers.clone();
            })
            .send()
            .await;

        if let Err(e) = result {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                destination = %self.destination,
                error = %e,
                "dropping outbound message"
            );
        }
    }
}

/// Live inbound endpoint for one binding.
pub struct InboundBinding {
    destination: String,
    bridge: InboundBridge,
}

impl InboundBinding {
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Whether the underlying bridge task is still running.
    pub fn is_running(&self) -> bool {
        self.bridge.is_running()
    }

    /// Stop the bridge and wait for in-flight forwarding to settle.
    pub async fn stop(self) {
        self.bridge.stop().await;
    }
}
