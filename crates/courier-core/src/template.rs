//! The messaging template: the public sending surface.
//!
//! A [`CourierTemplate`] composes the schema resolver and the sender factory
//! into one entry point for publishing. Each template instance is bound to a
//! single payload type `T`; cloning a template is cheap (it shares the
//! factory and resolver).
//!
//! ## Examples
//!
//! ```ignore
//! use courier_core::CourierTemplate;
//!
//! let template = CourierTemplate::new(factory);
//!
//! // Simple send to the factory's default topic.
//! let id = template.send("hello".to_string()).await?;
//!
//! // Fluent form with per-call configuration.
//! let id = template
//!     .new_message("hello".to_string())
//!     .topic("greetings")
//!     .customize_message(|m| m.key = Some("k1".to_string()))
//!     .send()
//!     .await?;
//! ```

use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::{error, trace};

use crate::client::{SenderConfig, SenderCustomizerFn};
use crate::error::{CourierError, Result};
use crate::factory::SenderFactory;
use crate::message::{MessageCustomizerFn, MessageId, OutboundMessage};
use crate::resolver::{DefaultSchemaResolver, SchemaResolver};
use crate::schema::{TypeTag, WireSchema};

/// Publishes messages of one payload type through a sender factory.
///
/// Single sends resolve to one broker acknowledgement each. Batch sends
/// return a lazy stream of acknowledgements, one per input element, in input
/// order; see [`CourierTemplate::send_many`] for the sequencing contract.
pub struct CourierTemplate<T> {
    sender_factory: Arc<dyn SenderFactory<T>>,
    schema_resolver: Arc<dyn SchemaResolver>,
}

impl<T> Clone for CourierTemplate<T> {
    fn clone(&self) -> Self {
        Self {
            sender_factory: Arc::clone(&self.sender_factory),
            schema_resolver: Arc::clone(&self.schema_resolver),
        }
    }
}

impl<T: Send + Sync + 'static> CourierTemplate<T> {
    /// Template with the default schema resolver.
    pub fn new(sender_factory: Arc<dyn SenderFactory<T>>) -> Self {
        Self::with_resolver(sender_factory, Arc::new(DefaultSchemaResolver::new()))
    }

    /// Template with a caller-supplied schema resolver.
    pub fn with_resolver(
        sender_factory: Arc<dyn SenderFactory<T>>,
        schema_resolver: Arc<dyn SchemaResolver>,
    ) -> Self {
        Self {
            sender_factory,
            schema_resolver,
        }
    }

    /// Send to the factory's default topic, schema resolved from `T`.
    pub async fn send(&self, payload: T) -> Result<MessageId> {
        self.do_send(None, payload, None, None, &[]).await
    }

    /// Send to an explicit topic, schema resolved from `T`.
    pub async fn send_to(&self, topic: &str, payload: T) -> Result<MessageId> {
        self.do_send(Some(topic), payload, None, None, &[]).await
    }

    /// Send to the factory's default topic under an explicit schema.
    ///
    /// The resolver is bypassed entirely; the given schema is used verbatim.
    pub async fn send_with_schema(&self, payload: T, schema: WireSchema) -> Result<MessageId> {
        self.do_send(None, payload, Some(schema), None, &[]).await
    }

    /// Send to an explicit topic under an explicit schema.
    pub async fn send_to_with_schema(
        &self,
        topic: &str,
        payload: T,
        schema: WireSchema,
    ) -> Result<MessageId> {
        self.do_send(Some(topic), payload, Some(schema), None, &[])
            .await
    }

    /// Send a stream of payloads without a pre-resolved schema.
    ///
    /// Elements are dispatched strictly one after another: the next send
    /// starts only once the previous acknowledgement arrived. The returned
    /// stream yields one result per element in input order and ends right
    /// after the first failure (the failing element's error is the last
    /// item; nothing further is dispatched).
    pub fn send_many(
        &self,
        payloads: BoxStream<'static, T>,
    ) -> BoxStream<'static, Result<MessageId>> {
        self.do_send_many(None, payloads, None, None, Vec::new())
    }

    /// Send a stream of payloads under one pre-resolved schema.
    ///
    /// Exactly one sender is constructed for the whole batch and the stream
    /// is handed to it as a single streaming send; pipelining and failure
    /// semantics across elements are the sender's contract. Output order
    /// matches input order.
    pub fn send_many_with_schema(
        &self,
        payloads: BoxStream<'static, T>,
        schema: WireSchema,
    ) -> BoxStream<'static, Result<MessageId>> {
        self.do_send_many(None, payloads, Some(schema), None, Vec::new())
    }

    /// Start a fluent single send.
    pub fn new_message(&self, payload: T) -> SendBuilder<'_, T> {
        SendBuilder {
            template: self,
            payload,
            topic: None,
            schema: None,
            message_customizer: None,
            sender_customizer: None,
        }
    }

    /// Start a fluent batch send.
    pub fn new_messages(&self, payloads: BoxStream<'static, T>) -> SendManyBuilder<'_, T> {
        SendManyBuilder {
            template: self,
            payloads,
            topic: None,
            schema: None,
            message_customizer: None,
            sender_customizer: None,
        }
    }

    async fn do_send(
        &self,
        topic: Option<&str>,
        payload: T,
        schema: Option<WireSchema>,
        message_customizer: Option<&MessageCustomizerFn<T>>,
        sender_customizers: &[Arc<SenderCustomizerFn>],
    ) -> Result<MessageId> {
        // Resolved here for log context only; the factory stays authoritative
        // for destination resolution.
        let topic_label: String = match topic {
            Some(topic) => topic.to_owned(),
            None => self
                .sender_factory
                .default_topic()
                .unwrap_or_default()
                .to_owned(),
        };

        let schema = match schema {
            Some(schema) => schema,
            None => self
                .schema_resolver
                .resolve_type(TypeTag::of::<T>(), true)
                .ok_or_else(|| {
                    CourierError::SchemaUnresolved(format!(
                        "no schema mapping for payload type {}",
                        std::any::type_name::<T>()
                    ))
                })?,
        };

        let sender = self
            .sender_factory
            .create_sender(topic, &schema, sender_customizers)
            .await?;

        let mut message = OutboundMessage::new(payload);
        if let Some(customize) = message_customizer {
            customize(&mut message);
        }

        match sender.send(message).await {
            Ok(id) => {
                trace!(topic = %topic_label, message_id = %id, "message sent");
                Ok(id)
            }
            Err(source) => {
                let err = CourierError::SendFailed {
                    topic: topic_label.clone(),
                    source,
                };
                error!(topic = %topic_label, error = %err, "failed to send message");
                Err(err)
            }
        }
    }

    fn do_send_many(
        &self,
        topic: Option<String>,
        payloads: BoxStream<'static, T>,
        schema: Option<WireSchema>,
        message_customizer: Option<Arc<MessageCustomizerFn<T>>>,
        sender_customizers: Vec<Arc<SenderCustomizerFn>>,
    ) -> BoxStream<'static, Result<MessageId>> {
        match schema {
            // One sender for the whole batch; the sender primitive owns
            // pipelining and cross-element failure semantics.
            Some(schema) => {
                let factory = Arc::clone(&self.sender_factory);
                stream::once(async move {
                    let topic_label: String = match &topic {
                        Some(topic) => topic.clone(),
                        None => factory.default_topic().unwrap_or_default().to_owned(),
                    };
                    match factory
                        .create_sender(topic.as_deref(), &schema, &sender_customizers)
                        .await
                    {
                        Ok(sender) => {
                            let messages = payloads
                                .map(move |payload| {
                                    let mut message = OutboundMessage::new(payload);
                                    if let Some(customize) = &message_customizer {
                                        customize(&mut message);
                                    }
                                    message
                                })
                                .boxed();
                            sender
                                .send_many(messages)
                                .map(move |result| match result {
                                    Ok(id) => {
                                        trace!(topic = %topic_label, message_id = %id, "message sent");
                                        Ok(id)
                                    }
                                    Err(source) => {
                                        let err = CourierError::SendFailed {
                                            topic: topic_label.clone(),
                                            source,
                                        };
                                        error!(topic = %topic_label, error = %err, "failed to send message");
                                        Err(err)
                                    }
                                })
                                .boxed()
                        }
                        Err(e) => stream::once(future::ready(Err(e))).boxed(),
                    }
                })
                .flatten()
                .boxed()
            }
            // No up-front schema: each element may resolve differently, so
            // every element goes through the single-send path, strictly in
            // sequence. A failure ends the stream without dispatching the
            // next element.
            None => {
                let template = self.clone();
                stream::unfold(
                    (template, payloads, topic, message_customizer, sender_customizers, false),
                    |(template, mut payloads, topic, customizer, sender_customizers, failed)| async move {
                        if failed {
                            return None;
                        }
                        let payload = payloads.next().await?;
                        let result = template
                            .do_send(
                                topic.as_deref(),
                                payload,
                                None,
                                customizer.as_deref(),
                                &sender_customizers,
                            )
                            .await;
                        let failed = result.is_err();
                        Some((
                            result,
                            (template, payloads, topic, customizer, sender_customizers, failed),
                        ))
                    },
                )
                .boxed()
            }
        }
    }
}

/// Single-use fluent builder for one message.
///
/// Created by [`CourierTemplate::new_message`]; consumed by
/// [`SendBuilder::send`]. Calling a setter twice keeps the later value.
pub struct SendBuilder<'a, T> {
    template: &'a CourierTemplate<T>,
    payload: T,
    topic: Option<String>,
    schema: Option<WireSchema>,
    message_customizer: Option<Box<MessageCustomizerFn<T>>>,
    sender_customizer: Option<Arc<SenderCustomizerFn>>,
}

impl<'a, T: Send + Sync + 'static> SendBuilder<'a, T> {
    /// Destination topic for this send.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Explicit schema for this send; bypasses the resolver.
    pub fn schema(mut self, schema: WireSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Mutate the outbound message right before dispatch.
    pub fn customize_message<F>(mut self, customize: F) -> Self
    where
        F: Fn(&mut OutboundMessage<T>) + Send + Sync + 'static,
    {
        self.message_customizer = Some(Box::new(customize));
        self
    }

    /// Mutate the sender configuration before the sender is built.
    pub fn customize_sender<F>(mut self, customize: F) -> Self
    where
        F: Fn(&mut SenderConfig) + Send + Sync + 'static,
    {
        self.sender_customizer = Some(Arc::new(customize));
        self
    }

    /// Dispatch the message.
    pub async fn send(self) -> Result<MessageId> {
        let SendBuilder {
            template,
            payload,
            topic,
            schema,
            message_customizer,
            sender_customizer,
        } = self;
        let sender_customizers: Vec<Arc<SenderCustomizerFn>> =
            sender_customizer.into_iter().collect();
        template
            .do_send(
                topic.as_deref(),
                payload,
                schema,
                message_customizer.as_deref(),
                &sender_customizers,
            )
            .await
    }
}

/// Single-use fluent builder for a batch send.
///
/// Created by [`CourierTemplate::new_messages`]; consumed by
/// [`SendManyBuilder::send`]. The message customizer, when set, is applied
/// to every element.
pub struct SendManyBuilder<'a, T> {
    template: &'a CourierTemplate<T>,
    payloads: BoxStream<'static, T>,
    topic: Option<String>,
    schema: Option<WireSchema>,
    message_customizer: Option<Arc<MessageCustomizerFn<T>>>,
    sender_customizer: Option<Arc<SenderCustomizerFn>>,
}

impl<'a, T: Send + Sync + 'static> SendManyBuilder<'a, T> {
    /// Destination topic for the whole batch.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Explicit schema for the whole batch; switches the batch to the
    /// one-sender streaming path.
    pub fn schema(mut self, schema: WireSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Mutate every outbound message right before dispatch.
    pub fn customize_message<F>(mut self, customize: F) -> Self
    where
        F: Fn(&mut OutboundMessage<T>) + Send + Sync + 'static,
    {
        self.message_customizer = Some(Arc::new(customize));
        self
    }

    /// Mutate the sender configuration before the sender is built.
    pub fn customize_sender<F>(mut self, customize: F) -> Self
    where
        F: Fn(&mut SenderConfig) + Send + Sync + 'static,
    {
        self.sender_customizer = Some(Arc::new(customize));
        self
    }

    /// Dispatch the batch; results arrive lazily, in input order.
    pub fn send(self) -> BoxStream<'static, Result<MessageId>> {
        let SendManyBuilder {
            template,
            payloads,
            topic,
            schema,
            message_customizer,
            sender_customizer,
        } = self;
        template.do_send_many(
            topic,
            payloads,
            schema,
            message_customizer,
            sender_customizer.into_iter().collect(),
        )
    }
}
