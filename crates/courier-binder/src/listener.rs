//! Inbound bridge: pumps raw broker messages into a channel.
//!
//! The bridge runs as a background task owned by its binding. It reads from
//! a [`RawConsumer`] and forwards each message to a [`MessageChannel`]
//! untouched; deserialization belongs to the application behind the
//! channel. The task stops on a control signal, on consumer exhaustion, on
//! a consumer error, or when the channel rejects a delivery.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use courier_core::ClientResult;

use crate::channel::{ChannelMessage, MessageChannel};

/// A message exactly as read off the broker.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Topic the message arrived on.
    pub topic: String,
    /// Undecoded payload bytes.
    pub payload: Bytes,
    /// Broker-level message properties.
    pub properties: HashMap<String, String>,
}

impl RawMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            properties: HashMap::new(),
        }
    }
}

/// Pull-based source of raw messages, typically a broker subscription.
#[async_trait]
pub trait RawConsumer: Send {
    /// Next message; `Ok(None)` once the subscription is exhausted.
    async fn next(&mut self) -> ClientResult<Option<RawMessage>>;
}

/// Control messages understood by a running bridge task.
enum ControlSignal {
    Stop,
}

/// Handle to a background pump from a consumer into a channel.
pub struct InboundBridge {
    binding: String,
    control_tx: mpsc::Sender<ControlSignal>,
    handle: JoinHandle<()>,
}

impl InboundBridge {
    /// Spawn the pump loop for a binding.
    pub fn start(
        binding: impl Into<String>,
        mut consumer: Box<dyn RawConsumer>,
        channel: Arc<dyn MessageChannel>,
    ) -> Self {
        let binding = binding.into();
        let (control_tx, mut control_rx) = mpsc::channel(4);

        let task_binding = binding.clone();
        let handle = tokio::spawn(async move {
            info!(binding = %task_binding, "inbound bridge started");
            loop {
                tokio::select! {
                    signal = control_rx.recv() => match signal {
                        Some(ControlSignal::Stop) | None => {
                            info!(binding = %task_binding, "inbound bridge stopping");
                            break;
                        }
                    },
                    message = consumer.next() => match message {
                        Ok(Some(raw)) => {
                            debug!(
                                binding = %task_binding,
                                topic = %raw.topic,
                                bytes = raw.payload.len(),
                                "forwarding message"
                            );
                            let forwarded = ChannelMessage {
                                payload: raw.payload,
                                headers: raw.properties,
                            };
                            if let Err(e) = channel.dispatch(forwarded).await {
                                warn!(
                                    binding = %task_binding,
                                    error = %e,
                                    "channel rejected message, stopping bridge"
                                );
                                break;
                            }
                        }
                        Ok(None) => {
                            info!(binding = %task_binding, "consumer exhausted, stopping bridge");
                            break;
                        }
                        Err(e) => {
                            error!(binding = %task_binding, error = %e, "consumer failed, stopping bridge");
                            break;
                        }
                    },
                }
            }
        });

        Self {
            binding,
            control_tx,
            handle,
        }
    }

    /// Binding this bridge serves.
    pub fn binding(&self) -> &str {
        &self.binding
    }

    /// Whether the pump task is still running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Ask the pump to stop and wait for it to finish.
    pub async fn stop(self) {
        // The task may already have exited on its own; a rejected signal is
        // expected then.
        let _ = self.control_tx.send(ControlSignal::Stop).await;
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LocalChannel;
    use courier_core::ClientError;
    use std::collections::VecDeque;
    use std::time::Duration;

    struct ScriptedConsumer {
        messages: VecDeque<ClientResult<Option<RawMessage>>>,
    }

    impl ScriptedConsumer {
        fn of(messages: Vec<RawMessage>) -> Box<Self> {
            Box::new(Self {
                messages: messages.into_iter().map(|m| Ok(Some(m))).collect(),
            })
        }
    }

    #[async_trait]
    impl RawConsumer for ScriptedConsumer {
        async fn next(&mut self) -> ClientResult<Option<RawMessage>> {
            self.messages.pop_front().unwrap_or(Ok(None))
        }
    }

    /// Yields its script, then pends forever like an idle subscription.
    struct StallingConsumer {
        messages: VecDeque<RawMessage>,
    }

    #[async_trait]
    impl RawConsumer for StallingConsumer {
        async fn next(&mut self) -> ClientResult<Option<RawMessage>> {
            match self.messages.pop_front() {
                Some(message) => Ok(Some(message)),
                None => futures::future::pending().await,
            }
        }
    }

    #[tokio::test]
    async fn test_bridge_forwards_in_order_until_exhaustion() {
        let (channel, mut rx) = LocalChannel::new(8);
        let consumer = ScriptedConsumer::of(vec![
            RawMessage::new("orders", b"m1".to_vec()),
            RawMessage::new("orders", b"m2".to_vec()),
            RawMessage::new("orders", b"m3".to_vec()),
        ]);

        let bridge = InboundBridge::start("orders-in", consumer, Arc::new(channel));

        for expected in ["m1", "m2", "m3"] {
            let message = rx.recv().await.unwrap();
            assert_eq!(message.payload, Bytes::from(expected.as_bytes().to_vec()));
        }

        // Exhaustion stops the task; stop() afterwards is a no-op join.
        bridge.stop().await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_bridge_preserves_properties_as_headers() {
        let (channel, mut rx) = LocalChannel::new(4);
        let mut raw = RawMessage::new("orders", b"payload".to_vec());
        raw.properties
            .insert("content-type".to_string(), "text/plain".to_string());

        let bridge = InboundBridge::start("orders-in", ScriptedConsumer::of(vec![raw]), Arc::new(channel));

        let message = rx.recv().await.unwrap();
        assert_eq!(
            message.headers.get("content-type").map(String::as_str),
            Some("text/plain")
        );
        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_stop_interrupts_idle_consumer() {
        let (channel, mut rx) = LocalChannel::new(4);
        let consumer = Box::new(StallingConsumer {
            messages: vec![RawMessage::new("orders", b"only".to_vec())].into(),
        });

        let bridge = InboundBridge::start("orders-in", consumer, Arc::new(channel));
        assert_eq!(bridge.binding(), "orders-in");

        let message = rx.recv().await.unwrap();
        assert_eq!(message.payload, Bytes::from_static(b"only"));

        // The consumer now pends forever; stop must still complete quickly.
        tokio::time::timeout(Duration::from_secs(1), bridge.stop())
            .await
            .expect("bridge stop timed out");
    }

    #[tokio::test]
    async fn test_bridge_stops_when_channel_closes() {
        let (channel, rx) = LocalChannel::new(4);
        let consumer = Box::new(StallingConsumer {
            messages: vec![
                RawMessage::new("orders", b"m1".to_vec()),
                RawMessage::new("orders", b"m2".to_vec()),
            ]
            .into(),
        });

        drop(rx);
        let bridge = InboundBridge::start("orders-in", consumer, Arc::new(channel));

        // First dispatch fails, the task exits on its own.
        tokio::time::timeout(Duration::from_secs(1), bridge.handle)
            .await
            .expect("bridge task did not exit")
            .unwrap();
    }

    #[tokio::test]
    async fn test_bridge_stops_on_consumer_error() {
        let (channel, mut rx) = LocalChannel::new(4);
        let consumer = Box::new(ScriptedConsumer {
            messages: vec![
                Ok(Some(RawMessage::new("orders", b"good".to_vec()))),
                Err(ClientError::Connection("broker went away".to_string())),
            ]
            .into(),
        });

        let bridge = InboundBridge::start("orders-in", consumer, Arc::new(channel));

        let message = rx.recv().await.unwrap();
        assert_eq!(message.payload, Bytes::from_static(b"good"));

        tokio::time::timeout(Duration::from_secs(1), bridge.handle)
            .await
            .expect("bridge task did not exit")
            .unwrap();
        assert!(rx.recv().await.is_none());
    }
}
