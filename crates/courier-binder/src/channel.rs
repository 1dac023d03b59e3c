//! The channel seam between the binder and the host application.
//!
//! The binder never interprets payloads; it moves [`ChannelMessage`] values
//! across this seam as opaque bytes plus string headers. Applications plug
//! in their own [`MessageChannel`] or use the in-process [`LocalChannel`].

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{BinderError, Result};

/// A message crossing the binder boundary, payload left uninterpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMessage {
    pub payload: Bytes,
    pub headers: HashMap<String, String>,
}

impl ChannelMessage {
    /// Message with no headers.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            headers: HashMap::new(),
        }
    }

    /// Attach one header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Application-facing delivery target for inbound messages.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Deliver one message. An error means the channel can no longer accept
    /// messages and the caller should stop feeding it.
    async fn dispatch(&self, message: ChannelMessage) -> Result<()>;
}

/// In-process channel backed by a bounded tokio queue.
pub struct LocalChannel {
    tx: mpsc::Sender<ChannelMessage>,
}

impl LocalChannel {
    /// Channel plus its receiving half.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ChannelMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl MessageChannel for LocalChannel {
    async fn dispatch(&self, message: ChannelMessage) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| BinderError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_channel_delivers_in_order() {
        let (channel, mut rx) = LocalChannel::new(4);

        channel
            .dispatch(ChannelMessage::new("first".as_bytes().to_vec()))
            .await
            .unwrap();
        channel
            .dispatch(
                ChannelMessage::new("second".as_bytes().to_vec()).with_header("seq", "2"),
            )
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.payload, Bytes::from_static(b"first"));
        assert!(first.headers.is_empty());

        let second = rx.recv().await.unwrap();
        assert_eq!(second.payload, Bytes::from_static(b"second"));
        assert_eq!(second.headers.get("seq").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn test_dispatch_after_receiver_dropped_is_channel_closed() {
        let (channel, rx) = LocalChannel::new(4);
        drop(rx);

        let err = channel
            .dispatch(ChannelMessage::new(vec![1u8, 2, 3]))
            .await
            .unwrap_err();
        assert!(matches!(err, BinderError::ChannelClosed));
    }
}
