//! Channel binder over the Courier core messaging layer.
//!
//! The binder connects channel-based applications to a broker without
//! coupling either side to the other: outbound, it publishes opaque channel
//! messages through a `courier_core` template; inbound, it pumps a raw
//! consumer into an application-provided channel. Schema declarations are
//! resolved at bind time, so misconfigured bindings fail immediately.
//!
//! ## Examples
//!
//! ```ignore
//! use courier_binder::{BinderConfig, BindingConfig, CourierBinder, LocalChannel};
//! use courier_core::SchemaSpec;
//!
//! let binder = CourierBinder::new(client, BinderConfig::default());
//!
//! // Outbound: channel messages flow to the "orders" topic as raw bytes.
//! let binding = BindingConfig::new("orders");
//! let outbound = binder.bind_producer(&binding, SchemaSpec::of_bytes())?;
//! outbound.handle(message).await;
//!
//! // Inbound: broker messages flow into a local channel untouched.
//! let (channel, mut rx) = LocalChannel::new(64);
//! let inbound = binder.bind_consumer(&binding, consumer, Arc::new(channel))?;
//! while let Some(message) = rx.recv().await {
//!     // deserialize and process
//! }
//! inbound.stop().await;
//! ```

pub mod binder;
pub mod channel;
pub mod config;
pub mod error;
pub mod listener;

pub use binder::{CourierBinder, InboundBinding, OutboundBinding};
pub use channel::{ChannelMessage, LocalChannel, MessageChannel};
pub use config::{BinderConfig, BindingConfig};
pub use error::{BinderError, Result};
pub use listener::{InboundBridge, RawConsumer, RawMessage};
