//! Core messaging layer for Courier.
//!
//! This crate provides the sending side of the Courier messaging stack:
//! schema resolution from payload types, cached sender construction, and a
//! high-level template for single and batch publishing over any broker
//! client that implements [`BrokerClient`].
//!
//! ## Architecture
//!
//! ```text
//! CourierTemplate<T>
//!     |-- SchemaResolver      payload type -> wire schema
//!     |-- SenderFactory<T>    topic + schema -> cached MessageSender<T>
//!             |-- SenderCache<T>
//!             |-- BrokerClient<T>
//! ```
//!
//! ## Examples
//!
//! ```ignore
//! use std::sync::Arc;
//! use courier_core::{CachingSenderFactory, CourierTemplate};
//!
//! let factory = Arc::new(
//!     CachingSenderFactory::builder(client)
//!         .default_topic("greetings")
//!         .build(),
//! );
//! let template = CourierTemplate::new(factory);
//!
//! let id = template.send("hello".to_string()).await?;
//! println!("acknowledged as {id}");
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod factory;
pub mod message;
pub mod resolver;
pub mod schema;
pub mod template;

pub use cache::{SenderCache, SenderKey};
pub use client::{BrokerClient, MessageSender, SenderConfig, SenderCustomizerFn};
pub use error::{ClientError, ClientResult, CourierError, Result};
pub use factory::{CachingSenderFactory, SenderFactory, SenderFactoryBuilder};
pub use message::{MessageCustomizerFn, MessageId, OutboundMessage};
pub use resolver::{DefaultSchemaResolver, SchemaResolver};
pub use schema::{SchemaKind, SchemaSpec, TypeTag, WireSchema};
pub use template::{CourierTemplate, SendBuilder, SendManyBuilder};
