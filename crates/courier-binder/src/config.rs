//! Binder and binding configuration.
//!
//! Both structs deserialize from the host application's config format;
//! every field that has a sensible default is optional in the source
//! document.

use courier_core::SchemaKind;
use serde::{Deserialize, Serialize};

/// Binder-wide settings, shared by every binding it establishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinderConfig {
    /// Partitions provisioned per destination. Brokers without a partition
    /// concept treat this as informational.
    #[serde(default = "default_partition_count")]
    pub partition_count: u32,
}

fn default_partition_count() -> u32 {
    1
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            partition_count: default_partition_count(),
        }
    }
}

/// Settings for one producer or consumer binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Destination topic. Required; an empty destination fails the bind.
    pub destination: String,

    /// Declared schema kind. `none` lets the resolver infer the kind from
    /// the declared types at bind time.
    #[serde(default)]
    pub schema_kind: SchemaKind,
}

impl BindingConfig {
    /// Binding for a destination with no declared schema kind.
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            schema_kind: SchemaKind::None,
        }
    }

    /// Declare the schema kind for this binding.
    pub fn with_schema_kind(mut self, kind: SchemaKind) -> Self {
        self.schema_kind = kind;
        self
    }
}
