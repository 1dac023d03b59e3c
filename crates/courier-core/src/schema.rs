//! Wire-schema descriptors and payload-type identification.
//!
//! A [`WireSchema`] says how a payload is encoded on the wire. Payload types
//! are identified by [`TypeTag`] values (a `TypeId` plus the static type
//! name), so no runtime reflection is involved anywhere: whoever owns the
//! concrete type constructs the tag with [`TypeTag::of`].
//!
//! The built-in payload-type table lives here as well. It is fixed at
//! initialization and checked before any custom mapping (see
//! [`crate::resolver::DefaultSchemaResolver`] for the full lookup order).

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Identifies a payload type without runtime reflection.
///
/// Wraps `std::any::TypeId` together with the type's static name for
/// diagnostics. Tags are cheap to copy and compare.
///
/// # Examples
///
/// ```ignore
/// let tag = TypeTag::of::<String>();
/// assert_eq!(tag, TypeTag::of::<String>());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Tag for the concrete type `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The static type name, e.g. `alloc::string::String`.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Wire-encoding descriptor for a payload.
///
/// Once resolved for a send, the descriptor is immutable for that send's
/// lifetime. Descriptors are hashable so they can key the sender cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WireSchema {
    /// Raw byte passthrough (`Vec<u8>`); also the configurable default.
    Bytes,
    /// Byte-buffer passthrough (`bytes::Bytes`).
    ByteBuffer,
    /// UTF-8 text.
    Text,
    Int8,
    Int16,
    Int32,
    Int64,
    Bool,
    Float32,
    Float64,
    /// Epoch-based timestamp (`std::time::SystemTime`).
    Timestamp,
    /// Timezone-aware instant (`chrono::DateTime<Utc>`).
    Instant,
    LocalDate,
    LocalDateTime,
    LocalTime,
    /// Schema-object encoding for a single declared payload type.
    Struct(TypeTag),
    /// Paired composite of two independently-schemed parts.
    KeyValue(Box<WireSchema>, Box<WireSchema>),
}

impl WireSchema {
    /// Struct schema for the concrete type `T`.
    pub fn struct_of<T: 'static>() -> Self {
        WireSchema::Struct(TypeTag::of::<T>())
    }

    /// Key-value composite of two schemas.
    pub fn key_value(key: WireSchema, value: WireSchema) -> Self {
        WireSchema::KeyValue(Box::new(key), Box::new(value))
    }
}

impl fmt::Display for WireSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireSchema::Bytes => write!(f, "bytes"),
            WireSchema::ByteBuffer => write!(f, "byte_buffer"),
            WireSchema::Text => write!(f, "text"),
            WireSchema::Int8 => write!(f, "int8"),
            WireSchema::Int16 => write!(f, "int16"),
            WireSchema::Int32 => write!(f, "int32"),
            WireSchema::Int64 => write!(f, "int64"),
            WireSchema::Bool => write!(f, "bool"),
            WireSchema::Float32 => write!(f, "float32"),
            WireSchema::Float64 => write!(f, "float64"),
            WireSchema::Timestamp => write!(f, "timestamp"),
            WireSchema::Instant => write!(f, "instant"),
            WireSchema::LocalDate => write!(f, "local_date"),
            WireSchema::LocalDateTime => write!(f, "local_date_time"),
            WireSchema::LocalTime => write!(f, "local_time"),
            WireSchema::Struct(tag) => write!(f, "struct<{}>", tag),
            WireSchema::KeyValue(key, value) => write!(f, "key_value<{}, {}>", key, value),
        }
    }
}

/// Schema kinds understood by configuration surfaces.
///
/// This is the vocabulary binders consume from config files; it is kept
/// deliberately small and stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// No kind declared; the resolver infers one from the declared types.
    #[default]
    None,
    /// Raw byte passthrough.
    Bytes,
    /// Single declared payload type.
    Struct,
    /// Declared key type plus declared value type.
    KeyValue,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::None => write!(f, "none"),
            SchemaKind::Bytes => write!(f, "bytes"),
            SchemaKind::Struct => write!(f, "struct"),
            SchemaKind::KeyValue => write!(f, "key_value"),
        }
    }
}

/// A declared schema request: a kind plus the type declarations backing it.
///
/// Used by binding layers that know the schema kind from configuration and
/// the payload types from code. Validation happens in
/// [`crate::resolver::SchemaResolver::resolve_spec`], which fails fast when a
/// kind's required declarations are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaSpec {
    pub kind: SchemaKind,
    pub message_type: Option<TypeTag>,
    pub key_type: Option<TypeTag>,
    pub value_type: Option<TypeTag>,
}

impl SchemaSpec {
    /// An empty request of the given kind.
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            message_type: None,
            key_type: None,
            value_type: None,
        }
    }

    /// Struct request for the concrete type `T`.
    pub fn of_struct<T: 'static>() -> Self {
        Self::new(SchemaKind::Struct).with_message_type::<T>()
    }

    /// Key-value request for the concrete types `K` and `V`.
    pub fn of_key_value<K: 'static, V: 'static>() -> Self {
        Self::new(SchemaKind::KeyValue)
            .with_key_type::<K>()
            .with_value_type::<V>()
    }

    /// Byte-passthrough request.
    pub fn of_bytes() -> Self {
        Self::new(SchemaKind::Bytes)
    }

    pub fn with_message_type<T: 'static>(mut self) -> Self {
        self.message_type = Some(TypeTag::of::<T>());
        self
    }

    pub fn with_key_type<T: 'static>(mut self) -> Self {
        self.key_type = Some(TypeTag::of::<T>());
        self
    }

    pub fn with_value_type<T: 'static>(mut self) -> Self {
        self.value_type = Some(TypeTag::of::<T>());
        self
    }
}

impl Default for SchemaSpec {
    fn default() -> Self {
        Self::new(SchemaKind::None)
    }
}

lazy_static! {
    /// Built-in payload-type table. Immutable after initialization; checked
    /// before the custom table on every lookup.
    static ref BUILT_IN_MAPPINGS: HashMap<TypeId, WireSchema> = {
        let mut m = HashMap::new();
        m.insert(TypeId::of::<Vec<u8>>(), WireSchema::Bytes);
        m.insert(TypeId::of::<Bytes>(), WireSchema::ByteBuffer);
        m.insert(TypeId::of::<String>(), WireSchema::Text);
        m.insert(TypeId::of::<&'static str>(), WireSchema::Text);
        m.insert(TypeId::of::<i8>(), WireSchema::Int8);
        m.insert(TypeId::of::<i16>(), WireSchema::Int16);
        m.insert(TypeId::of::<i32>(), WireSchema::Int32);
        m.insert(TypeId::of::<i64>(), WireSchema::Int64);
        m.insert(TypeId::of::<bool>(), WireSchema::Bool);
        m.insert(TypeId::of::<f32>(), WireSchema::Float32);
        m.insert(TypeId::of::<f64>(), WireSchema::Float64);
        m.insert(TypeId::of::<SystemTime>(), WireSchema::Timestamp);
        m.insert(TypeId::of::<DateTime<Utc>>(), WireSchema::Instant);
        m.insert(TypeId::of::<NaiveDate>(), WireSchema::LocalDate);
        m.insert(TypeId::of::<NaiveDateTime>(), WireSchema::LocalDateTime);
        m.insert(TypeId::of::<NaiveTime>(), WireSchema::LocalTime);
        m
    };
}

/// Built-in schema for a type id, if the table has one.
pub(crate) fn built_in_schema(id: &TypeId) -> Option<WireSchema> {
    BUILT_IN_MAPPINGS.get(id).cloned()
}
