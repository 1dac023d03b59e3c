//! Payload-type to wire-schema resolution.
//!
//! Resolution is a two-tier lookup with a fixed order: the immutable built-in
//! table is checked first, then the caller-extensible custom table, and
//! finally, only when the caller asks for it, the raw-bytes default. The
//! order is a compatibility contract: a custom mapping can introduce schemas
//! for new types but can never shadow a built-in one.
//!
//! ## Examples
//!
//! ```ignore
//! use courier_core::{DefaultSchemaResolver, SchemaResolver, WireSchema};
//!
//! let resolver = DefaultSchemaResolver::new();
//! resolver.add_mapping::<Order>(WireSchema::struct_of::<Order>());
//!
//! assert_eq!(resolver.resolve::<String>(false), Some(WireSchema::Text));
//! assert_eq!(
//!     resolver.resolve::<Order>(false),
//!     Some(WireSchema::struct_of::<Order>())
//! );
//! ```

use std::any::TypeId;

use dashmap::DashMap;
use tracing::debug;

use crate::error::{CourierError, Result};
use crate::schema::{built_in_schema, SchemaKind, SchemaSpec, TypeTag, WireSchema};

/// Maps payload types to wire schemas.
///
/// Implementations must be safe to share across tasks; the custom table may
/// be mutated concurrently with lookups.
pub trait SchemaResolver: Send + Sync {
    /// Resolve the schema for a payload type tag.
    ///
    /// Lookup order: built-in table, then custom table, then
    /// [`WireSchema::Bytes`] when `return_default` is set. Returns `None`
    /// when nothing matched and the default was not requested.
    fn resolve_type(&self, tag: TypeTag, return_default: bool) -> Option<WireSchema>;

    /// Resolve a declared schema request (kind plus type declarations).
    ///
    /// Fails with [`CourierError::SchemaUnresolved`] when the kind's required
    /// declarations are missing; see [`SchemaSpec`].
    fn resolve_spec(&self, spec: &SchemaSpec) -> Result<WireSchema>;

    /// Convenience lookup for a concrete payload type.
    fn resolve<T: 'static>(&self, return_default: bool) -> Option<WireSchema>
    where
        Self: Sized,
    {
        self.resolve_type(TypeTag::of::<T>(), return_default)
    }
}

/// Default resolver: the built-in table plus a concurrent custom table.
///
/// Custom mappings are registered at runtime and may be replaced freely;
/// registering a mapping for a type that already has one replaces it (last
/// write wins). The custom table never shadows the built-in table.
pub struct DefaultSchemaResolver {
    custom: DashMap<TypeId, WireSchema>,
}

impl DefaultSchemaResolver {
    pub fn new() -> Self {
        Self {
            custom: DashMap::new(),
        }
    }

    /// Register (or replace) the custom mapping for `T`.
    ///
    /// Returns the mapping it replaced, if any.
    pub fn add_mapping<T: 'static>(&self, schema: WireSchema) -> Option<WireSchema> {
        self.add_mapping_for(TypeTag::of::<T>(), schema)
    }

    /// Register (or replace) the custom mapping for an explicit tag.
    pub fn add_mapping_for(&self, tag: TypeTag, schema: WireSchema) -> Option<WireSchema> {
        debug!(payload_type = %tag, schema = %schema, "registered custom schema mapping");
        self.custom.insert(tag.id(), schema)
    }

    /// Remove the custom mapping for `T`, returning it if present.
    pub fn remove_mapping<T: 'static>(&self) -> Option<WireSchema> {
        self.custom.remove(&TypeId::of::<T>()).map(|(_, schema)| schema)
    }

    /// The custom mapping currently registered for `T`, if any.
    pub fn custom_mapping<T: 'static>(&self) -> Option<WireSchema> {
        self.custom.get(&TypeId::of::<T>()).map(|entry| entry.clone())
    }

    /// Number of registered custom mappings.
    pub fn custom_mappings_len(&self) -> usize {
        self.custom.len()
    }

    fn lookup(&self, tag: TypeTag, return_default: bool) -> Option<WireSchema> {
        if let Some(schema) = built_in_schema(&tag.id()) {
            return Some(schema);
        }
        if let Some(schema) = self.custom.get(&tag.id()) {
            return Some(schema.clone());
        }
        if return_default {
            Some(WireSchema::Bytes)
        } else {
            None
        }
    }

    /// Resolution for one half of a composite or an inferred single type:
    /// table lookup without the default, falling back to the struct schema of
    /// the declared type.
    fn resolve_part(&self, tag: TypeTag) -> WireSchema {
        self.lookup(tag, false)
            .unwrap_or(WireSchema::Struct(tag))
    }
}

impl SchemaResolver for DefaultSchemaResolver {
    fn resolve_type(&self, tag: TypeTag, return_default: bool) -> Option<WireSchema> {
        self.lookup(tag, return_default)
    }

    fn resolve_spec(&self, spec: &SchemaSpec) -> Result<WireSchema> {
        match spec.kind {
            SchemaKind::Struct => {
                let tag = spec.message_type.ok_or_else(|| {
                    CourierError::SchemaUnresolved(
                        "struct schema kind requires a declared message type".to_string(),
                    )
                })?;
                Ok(WireSchema::Struct(tag))
            }
            SchemaKind::KeyValue => {
                let key = spec.key_type.ok_or_else(|| {
                    CourierError::SchemaUnresolved(
                        "key_value schema kind requires a declared key type".to_string(),
                    )
                })?;
                let value = spec.value_type.ok_or_else(|| {
                    CourierError::SchemaUnresolved(
                        "key_value schema kind requires a declared value type".to_string(),
                    )
                })?;
                Ok(WireSchema::key_value(
                    self.resolve_part(key),
                    self.resolve_part(value),
                ))
            }
            SchemaKind::Bytes => Ok(WireSchema::Bytes),
            SchemaKind::None => {
                if let Some(tag) = spec.message_type {
                    Ok(self.resolve_part(tag))
                } else if let (Some(key), Some(value)) = (spec.key_type, spec.value_type) {
                    Ok(WireSchema::key_value(
                        self.resolve_part(key),
                        self.resolve_part(value),
                    ))
                } else {
                    Err(CourierError::SchemaUnresolved(
                        "no schema kind declared and no message or key/value types to infer one"
                            .to_string(),
                    ))
                }
            }
        }
    }
}

impl Default for DefaultSchemaResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Order;
    struct Invoice;

    #[test]
    fn test_built_in_wins_over_custom() {
        let resolver = DefaultSchemaResolver::new();
        // A custom mapping for a built-in type never shadows the table.
        resolver.add_mapping::<String>(WireSchema::Bytes);
        assert_eq!(resolver.resolve::<String>(false), Some(WireSchema::Text));
    }

    #[test]
    fn test_custom_mapping_resolves() {
        let resolver = DefaultSchemaResolver::new();
        resolver.add_mapping::<Order>(WireSchema::struct_of::<Order>());
        assert_eq!(
            resolver.resolve::<Order>(false),
            Some(WireSchema::struct_of::<Order>())
        );
    }

    #[test]
    fn test_unknown_type_default_toggle() {
        let resolver = DefaultSchemaResolver::new();
        assert_eq!(resolver.resolve::<Order>(true), Some(WireSchema::Bytes));
        assert_eq!(resolver.resolve::<Order>(false), None);
    }

    #[test]
    fn test_registration_last_write_wins() {
        let resolver = DefaultSchemaResolver::new();
        assert_eq!(resolver.add_mapping::<Order>(WireSchema::Bytes), None);
        let replaced = resolver.add_mapping::<Order>(WireSchema::struct_of::<Order>());
        assert_eq!(replaced, Some(WireSchema::Bytes));
        assert_eq!(resolver.custom_mappings_len(), 1);
        assert_eq!(
            resolver.resolve::<Order>(false),
            Some(WireSchema::struct_of::<Order>())
        );
    }

    #[test]
    fn test_remove_mapping() {
        let resolver = DefaultSchemaResolver::new();
        resolver.add_mapping::<Order>(WireSchema::Bytes);
        assert_eq!(resolver.remove_mapping::<Order>(), Some(WireSchema::Bytes));
        assert_eq!(resolver.remove_mapping::<Order>(), None);
        assert_eq!(resolver.resolve::<Order>(false), None);
    }

    #[test]
    fn test_spec_struct_requires_message_type() {
        let resolver = DefaultSchemaResolver::new();
        let err = resolver
            .resolve_spec(&SchemaSpec::new(SchemaKind::Struct))
            .unwrap_err();
        assert!(matches!(err, CourierError::SchemaUnresolved(_)));

        let schema = resolver
            .resolve_spec(&SchemaSpec::of_struct::<Order>())
            .unwrap();
        assert_eq!(schema, WireSchema::struct_of::<Order>());
    }

    #[test]
    fn test_spec_key_value_requires_both_types() {
        let resolver = DefaultSchemaResolver::new();
        let missing_value = SchemaSpec::new(SchemaKind::KeyValue).with_key_type::<String>();
        assert!(matches!(
            resolver.resolve_spec(&missing_value),
            Err(CourierError::SchemaUnresolved(_))
        ));

        let schema = resolver
            .resolve_spec(&SchemaSpec::of_key_value::<String, i64>())
            .unwrap();
        assert_eq!(
            schema,
            WireSchema::key_value(WireSchema::Text, WireSchema::Int64)
        );
    }

    #[test]
    fn test_spec_none_infers_from_declarations() {
        let resolver = DefaultSchemaResolver::new();

        // Lone message type: resolved like a single payload, struct fallback
        // for unknown types.
        let single = SchemaSpec::new(SchemaKind::None).with_message_type::<String>();
        assert_eq!(resolver.resolve_spec(&single).unwrap(), WireSchema::Text);
        let single = SchemaSpec::new(SchemaKind::None).with_message_type::<Order>();
        assert_eq!(
            resolver.resolve_spec(&single).unwrap(),
            WireSchema::struct_of::<Order>()
        );

        // Declared key and value pair infers a composite.
        let pair = SchemaSpec::new(SchemaKind::None)
            .with_key_type::<String>()
            .with_value_type::<Invoice>();
        assert_eq!(
            resolver.resolve_spec(&pair).unwrap(),
            WireSchema::key_value(WireSchema::Text, WireSchema::struct_of::<Invoice>())
        );

        // Nothing declared at all fails fast.
        assert!(matches!(
            resolver.resolve_spec(&SchemaSpec::new(SchemaKind::None)),
            Err(CourierError::SchemaUnresolved(_))
        ));
    }

    #[test]
    fn test_spec_bytes_kind() {
        let resolver = DefaultSchemaResolver::new();
        assert_eq!(
            resolver.resolve_spec(&SchemaSpec::of_bytes()).unwrap(),
            WireSchema::Bytes
        );
    }

    #[test]
    fn test_explicit_struct_kind_bypasses_custom_table() {
        let resolver = DefaultSchemaResolver::new();
        resolver.add_mapping::<Order>(WireSchema::Text);

        // A declared struct kind resolves straight to the declared type.
        let declared = resolver
            .resolve_spec(&SchemaSpec::of_struct::<Order>())
            .unwrap();
        assert_eq!(declared, WireSchema::struct_of::<Order>());

        // Inference without a kind consults the custom table.
        let inferred = resolver
            .resolve_spec(&SchemaSpec::new(SchemaKind::None).with_message_type::<Order>())
            .unwrap();
        assert_eq!(inferred, WireSchema::Text);
    }

    #[test]
    fn test_concurrent_registration_and_lookup() {
        let resolver = Arc::new(DefaultSchemaResolver::new());

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        resolver.add_mapping::<Order>(WireSchema::struct_of::<Order>());
                        resolver.add_mapping::<Invoice>(WireSchema::Bytes);
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let _ = resolver.resolve::<Order>(true);
                        let _ = resolver.resolve::<String>(false);
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }
        assert_eq!(resolver.custom_mappings_len(), 2);
    }
}
