// SPDX-License-Identifier: Apache-2.0
//! Attribute identity and schema registry.
//!
//! Attributes are declared explicitly by the embedding application up
//! front, rather than derived from runtime class introspection.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

use std::collections::BTreeMap;

/// The scalar type an attribute's values must have.
///
/// Mirrors `factdb_codec::Value`'s variants one-to-one but lives in this
/// crate (rather than depending on the codec) so schema declaration has no
/// wire-format dependency.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ValueType {
    /// Boolean.
    Bool,
    /// Single byte.
    Byte,
    /// 32-bit integer.
    I32,
    /// 64-bit integer.
    I64,
    /// UTF-8 string.
    Str,
    /// Opaque byte string.
    Bytes,
    /// Epoch-millisecond instant.
    Instant,
    /// Zoned timestamp.
    ZonedTimestamp,
    /// Reference to another entity.
    Eid,
}

/// A declared attribute: `(name, type, unique, list)`.
///
/// `name` follows the `<Type>.<prop>` convention (e.g. `"User.login"`) so
/// attribute names stay stable across schema evolution and readable on the
/// wire.
#[derive(Clone, PartialEq, Debug)]
pub struct Attribute {
    /// Stable `<Type>.<prop>` identifier.
    pub name: String,
    /// Declared scalar type of this attribute's values.
    pub value_type: ValueType,
    /// At most one live entity may hold a given `(attr, value)`.
    pub unique: bool,
    /// Multiple non-retracted facts may share `(eid, attr)`.
    pub list: bool,
}

impl Attribute {
    /// Declare a plain scalar attribute (not unique, not list-valued).
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            unique: false,
            list: false,
        }
    }

    /// Builder: mark this attribute `unique`.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Builder: mark this attribute list-valued.
    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }
}

impl ValueType {
    /// The single-byte tag this type encodes as when a schema attribute's
    /// own declaration is written as a fact — reuses the codec's own TLV
    /// tag alphabet rather than inventing a second one.
    pub fn tag(self) -> u8 {
        match self {
            Self::Bool => b'B',
            Self::Byte => b'b',
            Self::I32 => b'i',
            Self::I64 => b'l',
            Self::Str => b's',
            Self::Bytes => b'a',
            Self::Instant => b't',
            Self::ZonedTimestamp => b'z',
            Self::Eid => b'e',
        }
    }

    /// Inverse of [`ValueType::tag`]; `None` for a byte that is not one of
    /// the recognized tags.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'B' => Some(Self::Bool),
            b'b' => Some(Self::Byte),
            b'i' => Some(Self::I32),
            b'l' => Some(Self::I64),
            b's' => Some(Self::Str),
            b'a' => Some(Self::Bytes),
            b't' => Some(Self::Instant),
            b'z' => Some(Self::ZonedTimestamp),
            b'e' => Some(Self::Eid),
            _ => None,
        }
    }
}

/// Attribute name holding a declared attribute's own `name` when schema is
/// persisted as facts under the reserved system `Eid` range.
pub const SYSTEM_ATTR_NAME: &str = "schema.Attribute.name";
/// Attribute name holding a declared attribute's [`ValueType::tag`].
pub const SYSTEM_ATTR_TYPE: &str = "schema.Attribute.type";
/// Attribute name holding a declared attribute's `unique` flag.
pub const SYSTEM_ATTR_UNIQUE: &str = "schema.Attribute.unique";
/// Attribute name holding a declared attribute's `list` flag.
pub const SYSTEM_ATTR_LIST: &str = "schema.Attribute.list";

/// Errors raised while declaring or validating a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// An attribute name was declared with two different types.
    #[error("[SCHEMA_TYPE_CONFLICT] attribute {name} already declared as {existing:?}, cannot redeclare as {attempted:?}")]
    TypeConflict {
        /// The conflicting attribute name.
        name: String,
        /// The type already registered for `name`.
        existing: ValueType,
        /// The type this declaration attempted to register.
        attempted: ValueType,
    },
    /// An attribute was declared both `unique` and `list` — unique
    /// attributes must be scalar.
    #[error("[SCHEMA_UNIQUE_LIST_CONFLICT] attribute {0} cannot be both unique and list-valued")]
    UniqueListConflict(String),
    /// An attribute name does not follow the `<Type>.<prop>` convention.
    #[error("[SCHEMA_INVALID_NAME] attribute name {0:?} must follow the `Type.prop` convention")]
    InvalidAttributeName(String),
    /// A fact referenced an attribute name that was never registered.
    #[error("[SCHEMA_UNDECLARED_ATTRIBUTE] attribute {0} was never declared")]
    UndeclaredAttribute(String),
    /// A system-reserved schema fact did not decode back into an
    /// `Attribute` (missing field or an unrecognized [`ValueType`] tag).
    #[error("[SCHEMA_INVALID_SYSTEM_FACT] {0}")]
    InvalidSystemFact(String),
}

/// The set of declared [`Attribute`]s, itself meant to be persisted as
/// facts under reserved system EIDs so schema is versioned with the data
/// it describes.
#[derive(Clone, Default, Debug)]
pub struct Schema {
    attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `attr`. Re-registering an attribute identical to the one
    /// already present is a no-op; registering a conflicting
    /// redeclaration of the same name fails.
    ///
    /// # Errors
    /// [`SchemaError::InvalidAttributeName`], [`SchemaError::UniqueListConflict`],
    /// or [`SchemaError::TypeConflict`].
    pub fn register(&mut self, attr: Attribute) -> Result<(), SchemaError> {
        if !is_valid_name(&attr.name) {
            return Err(SchemaError::InvalidAttributeName(attr.name));
        }
        if attr.unique && attr.list {
            return Err(SchemaError::UniqueListConflict(attr.name));
        }
        if let Some(existing) = self.attributes.get(&attr.name) {
            if existing.value_type != attr.value_type {
                return Err(SchemaError::TypeConflict {
                    name: attr.name,
                    existing: existing.value_type,
                    attempted: attr.value_type,
                });
            }
        }
        self.attributes.insert(attr.name.clone(), attr);
        Ok(())
    }

    /// Look up a declared attribute by name.
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// `true` if `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Look up a declared attribute, failing if it was never registered.
    ///
    /// # Errors
    /// [`SchemaError::UndeclaredAttribute`] if `name` is not registered.
    pub fn require(&self, name: &str) -> Result<&Attribute, SchemaError> {
        self.get(name)
            .ok_or_else(|| SchemaError::UndeclaredAttribute(name.to_string()))
    }

    /// Iterate over all declared attributes, ordered by name.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// A clone of this schema with the four meta-attributes that describe
    /// schema attributes themselves (`SYSTEM_ATTR_*`) registered.
    ///
    /// Every [`factdb_index::Index`] backing a [`Schema`] needs these
    /// declared so a schema's own attributes can be folded into the index
    /// as facts under the reserved EID range — registration is idempotent,
    /// so calling this more than once (e.g. on every
    /// `Db::open`) is harmless.
    ///
    /// # Errors
    /// [`SchemaError::TypeConflict`] if this schema already declares one of
    /// the four reserved names with a different type than expected.
    pub fn with_system_attributes(&self) -> Result<Self, SchemaError> {
        let mut out = self.clone();
        out.register(Attribute::new(SYSTEM_ATTR_NAME, ValueType::Str))?;
        out.register(Attribute::new(SYSTEM_ATTR_TYPE, ValueType::Byte))?;
        out.register(Attribute::new(SYSTEM_ATTR_UNIQUE, ValueType::Bool))?;
        out.register(Attribute::new(SYSTEM_ATTR_LIST, ValueType::Bool))?;
        Ok(out)
    }
}

fn is_valid_name(name: &str) -> bool {
    match name.split_once('.') {
        Some((ty, prop)) => !ty.is_empty() && !prop.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut schema = Schema::new();
        schema
            .register(Attribute::new("User.login", ValueType::Str).unique())
            .unwrap();
        let attr = schema.get("User.login").unwrap();
        assert!(attr.unique);
        assert!(!attr.list);
    }

    #[test]
    fn reregistering_identical_attribute_is_a_no_op() {
        let mut schema = Schema::new();
        schema.register(Attribute::new("User.login", ValueType::Str)).unwrap();
        schema.register(Attribute::new("User.login", ValueType::Str)).unwrap();
        assert_eq!(schema.attributes().count(), 1);
    }

    #[test]
    fn conflicting_type_redeclaration_fails() {
        let mut schema = Schema::new();
        schema.register(Attribute::new("User.age", ValueType::I32)).unwrap();
        let err = schema
            .register(Attribute::new("User.age", ValueType::Str))
            .unwrap_err();
        assert!(matches!(err, SchemaError::TypeConflict { .. }));
    }

    #[test]
    fn unique_and_list_together_is_rejected() {
        let mut schema = Schema::new();
        let err = schema
            .register(Attribute::new("User.tags", ValueType::Str).unique().list())
            .unwrap_err();
        assert!(matches!(err, SchemaError::UniqueListConflict(_)));
    }

    #[test]
    fn invalid_name_without_dot_is_rejected() {
        let mut schema = Schema::new();
        let err = schema.register(Attribute::new("login", ValueType::Str)).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidAttributeName(_)));
    }

    #[test]
    fn require_on_undeclared_attribute_fails() {
        let schema = Schema::new();
        let err = schema.require("User.login").unwrap_err();
        assert!(matches!(err, SchemaError::UndeclaredAttribute(_)));
    }

    #[test]
    fn value_type_tag_round_trips() {
        for ty in [
            ValueType::Bool,
            ValueType::Byte,
            ValueType::I32,
            ValueType::I64,
            ValueType::Str,
            ValueType::Bytes,
            ValueType::Instant,
            ValueType::ZonedTimestamp,
            ValueType::Eid,
        ] {
            assert_eq!(ValueType::from_tag(ty.tag()), Some(ty));
        }
    }

    #[test]
    fn unrecognized_tag_is_none() {
        assert_eq!(ValueType::from_tag(b'?'), None);
    }

    #[test]
    fn with_system_attributes_adds_the_four_meta_attributes() {
        let mut schema = Schema::new();
        schema.register(Attribute::new("User.login", ValueType::Str)).unwrap();
        let augmented = schema.with_system_attributes().unwrap();
        assert!(augmented.contains(SYSTEM_ATTR_NAME));
        assert!(augmented.contains(SYSTEM_ATTR_TYPE));
        assert!(augmented.contains(SYSTEM_ATTR_UNIQUE));
        assert!(augmented.contains(SYSTEM_ATTR_LIST));
        assert!(augmented.contains("User.login"));
    }

    #[test]
    fn with_system_attributes_is_idempotent() {
        let schema = Schema::new();
        let once = schema.with_system_attributes().unwrap();
        let twice = once.with_system_attributes().unwrap();
        assert_eq!(once.attributes().count(), twice.attributes().count());
    }
}
