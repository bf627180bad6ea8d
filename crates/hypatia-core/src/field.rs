//! Field metadata.
//!
//! A model describes its JSON:API shape once, as a [`FieldSet`] of
//! [`Field`]s. Each field knows its JSON key, whether it is an attribute or
//! a relationship, and how to read and write it on the model. The registry
//! builds the field set at registration time so nothing is inspected on the
//! request path.
//!
//! ```
//! use hypatia_core::{Field, FieldKind, FieldSet};
//!
//! #[derive(Default, Clone)]
//! struct Chocolate {
//!     name: String,
//!     cocoa_percent: Option<u8>,
//!     maker_id: Option<String>,
//! }
//!
//! let fields = FieldSet::<Chocolate>::new()
//!     .with(Field::<Chocolate>::attribute("name", |c| &c.name, |c| &mut c.name).required())
//!     .with(Field::<Chocolate>::attribute("cocoa_percent", |c| &c.cocoa_percent, |c| &mut c.cocoa_percent).nullable())
//!     .with(Field::<Chocolate>::to_one("maker_id", "makers", |c| &c.maker_id, |c| &mut c.maker_id).rename("maker"));
//!
//! let keys: Vec<_> = fields.iter().map(|f| f.key()).collect();
//! assert_eq!(keys, vec!["name", "cocoa-percent", "maker"]);
//! assert_eq!(fields.get("maker").map(|f| f.kind()), Some(&FieldKind::ToOne { related: "makers" }));
//! ```

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

type ReadFn<M> = Arc<dyn Fn(&M) -> Result<Value, serde_json::Error> + Send + Sync>;
type WriteFn<M> = Arc<dyn Fn(&mut M, Value) -> Result<(), serde_json::Error> + Send + Sync>;

/// What a field is, as far as JSON:API is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A member of `attributes`
    Attribute,
    /// A to-one relationship to resources of type `related`
    ToOne {
        /// Related resource type
        related: &'static str,
    },
    /// A to-many relationship to resources of type `related`
    ToMany {
        /// Related resource type
        related: &'static str,
    },
}

impl FieldKind {
    /// Returns the related type for relationships.
    #[must_use]
    pub const fn related(&self) -> Option<&'static str> {
        match self {
            Self::Attribute => None,
            Self::ToOne { related } | Self::ToMany { related } => Some(*related),
        }
    }

    /// Returns true for to-one and to-many relationships.
    #[must_use]
    pub const fn is_relationship(&self) -> bool {
        !matches!(self, Self::Attribute)
    }
}

pub(crate) enum Accessor<M> {
    Attribute {
        read: ReadFn<M>,
        write: WriteFn<M>,
    },
    ToOne {
        get: fn(&M) -> &Option<String>,
        get_mut: fn(&mut M) -> &mut Option<String>,
    },
    ToMany {
        get: fn(&M) -> &Vec<String>,
        get_mut: fn(&mut M) -> &mut Vec<String>,
    },
}

impl<M> Clone for Accessor<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Attribute { read, write } => Self::Attribute {
                read: Arc::clone(read),
                write: Arc::clone(write),
            },
            Self::ToOne { get, get_mut } => Self::ToOne {
                get: *get,
                get_mut: *get_mut,
            },
            Self::ToMany { get, get_mut } => Self::ToMany {
                get: *get,
                get_mut: *get_mut,
            },
        }
    }
}

/// One field of a model.
pub struct Field<M> {
    name: &'static str,
    key: String,
    kind: FieldKind,
    nullable: bool,
    required: bool,
    pub(crate) accessor: Accessor<M>,
}

impl<M> Clone for Field<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            key: self.key.clone(),
            kind: self.kind,
            nullable: self.nullable,
            required: self.required,
            accessor: self.accessor.clone(),
        }
    }
}

impl<M> fmt::Debug for Field<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

impl<M: 'static> Field<M> {
    /// Declares an attribute.
    ///
    /// `name` is the Rust field name; the JSON key defaults to its
    /// kebab-case form. The value travels through serde, so any
    /// `Serialize + DeserializeOwned` type works.
    ///
    /// Name the model when calling it, as in
    /// `Field::<User>::attribute("name", |u| &u.name, |u| &mut u.name)`, so
    /// the accessor closures know their argument type.
    pub fn attribute<T>(name: &'static str, get: fn(&M) -> &T, get_mut: fn(&mut M) -> &mut T) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        Self::new(
            name,
            FieldKind::Attribute,
            Accessor::Attribute {
                read: Arc::new(move |m: &M| serde_json::to_value(get(m))),
                write: Arc::new(move |m: &mut M, value: Value| {
                    *get_mut(m) = serde_json::from_value(value)?;
                    Ok(())
                }),
            },
        )
    }

    /// Declares a to-one relationship stored as an optional id.
    pub fn to_one(
        name: &'static str,
        related: &'static str,
        get: fn(&M) -> &Option<String>,
        get_mut: fn(&mut M) -> &mut Option<String>,
    ) -> Self {
        let mut field = Self::new(name, FieldKind::ToOne { related }, Accessor::ToOne { get, get_mut });
        field.nullable = true;
        field
    }

    /// Declares a to-many relationship stored as a list of ids.
    pub fn to_many(
        name: &'static str,
        related: &'static str,
        get: fn(&M) -> &Vec<String>,
        get_mut: fn(&mut M) -> &mut Vec<String>,
    ) -> Self {
        Self::new(name, FieldKind::ToMany { related }, Accessor::ToMany { get, get_mut })
    }
}

impl<M> Field<M> {
    fn new(name: &'static str, kind: FieldKind, accessor: Accessor<M>) -> Self {
        Self {
            name,
            key: kebab_case(name),
            kind,
            nullable: false,
            required: false,
            accessor,
        }
    }

    /// Overrides the JSON key.
    pub fn rename(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Allows `null` for this attribute.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Requires this member to be present on create.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Rust field name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// JSON key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Field kind.
    #[must_use]
    pub const fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether `null` is accepted.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether the member must be present on create.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the type-erased description of this field.
    #[must_use]
    pub fn info(&self) -> FieldInfo {
        FieldInfo {
            key: self.key.clone(),
            kind: self.kind,
            nullable: self.nullable,
            required: self.required,
        }
    }
}

/// The ordered fields of a model.
pub struct FieldSet<M> {
    fields: Vec<Field<M>>,
}

impl<M> Default for FieldSet<M> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<M> Clone for FieldSet<M> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
        }
    }
}

impl<M> fmt::Debug for FieldSet<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.fields).finish()
    }
}

impl<M> FieldSet<M> {
    /// Creates an empty field set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field.
    pub fn with(mut self, field: Field<M>) -> Self {
        self.fields.push(field);
        self
    }

    /// Looks a field up by JSON key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Field<M>> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Iterates over fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Field<M>> {
        self.fields.iter()
    }

    /// Iterates over attribute fields.
    pub fn attributes(&self) -> impl Iterator<Item = &Field<M>> {
        self.fields.iter().filter(|f| !f.kind.is_relationship())
    }

    /// Iterates over relationship fields.
    pub fn relationships(&self) -> impl Iterator<Item = &Field<M>> {
        self.fields.iter().filter(|f| f.kind.is_relationship())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds the type-erased schema for resource type `type_name`.
    #[must_use]
    pub fn schema(&self, type_name: &str) -> Schema {
        Schema {
            type_name: type_name.to_string(),
            fields: self.fields.iter().map(Field::info).collect(),
        }
    }
}

/// Type-erased description of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// JSON key
    pub key: String,
    /// Field kind
    pub kind: FieldKind,
    /// Whether `null` is accepted
    pub nullable: bool,
    /// Whether the member must be present on create
    pub required: bool,
}

/// Type-erased field metadata of a registered resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Resource type name
    pub type_name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldInfo>,
}

impl Schema {
    /// Looks a field up by JSON key.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Looks a relationship up by JSON key.
    #[must_use]
    pub fn relationship(&self, key: &str) -> Option<&FieldInfo> {
        self.field(key).filter(|f| f.kind.is_relationship())
    }

    /// Iterates over relationship fields.
    pub fn relationships(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(|f| f.kind.is_relationship())
    }

    /// Iterates over attribute fields.
    pub fn attributes(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(|f| !f.kind.is_relationship())
    }
}

/// Converts a Rust identifier to its kebab-case JSON key.
///
/// `snake_case` and `camelCase` both map to `kebab-case`.
pub(crate) fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '_' || c == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            prev_lower = false;
        } else if c.is_uppercase() {
            if prev_lower && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Sample {
        user_name: String,
        age: Option<u32>,
        best_friend: Option<String>,
        chocolate_ids: Vec<String>,
    }

    fn fields() -> FieldSet<Sample> {
        FieldSet::<Sample>::new()
            .with(Field::<Sample>::attribute("user_name", |s| &s.user_name, |s| &mut s.user_name))
            .with(Field::<Sample>::attribute("age", |s| &s.age, |s| &mut s.age).nullable())
            .with(Field::<Sample>::to_one(
                "best_friend",
                "users",
                |s| &s.best_friend,
                |s| &mut s.best_friend,
            ))
            .with(
                Field::<Sample>::to_many(
                    "chocolate_ids",
                    "chocolates",
                    |s| &s.chocolate_ids,
                    |s| &mut s.chocolate_ids,
                )
                .rename("sweets"),
            )
    }

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("user_name"), "user-name");
        assert_eq!(kebab_case("userName"), "user-name");
        assert_eq!(kebab_case("name"), "name");
        assert_eq!(kebab_case("_private_"), "private");
        assert_eq!(kebab_case("HTTPCode"), "httpcode");
        assert_eq!(kebab_case("page2Size"), "page2-size");
    }

    #[test]
    fn test_keys_and_kinds() {
        let fields = fields();
        let keys: Vec<_> = fields.iter().map(Field::key).collect();
        assert_eq!(keys, vec!["user-name", "age", "best-friend", "sweets"]);
        assert_eq!(fields.attributes().count(), 2);
        assert_eq!(fields.relationships().count(), 2);
        assert_eq!(
            fields.get("sweets").map(|f| *f.kind()),
            Some(FieldKind::ToMany { related: "chocolates" })
        );
        assert_eq!(fields.get("sweets").map(Field::name), Some("chocolate_ids"));
    }

    #[test]
    fn test_to_one_is_nullable_by_default() {
        let fields = fields();
        assert!(fields.get("best-friend").is_some_and(Field::is_nullable));
        assert!(!fields.get("user-name").is_some_and(Field::is_nullable));
    }

    #[test]
    fn test_attribute_accessors() {
        let fields = fields();
        let field = fields.get("age").unwrap();
        let Accessor::Attribute { read, write } = &field.accessor else {
            panic!("age is an attribute");
        };

        let mut sample = Sample::default();
        write(&mut sample, serde_json::json!(41)).unwrap();
        assert_eq!(sample.age, Some(41));
        assert_eq!(read(&sample).unwrap(), serde_json::json!(41));
        assert!(write(&mut sample, serde_json::json!("old")).is_err());
    }

    #[test]
    fn test_schema() {
        let schema = fields().schema("users");
        assert_eq!(schema.type_name, "users");
        assert!(schema.relationship("sweets").is_some());
        assert!(schema.relationship("user-name").is_none());
        assert_eq!(schema.attributes().count(), 2);
    }
}
