//! JSON:API document types.
//!
//! These types mirror the wire format one to one. A [`Document`] carries
//! either primary `data` or `errors`, plus optional `meta`, `links` and
//! `included`. Serialisation follows the JSON:API rules that matter to
//! clients:
//!
//! - an empty to-many relationship is written as `"data": []`
//! - an empty to-one relationship is written as `"data": null`
//! - empty optional members are omitted
//!
//! Request bodies are not decoded through these types directly; see
//! [`crate::codec`], which walks the raw JSON so that failures can point at
//! the offending member.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The JSON:API media type.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Free-form `meta` object.
pub type Meta = Map<String, Value>;

/// A `links` object keyed by link name (`self`, `related`, `next`, ...).
pub type Links = IndexMap<String, Link>;

/// Deserialises a member that may be present with a `null` value.
///
/// Plain `Option<T>` collapses "absent" and "null"; this keeps `null` as
/// `Some(T)` when `T` itself accepts `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A top-level JSON:API document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Primary data
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<PrimaryData>,

    /// Error objects; mutually exclusive with `data`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorObject>,

    /// Top-level links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,

    /// Top-level meta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    /// Related resources pulled in by `include`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,
}

impl Document {
    /// Creates a document whose primary data is a single resource.
    #[must_use]
    pub fn single(resource: ResourceObject) -> Self {
        Self {
            data: Some(PrimaryData::One(Some(Box::new(resource)))),
            ..Self::default()
        }
    }

    /// Creates a document whose primary data is `null`.
    #[must_use]
    pub fn null() -> Self {
        Self {
            data: Some(PrimaryData::One(None)),
            ..Self::default()
        }
    }

    /// Creates a document whose primary data is an array.
    #[must_use]
    pub fn collection(resources: Vec<ResourceObject>) -> Self {
        Self {
            data: Some(PrimaryData::Many(resources)),
            ..Self::default()
        }
    }

    /// Creates a document carrying relationship linkage as primary data.
    #[must_use]
    pub fn linkage(linkage: Linkage) -> Self {
        let data = match linkage {
            Linkage::ToOne(None) => PrimaryData::One(None),
            Linkage::ToOne(Some(id)) => PrimaryData::One(Some(Box::new(id.into()))),
            Linkage::ToMany(ids) => PrimaryData::Many(ids.into_iter().map(Into::into).collect()),
        };
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Creates an error document.
    #[must_use]
    pub fn errors(errors: Vec<ErrorObject>) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }

    /// Sets the top-level meta.
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Sets the top-level links.
    pub fn with_links(mut self, links: Links) -> Self {
        self.links = Some(links);
        self
    }

    /// Returns the primary resource if the data is a single resource.
    #[must_use]
    pub fn resource(&self) -> Option<&ResourceObject> {
        match &self.data {
            Some(PrimaryData::One(Some(resource))) => Some(resource),
            _ => None,
        }
    }

    /// Returns the primary resources if the data is an array.
    #[must_use]
    pub fn resources(&self) -> Option<&[ResourceObject]> {
        match &self.data {
            Some(PrimaryData::Many(resources)) => Some(resources),
            _ => None,
        }
    }
}

/// Primary data of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    /// A single resource or `null`
    One(Option<Box<ResourceObject>>),
    /// An array of resources
    Many(Vec<ResourceObject>),
}

/// A resource object.
///
/// A resource identifier is represented as a resource object without
/// attributes or relationships; it serialises to just `type` and `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    /// Resource type name
    #[serde(rename = "type")]
    pub type_name: String,

    /// Resource id; empty only in creation request bodies
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Attribute members keyed by JSON key
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,

    /// Relationship members keyed by JSON key
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub relationships: IndexMap<String, Relationship>,

    /// Resource-level links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,

    /// Resource-level meta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl ResourceObject {
    /// Creates a resource object with no members besides `type` and `id`.
    #[must_use]
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
            ..Self::default()
        }
    }

    /// Returns this object's `{type, id}` pair.
    #[must_use]
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(self.type_name.clone(), self.id.clone())
    }

    /// Returns the attribute stored under `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns the linkage of relationship `key`, if it carries data.
    #[must_use]
    pub fn linkage(&self, key: &str) -> Option<&Linkage> {
        self.relationships.get(key).and_then(|r| r.data.as_ref())
    }
}

impl From<ResourceIdentifier> for ResourceObject {
    fn from(id: ResourceIdentifier) -> Self {
        Self::new(id.type_name, id.id)
    }
}

/// A resource identifier object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    /// Resource type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Resource id
    pub id: String,
}

impl ResourceIdentifier {
    /// Creates a resource identifier.
    #[must_use]
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }
}

/// Relationship linkage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    /// To-one linkage; `None` serialises as `null`
    ToOne(Option<ResourceIdentifier>),
    /// To-many linkage; may be empty
    ToMany(Vec<ResourceIdentifier>),
}

impl Default for Linkage {
    fn default() -> Self {
        Self::ToOne(None)
    }
}

impl Linkage {
    /// Iterates over the identifiers in this linkage.
    pub fn identifiers(&self) -> impl Iterator<Item = &ResourceIdentifier> {
        let (one, many) = match self {
            Self::ToOne(id) => (id.as_ref(), &[][..]),
            Self::ToMany(ids) => (None, ids.as_slice()),
        };
        one.into_iter().chain(many)
    }

    /// Returns true if this linkage points at nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identifiers().next().is_none()
    }
}

/// A relationship object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship links (`self`, `related`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,

    /// Resource linkage
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Linkage>,

    /// Relationship meta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// A link: either a bare URL or a link object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Link {
    /// Bare URL string
    Href(String),
    /// Link object with optional meta
    Object {
        /// Target URL
        href: String,
        /// Link meta
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<Meta>,
    },
}

impl Link {
    /// Returns the target URL.
    #[must_use]
    pub fn href(&self) -> &str {
        match self {
            Self::Href(href) | Self::Object { href, .. } => href,
        }
    }
}

impl From<String> for Link {
    fn from(href: String) -> Self {
        Self::Href(href)
    }
}

/// A JSON:API error object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Unique identifier for this occurrence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// HTTP status code, string-encoded
    pub status: String,

    /// Machine-readable error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Human-readable summary
    pub title: String,

    /// Human-readable explanation specific to this occurrence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// What part of the request caused the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,

    /// Error meta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

/// The `source` member of an error object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSource {
    /// JSON pointer into the request document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,

    /// Name of the offending query parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}
