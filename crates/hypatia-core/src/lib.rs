//! # Hypatia Core
//!
//! Storage-agnostic building blocks of the Hypatia JSON:API framework.
//!
//! - [`Document`] and friends - the JSON:API wire envelope
//! - [`Model`], [`Field`], [`FieldSet`] - how a domain type describes itself
//! - [`Resource`] - the CRUD capability set a storage back-end implements
//! - [`Registry`] - type name to resource binding, built once at startup
//! - [`QueryParser`] and [`RequestContext`] - parsed query state for one request
//! - [`ApiError`] - the error model and its JSON:API rendering
//!
//! Nothing in this crate performs I/O or knows about HTTP transport; the
//! `hypatia-server` crate wires these pieces to a router and a socket.

#![doc(html_root_url = "https://docs.rs/hypatia-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod codec;
mod context;
pub mod document;
mod error;
mod field;
mod pagination;
mod query;
mod registry;
mod resource;

pub use context::{RequestContext, RequestId};
pub use document::{
    Document, ErrorObject, ErrorSource, Link, Linkage, Links, Meta, PrimaryData, Relationship,
    ResourceIdentifier, ResourceObject, MEDIA_TYPE,
};
pub use error::{ApiError, ApiResult, ErrorKind, RegistryError};
pub use field::{Field, FieldInfo, FieldKind, FieldSet, Schema};
pub use pagination::{PageLinks, Pagination};
pub use query::{IncludePath, Query, QueryParser, SortField, DEFAULT_PAGE_SIZE};
pub use registry::{LinkageOp, Registry, ResourceBinding};
pub use resource::{Capabilities, Collection, Model, Resource};
