//! Resource registry.
//!
//! [`Registry::register`] wraps a [`Resource`] in a binding that speaks only
//! in [`ResourceObject`]s. The dispatcher works exclusively through
//! [`ResourceBinding`] and never sees a concrete model type.
//!
//! The registry is filled once at startup and read concurrently afterwards;
//! it has no interior mutability.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::codec::{self, DecodeMode};
use crate::context::RequestContext;
use crate::document::{Linkage, Meta, ResourceIdentifier, ResourceObject};
use crate::error::{ApiError, ErrorKind, RegistryError};
use crate::field::{FieldSet, Schema};
use crate::query::IncludePath;
use crate::resource::{Capabilities, Collection, Model, Resource};

/// A change to relationship linkage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkageOp {
    /// Replace the whole linkage (`PATCH`)
    Replace(Linkage),
    /// Add ids to a to-many relationship (`POST`)
    Add(Vec<String>),
    /// Remove ids from a to-many relationship (`DELETE`)
    Remove(Vec<String>),
}

/// A registered resource with its model type erased.
#[async_trait]
pub trait ResourceBinding: Send + Sync {
    /// Field metadata of the model.
    fn schema(&self) -> &Schema;

    /// Capabilities of the underlying resource.
    fn capabilities(&self) -> Capabilities;

    /// Top-level meta supplied by the resource.
    fn meta(&self) -> Option<Meta>;

    /// Lists resources.
    async fn find_all(&self, ctx: &RequestContext) -> Result<Collection<ResourceObject>, ApiError>;

    /// Loads one resource.
    async fn find_one(&self, id: &str, ctx: &RequestContext) -> Result<ResourceObject, ApiError>;

    /// Creates a resource from a request object; returns the stored result.
    async fn create(
        &self,
        object: &ResourceObject,
        ctx: &RequestContext,
    ) -> Result<ResourceObject, ApiError>;

    /// Applies a request object onto resource `id`.
    ///
    /// When the resource can `find_one`, the stored model is loaded first
    /// and only members present in `object` change.
    async fn update(
        &self,
        id: &str,
        object: &ResourceObject,
        ctx: &RequestContext,
    ) -> Result<(), ApiError>;

    /// Deletes resource `id`.
    async fn delete(&self, id: &str, ctx: &RequestContext) -> Result<(), ApiError>;

    /// Loads resource `id`, changes the linkage of relationship `key` and
    /// stores the result.
    async fn mutate_relationship(
        &self,
        id: &str,
        key: &str,
        op: LinkageOp,
        ctx: &RequestContext,
    ) -> Result<(), ApiError>;
}

struct Binding<R: Resource> {
    resource: R,
    fields: FieldSet<R::Model>,
    schema: Schema,
}

impl<R: Resource> Binding<R> {
    fn new(resource: R) -> Self {
        let fields = R::Model::fields();
        let schema = fields.schema(R::Model::TYPE);
        Self {
            resource,
            fields,
            schema,
        }
    }

    fn encode(&self, model: &R::Model) -> Result<ResourceObject, ApiError> {
        codec::encode(model, &self.fields)
    }

    /// Loads the stored model, or starts from a blank one with `id` when the
    /// resource cannot `find_one`.
    async fn load_for_update(&self, id: &str, ctx: &RequestContext) -> Result<R::Model, ApiError> {
        let blank = || {
            let mut model = R::Model::default();
            model.set_id(id.to_string());
            model
        };
        if !self.resource.capabilities().find_one {
            return Ok(blank());
        }
        match self.resource.find_one(id, ctx).await {
            Err(e) if e.kind() == ErrorKind::MethodNotAllowed => Ok(blank()),
            other => other,
        }
    }
}

#[async_trait]
impl<R: Resource> ResourceBinding for Binding<R> {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn capabilities(&self) -> Capabilities {
        self.resource.capabilities()
    }

    fn meta(&self) -> Option<Meta> {
        self.resource.meta()
    }

    async fn find_all(&self, ctx: &RequestContext) -> Result<Collection<ResourceObject>, ApiError> {
        self.resource
            .find_all(ctx)
            .await?
            .try_map(|model| self.encode(&model))
    }

    async fn find_one(&self, id: &str, ctx: &RequestContext) -> Result<ResourceObject, ApiError> {
        let model = self.resource.find_one(id, ctx).await?;
        self.encode(&model)
    }

    async fn create(
        &self,
        object: &ResourceObject,
        ctx: &RequestContext,
    ) -> Result<ResourceObject, ApiError> {
        let mut model = R::Model::default();
        codec::decode_into(&mut model, object, &self.fields, DecodeMode::Create)?;
        let created = self.resource.create(model, ctx).await?;
        self.encode(&created)
    }

    async fn update(
        &self,
        id: &str,
        object: &ResourceObject,
        ctx: &RequestContext,
    ) -> Result<(), ApiError> {
        // Malformed bodies are rejected before the stored model is loaded.
        let mut staged = R::Model::default();
        codec::decode_into(&mut staged, object, &self.fields, DecodeMode::Update)?;

        let mut model = self.load_for_update(id, ctx).await?;
        codec::decode_into(&mut model, object, &self.fields, DecodeMode::Update)?;
        model.set_id(id.to_string());
        self.resource.update(model, ctx).await
    }

    async fn delete(&self, id: &str, ctx: &RequestContext) -> Result<(), ApiError> {
        self.resource.delete(id, ctx).await
    }

    async fn mutate_relationship(
        &self,
        id: &str,
        key: &str,
        op: LinkageOp,
        ctx: &RequestContext,
    ) -> Result<(), ApiError> {
        let field = self
            .fields
            .get(key)
            .filter(|f| f.kind().is_relationship())
            .ok_or_else(|| {
                ApiError::not_found_message(format!(
                    "{} has no relationship `{key}`",
                    R::Model::TYPE
                ))
            })?;

        if let LinkageOp::Replace(linkage) = &op {
            codec::check_linkage(field, linkage, "/data")?;
        }

        let mut model = self.resource.find_one(id, ctx).await?;
        let next = match (op, codec::read_linkage(&model, field)) {
            (LinkageOp::Replace(linkage), _) => linkage,
            (LinkageOp::Add(ids), Linkage::ToMany(mut current)) => {
                let related = field.kind().related().unwrap_or_default();
                for id in ids {
                    if !current.iter().any(|c| c.id == id) {
                        current.push(ResourceIdentifier::new(related, id));
                    }
                }
                Linkage::ToMany(current)
            }
            (LinkageOp::Remove(ids), Linkage::ToMany(mut current)) => {
                current.retain(|c| !ids.contains(&c.id));
                Linkage::ToMany(current)
            }
            _ => {
                return Err(ApiError::method_not_allowed(format!(
                    "`{key}` is a to-one relationship; only PATCH is allowed"
                )))
            }
        };

        codec::write_linkage(&mut model, field, next);
        self.resource.update(model, ctx).await
    }
}

/// Maps resource type names to their bindings.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use hypatia_core::{Capabilities, Field, FieldSet, Model, Registry, Resource};
///
/// #[derive(Default, Clone)]
/// struct Moon { id: String, name: String }
///
/// impl Model for Moon {
///     const TYPE: &'static str = "moons";
///     fn id(&self) -> String { self.id.clone() }
///     fn set_id(&mut self, id: String) { self.id = id; }
///     fn fields() -> FieldSet<Self> {
///         FieldSet::<Self>::new().with(Field::<Self>::attribute("name", |m| &m.name, |m| &mut m.name))
///     }
/// }
///
/// struct Moons;
///
/// #[async_trait]
/// impl Resource for Moons {
///     type Model = Moon;
///
///     fn capabilities(&self) -> Capabilities {
///         Capabilities::NONE
///     }
/// }
///
/// let mut registry = Registry::new();
/// registry.register(Moons).unwrap();
/// assert!(registry.get("moons").is_some());
/// assert!(registry.register(Moons).is_err());
/// ```
#[derive(Default, Clone)]
pub struct Registry {
    bindings: IndexMap<String, Arc<dyn ResourceBinding>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource under its model's type name.
    pub fn register<R: Resource>(&mut self, resource: R) -> Result<(), RegistryError> {
        let binding = Binding::new(resource);
        let type_name = binding.schema.type_name.clone();

        if type_name.is_empty() || type_name.contains('/') {
            return Err(RegistryError::InvalidTypeName(type_name));
        }
        if self.bindings.contains_key(&type_name) {
            return Err(RegistryError::DuplicateType(type_name));
        }

        let mut seen = HashSet::new();
        for field in &binding.schema.fields {
            if field.key == "id" || field.key == "type" {
                return Err(RegistryError::ReservedField {
                    type_name,
                    key: field.key.clone(),
                });
            }
            if !seen.insert(field.key.as_str()) {
                return Err(RegistryError::DuplicateField {
                    type_name,
                    key: field.key.clone(),
                });
            }
        }

        tracing::debug!(
            resource = %type_name,
            fields = binding.schema.fields.len(),
            "resource registered"
        );
        self.bindings.insert(type_name, Arc::new(binding));
        Ok(())
    }

    /// Returns the binding for `type_name`.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&Arc<dyn ResourceBinding>> {
        self.bindings.get(type_name)
    }

    /// Returns the schema for `type_name`.
    #[must_use]
    pub fn schema(&self, type_name: &str) -> Option<&Schema> {
        self.bindings.get(type_name).map(|b| b.schema())
    }

    /// Iterates over registered type names in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Iterates over bindings in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn ResourceBinding>)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of registered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Lists relationships whose related type is not registered, as
    /// `(type, key, related)` triples.
    #[must_use]
    pub fn dangling_relationships(&self) -> Vec<(String, String, &'static str)> {
        self.bindings
            .values()
            .flat_map(|b| {
                let schema = b.schema();
                schema.relationships().filter_map(move |f| {
                    let related = f.kind.related()?;
                    (!self.bindings.contains_key(related))
                        .then(|| (schema.type_name.clone(), f.key.clone(), related))
                })
            })
            .collect()
    }

    /// Checks `fields[..]` and `include` against registered metadata.
    ///
    /// Every unknown type, field or relationship is reported; the errors
    /// are aggregated in query order.
    pub fn validate_query(&self, primary: &str, ctx: &RequestContext) -> Result<(), ApiError> {
        let mut errors = Vec::new();

        for (type_name, fields) in &ctx.query().fields {
            let parameter = format!("fields[{type_name}]");
            let Some(schema) = self.schema(type_name) else {
                errors.push(ApiError::invalid_query(
                    parameter,
                    format!("unknown resource type `{type_name}`"),
                ));
                continue;
            };
            for field in fields {
                if schema.field(field).is_none() {
                    errors.push(ApiError::invalid_query(
                        parameter.clone(),
                        format!("`{type_name}` has no field `{field}`"),
                    ));
                }
            }
        }

        for path in ctx.include() {
            if let Err(e) = self.resolve_include(primary, path) {
                errors.push(e);
            }
        }

        match ApiError::aggregate(errors) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn resolve_include(&self, primary: &str, path: &IncludePath) -> Result<(), ApiError> {
        let mut current = primary;
        for segment in path.segments() {
            let related = self
                .schema(current)
                .and_then(|s| s.relationship(segment))
                .and_then(|f| f.kind.related())
                .ok_or_else(|| {
                    ApiError::invalid_query(
                        "include",
                        format!("`{current}` has no relationship `{segment}` (in `{path}`)"),
                    )
                })?;
            current = related;
        }
        Ok(())
    }
}
