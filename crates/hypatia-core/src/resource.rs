//! The resource contract.
//!
//! A [`Model`] is a domain type that knows its JSON:API type name, its id
//! and its fields. A [`Resource`] is the storage-facing side: it finds,
//! creates, updates and deletes models. Every capability has a default
//! that answers `405 Method Not Allowed`, so a read-only resource simply
//! implements `find_all` and `find_one` and declares exactly those in its
//! [`Capabilities`].

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::document::Meta;
use crate::error::ApiError;
use crate::field::FieldSet;

/// A domain type exposed through the API.
pub trait Model: Default + Clone + Send + Sync + 'static {
    /// JSON:API type name, e.g. `"users"`.
    const TYPE: &'static str;

    /// Returns the id; empty for models not yet persisted.
    fn id(&self) -> String;

    /// Sets the id.
    fn set_id(&mut self, id: String);

    /// Describes the model's attributes and relationships.
    fn fields() -> FieldSet<Self>;
}

/// The result of a `find_all`.
///
/// Either the full set (the dispatcher slices out the requested page) or a
/// page the resource already cut itself together with the total count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection<T> {
    items: Vec<T>,
    total: usize,
    paged: bool,
}

impl<T> Collection<T> {
    /// Wraps the complete, unpaged result set.
    #[must_use]
    pub fn full(items: Vec<T>) -> Self {
        Self {
            total: items.len(),
            items,
            paged: false,
        }
    }

    /// Wraps one page of a result set of `total` items.
    #[must_use]
    pub fn paged(items: Vec<T>, total: usize) -> Self {
        Self {
            items,
            total,
            paged: true,
        }
    }

    /// Items in this collection.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Size of the whole result set.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// True if the resource already applied pagination.
    #[must_use]
    pub const fn is_paged(&self) -> bool {
        self.paged
    }

    /// Consumes the collection, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Maps every item, keeping total and paging state.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Collection<U>, E> {
        Ok(Collection {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            total: self.total,
            paged: self.paged,
        })
    }
}

/// Which capabilities a resource implements.
///
/// Drives the `Allow` header of `OPTIONS` responses and whether an update
/// starts from the stored model. Routes for missing capabilities stay
/// registered and answer 405. The default is [`Capabilities::NONE`].
///
/// ```
/// use hypatia_core::Capabilities;
///
/// let write_only = Capabilities { update: true, ..Capabilities::NONE };
/// assert!(!write_only.find_one);
/// assert_eq!(Capabilities::default(), Capabilities::NONE);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// `GET /R`
    pub find_all: bool,
    /// `GET /R/{id}`
    pub find_one: bool,
    /// `POST /R`
    pub create: bool,
    /// `PATCH /R/{id}` and relationship mutations
    pub update: bool,
    /// `DELETE /R/{id}`
    pub delete: bool,
}

impl Capabilities {
    /// No capability.
    pub const NONE: Self = Self {
        find_all: false,
        find_one: false,
        create: false,
        update: false,
        delete: false,
    };

    /// Every capability.
    pub const ALL: Self = Self {
        find_all: true,
        find_one: true,
        create: true,
        update: true,
        delete: true,
    };

    /// `find_all` and `find_one` only.
    pub const READ_ONLY: Self = Self {
        find_all: true,
        find_one: true,
        create: false,
        update: false,
        delete: false,
    };
}

fn not_supported(type_name: &str, operation: &str) -> ApiError {
    ApiError::method_not_allowed(format!("{type_name} does not support {operation}"))
}

/// Storage-facing CRUD capability set for one model type.
///
/// Implementations must be safe to call concurrently; the dispatcher makes
/// no attempt to serialise calls.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use hypatia_core::{
///     ApiError, Capabilities, Collection, Field, FieldSet, Model, RequestContext, Resource,
/// };
///
/// #[derive(Default, Clone)]
/// struct Planet {
///     id: String,
///     name: String,
/// }
///
/// impl Model for Planet {
///     const TYPE: &'static str = "planets";
///     fn id(&self) -> String { self.id.clone() }
///     fn set_id(&mut self, id: String) { self.id = id; }
///     fn fields() -> FieldSet<Self> {
///         FieldSet::<Self>::new().with(Field::<Self>::attribute("name", |p| &p.name, |p| &mut p.name))
///     }
/// }
///
/// struct Planets;
///
/// #[async_trait]
/// impl Resource for Planets {
///     type Model = Planet;
///
///     async fn find_all(&self, _ctx: &RequestContext) -> Result<Collection<Planet>, ApiError> {
///         Ok(Collection::full(vec![Planet { id: "3".into(), name: "Earth".into() }]))
///     }
///
///     fn capabilities(&self) -> Capabilities {
///         Capabilities { find_all: true, ..Capabilities::NONE }
///     }
/// }
/// ```
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// The model this resource stores.
    type Model: Model;

    /// Lists models.
    async fn find_all(&self, _ctx: &RequestContext) -> Result<Collection<Self::Model>, ApiError> {
        Err(not_supported(Self::Model::TYPE, "find_all"))
    }

    /// Loads one model; fails with `NotFound` if it does not exist.
    async fn find_one(&self, _id: &str, _ctx: &RequestContext) -> Result<Self::Model, ApiError> {
        Err(not_supported(Self::Model::TYPE, "find_one"))
    }

    /// Persists a new model and returns it with its id assigned.
    async fn create(
        &self,
        _model: Self::Model,
        _ctx: &RequestContext,
    ) -> Result<Self::Model, ApiError> {
        Err(not_supported(Self::Model::TYPE, "create"))
    }

    /// Persists changes to an existing model.
    async fn update(&self, _model: Self::Model, _ctx: &RequestContext) -> Result<(), ApiError> {
        Err(not_supported(Self::Model::TYPE, "update"))
    }

    /// Deletes a model; fails with `NotFound` if it does not exist.
    async fn delete(&self, _id: &str, _ctx: &RequestContext) -> Result<(), ApiError> {
        Err(not_supported(Self::Model::TYPE, "delete"))
    }

    /// Top-level `meta` attached to successful responses.
    fn meta(&self) -> Option<Meta> {
        None
    }

    /// Capabilities this resource implements; must name exactly the
    /// methods overridden above.
    fn capabilities(&self) -> Capabilities;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::field::Field;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Note {
        id: String,
        text: String,
    }

    impl Model for Note {
        const TYPE: &'static str = "notes";

        fn id(&self) -> String {
            self.id.clone()
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }

        fn fields() -> FieldSet<Self> {
            FieldSet::<Self>::new().with(Field::<Self>::attribute("text", |n| &n.text, |n| &mut n.text))
        }
    }

    struct ReadOnlyNotes;

    #[async_trait]
    impl Resource for ReadOnlyNotes {
        type Model = Note;

        async fn find_one(&self, id: &str, _ctx: &RequestContext) -> Result<Note, ApiError> {
            Ok(Note {
                id: id.to_string(),
                text: "hello".into(),
            })
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                find_one: true,
                ..Capabilities::NONE
            }
        }
    }

    #[tokio::test]
    async fn test_defaults_answer_method_not_allowed() {
        let notes = ReadOnlyNotes;
        let ctx = RequestContext::mock();

        let err = notes.create(Note::default(), &ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MethodNotAllowed);
        assert_eq!(err.to_string(), "notes does not support create");

        assert!(notes.delete("1", &ctx).await.is_err());
        assert_eq!(notes.find_one("1", &ctx).await.unwrap().text, "hello");
        assert!(notes.meta().is_none());
    }

    #[test]
    fn test_collection_full_counts_items() {
        let c = Collection::full(vec![1, 2, 3]);
        assert_eq!(c.total(), 3);
        assert!(!c.is_paged());
    }

    #[test]
    fn test_collection_try_map_keeps_paging() {
        let c = Collection::paged(vec![1, 2], 10);
        let mapped: Collection<String> = c.try_map(|n| Ok::<_, ()>(n.to_string())).unwrap();
        assert_eq!(mapped.items(), ["1".to_string(), "2".to_string()]);
        assert_eq!(mapped.total(), 10);
        assert!(mapped.is_paged());
    }
}
