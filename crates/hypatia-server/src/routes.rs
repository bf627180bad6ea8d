//! Route derivation.
//!
//! For a resource type `R` with relationships `rel...` the derived set is:
//!
//! ```text
//! GET     /R                                 find_all
//! POST    /R                                 create
//! OPTIONS /R                                 options
//! GET     /R/{id}                            find_one
//! PATCH   /R/{id}                            update
//! DELETE  /R/{id}                            delete
//! OPTIONS /R/{id}                            options
//! GET     /R/{id}/rel                        related
//! GET     /R/{id}/relationships/rel          relationship_read
//! PATCH   /R/{id}/relationships/rel          relationship_replace
//! POST    /R/{id}/relationships/rel          relationship_add
//! DELETE  /R/{id}/relationships/rel          relationship_remove
//! ```
//!
//! Every route is registered whether or not the resource implements the
//! capability behind it; unsupported capabilities answer 405 at dispatch.

use std::fmt;

use http::Method;
use hypatia_core::Schema;

/// What a derived route does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// `GET /R`
    FindAll,
    /// `POST /R`
    Create,
    /// `GET /R/{id}`
    FindOne,
    /// `PATCH /R/{id}`
    Update,
    /// `DELETE /R/{id}`
    Delete,
    /// `GET /R/{id}/rel`
    Related(String),
    /// `GET /R/{id}/relationships/rel`
    RelationshipRead(String),
    /// `PATCH /R/{id}/relationships/rel`
    RelationshipReplace(String),
    /// `POST /R/{id}/relationships/rel`
    RelationshipAdd(String),
    /// `DELETE /R/{id}/relationships/rel`
    RelationshipRemove(String),
    /// `OPTIONS /R` (`collection`) or `OPTIONS /R/{id}`
    Options {
        /// Whether this is the collection route
        collection: bool,
    },
}

impl Action {
    /// The relationship this action targets, if any.
    #[must_use]
    pub fn relationship(&self) -> Option<&str> {
        match self {
            Self::Related(key)
            | Self::RelationshipRead(key)
            | Self::RelationshipReplace(key)
            | Self::RelationshipAdd(key)
            | Self::RelationshipRemove(key) => Some(key),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::FindAll => "find_all",
            Self::Create => "create",
            Self::FindOne => "find_one",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Related(_) => "related",
            Self::RelationshipRead(_) => "relationship_read",
            Self::RelationshipReplace(_) => "relationship_replace",
            Self::RelationshipAdd(_) => "relationship_add",
            Self::RelationshipRemove(_) => "relationship_remove",
            Self::Options { .. } => "options",
        }
    }
}

/// The handler value stored in the router: which resource, which action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Resource type name
    pub resource: String,
    /// Action to perform
    pub action: Action,
}

impl Endpoint {
    /// Stable operation id used in logs and metrics, e.g. `users.find_one`
    /// or `users.sweets.relationship_add`.
    #[must_use]
    pub fn operation_id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action.relationship() {
            Some(key) => write!(f, "{}.{key}.{}", self.resource, self.action.name()),
            None => write!(f, "{}.{}", self.resource, self.action.name()),
        }
    }
}

/// One derived route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// HTTP method
    pub method: Method,
    /// Router pattern, e.g. `/api/users/{id}`
    pub path: String,
    /// What the route does
    pub endpoint: Endpoint,
}

/// Derives the full route set for one resource type.
pub(crate) fn derive_routes(schema: &Schema, prefix: &str) -> Vec<RouteInfo> {
    let collection = if prefix.is_empty() {
        format!("/{}", schema.type_name)
    } else {
        format!("/{prefix}/{}", schema.type_name)
    };
    let single = format!("{collection}/{{id}}");

    let route = |method: Method, path: &str, action: Action| RouteInfo {
        method,
        path: path.to_string(),
        endpoint: Endpoint {
            resource: schema.type_name.clone(),
            action,
        },
    };

    let mut routes = vec![
        route(Method::GET, &collection, Action::FindAll),
        route(Method::POST, &collection, Action::Create),
        route(Method::OPTIONS, &collection, Action::Options { collection: true }),
        route(Method::GET, &single, Action::FindOne),
        route(Method::PATCH, &single, Action::Update),
        route(Method::DELETE, &single, Action::Delete),
        route(Method::OPTIONS, &single, Action::Options { collection: false }),
    ];

    for field in schema.relationships() {
        let key = &field.key;
        let related = format!("{single}/{key}");
        let linkage = format!("{single}/relationships/{key}");
        routes.extend([
            route(Method::GET, &related, Action::Related(key.clone())),
            route(Method::GET, &linkage, Action::RelationshipRead(key.clone())),
            route(Method::PATCH, &linkage, Action::RelationshipReplace(key.clone())),
            route(Method::POST, &linkage, Action::RelationshipAdd(key.clone())),
            route(Method::DELETE, &linkage, Action::RelationshipRemove(key.clone())),
        ]);
    }

    routes
}
