//! Turning resource objects returned by bindings into response documents.
//!
//! A [`Presenter`] is built per request. It applies sparse fieldsets, adds
//! relationship links, resolves `include` paths into the `included` array
//! and builds pagination links.

use std::collections::HashSet;

use futures_util::future::join_all;
use hypatia_core::{
    codec, ApiError, ErrorKind, Link, Links, PageLinks, Pagination, Registry, RequestContext,
    ResourceIdentifier, ResourceObject,
};
use indexmap::IndexMap;

use crate::url::LinkBuilder;

pub(crate) struct Presenter<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) links: LinkBuilder,
    pub(crate) ctx: &'a RequestContext,
}

impl Presenter<'_> {
    /// Applies the fieldset for the object's type and adds relationship links.
    pub(crate) fn present(&self, object: &mut ResourceObject) {
        if let Some(fields) = self.ctx.fields_for(&object.type_name) {
            codec::apply_fieldset(object, fields);
        }
        for (key, relationship) in &mut object.relationships {
            relationship.links = Some(self.relationship_links(&object.type_name, &object.id, key));
        }
    }

    /// `related` and `self` links of one relationship.
    pub(crate) fn relationship_links(&self, type_name: &str, id: &str, key: &str) -> Links {
        let mut links = Links::new();
        links.insert(
            "related".into(),
            Link::from(self.links.related(type_name, id, key)),
        );
        links.insert(
            "self".into(),
            Link::from(self.links.relationship(type_name, id, key)),
        );
        links
    }

    /// Loads one resource per identifier, in order.
    ///
    /// Every failure is collected; nothing is returned unless all succeed.
    pub(crate) async fn fetch_all(
        &self,
        identifiers: &[ResourceIdentifier],
    ) -> Result<Vec<ResourceObject>, ApiError> {
        let results = join_all(identifiers.iter().map(|ident| self.fetch(ident))).await;

        let mut objects = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(object) => objects.push(object),
                Err(e) => errors.push(e),
            }
        }
        match ApiError::aggregate(errors) {
            Some(error) => Err(error),
            None => Ok(objects),
        }
    }

    /// Loads the resources behind `identifiers` that still exist, in order.
    ///
    /// Dangling linkage is skipped; any other failure is collected as in
    /// [`fetch_all`](Self::fetch_all).
    pub(crate) async fn fetch_existing(
        &self,
        identifiers: &[ResourceIdentifier],
    ) -> Result<Vec<ResourceObject>, ApiError> {
        let results = join_all(identifiers.iter().map(|ident| self.fetch(ident))).await;

        let mut objects = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        for (ident, result) in identifiers.iter().zip(results) {
            match result {
                Ok(object) => objects.push(object),
                Err(e) if e.kind() == ErrorKind::NotFound => self.skip_dangling(ident),
                Err(e) => errors.push(e),
            }
        }
        match ApiError::aggregate(errors) {
            Some(error) => Err(error),
            None => Ok(objects),
        }
    }

    fn skip_dangling(&self, ident: &ResourceIdentifier) {
        tracing::debug!(
            request_id = %self.ctx.request_id(),
            resource = %ident.type_name,
            id = %ident.id,
            "Skipping dangling linkage"
        );
    }

    async fn fetch(&self, ident: &ResourceIdentifier) -> Result<ResourceObject, ApiError> {
        let binding = self.registry.get(&ident.type_name).ok_or_else(|| {
            ApiError::internal(format!(
                "linked resource type `{}` is not registered",
                ident.type_name
            ))
        })?;
        let mut object = binding.find_one(&ident.id, self.ctx).await?;
        self.present(&mut object);
        Ok(object)
    }

    /// Resolves the request's `include` paths starting from `primary`.
    ///
    /// Each resource appears once, and never if it is part of the primary
    /// data. Dangling linkage is skipped.
    pub(crate) async fn included(
        &self,
        primary: &[ResourceObject],
    ) -> Result<Vec<ResourceObject>, ApiError> {
        let primary_ids: HashSet<ResourceIdentifier> =
            primary.iter().map(ResourceObject::identifier).collect();
        let mut included: IndexMap<ResourceIdentifier, ResourceObject> = IndexMap::new();

        for path in self.ctx.include() {
            let mut frontier: Vec<ResourceObject> = primary.to_vec();
            for segment in path.segments() {
                let mut next = Vec::new();
                for object in &frontier {
                    let Some(linkage) = object.linkage(segment) else {
                        continue;
                    };
                    for ident in linkage.identifiers() {
                        if let Some(known) = included.get(ident) {
                            next.push(known.clone());
                        } else if primary_ids.contains(ident) {
                            if let Some(p) = primary.iter().find(|p| p.identifier() == *ident) {
                                next.push(p.clone());
                            }
                        } else {
                            match self.fetch(ident).await {
                                Ok(fetched) => {
                                    included.insert(ident.clone(), fetched.clone());
                                    next.push(fetched);
                                }
                                Err(e) if e.kind() == ErrorKind::NotFound => {
                                    self.skip_dangling(ident);
                                }
                                Err(e) => return Err(e),
                            }
                        }
                    }
                }
                frontier = next;
            }
        }

        Ok(included.into_values().collect())
    }

    /// `first`/`last`/`prev`/`next` links for a collection of `total` items.
    ///
    /// Query parameters other than pagination are carried over.
    pub(crate) fn pagination_links(
        &self,
        type_name: &str,
        pagination: &Pagination,
        total: usize,
    ) -> Links {
        let PageLinks {
            first,
            last,
            prev,
            next,
        } = pagination.links(total);
        let base = self.links.collection(type_name);

        let mut links = Links::new();
        for (name, page) in [
            ("first", Some(first)),
            ("last", Some(last)),
            ("prev", prev),
            ("next", next),
        ] {
            if let Some(page) = page {
                links.insert(name.into(), Link::from(self.page_url(&base, &page)));
            }
        }
        links
    }

    fn page_url(&self, base: &str, page: &Pagination) -> String {
        let pairs = self
            .ctx
            .raw_params()
            .iter()
            .filter(|(key, _)| !key.starts_with("page["))
            .map(|(key, value)| (key.as_str(), value.clone()))
            .chain(page.query_pairs());

        let query: Vec<String> = pairs
            .map(|(key, value)| format!("{}={}", encode_key(key), urlencoding::encode(&value)))
            .collect();
        format!("{base}?{}", query.join("&"))
    }
}

/// Percent-encodes a query key but keeps `[` and `]` readable.
fn encode_key(key: &str) -> String {
    urlencoding::encode(key)
        .replace("%5B", "[")
        .replace("%5D", "]")
}
