//! Request dispatch.
//!
//! One request runs through these steps:
//!
//! 1. resolve the route, or hand over to the [`FallbackHandler`]
//! 2. negotiate content types
//! 3. parse the query string into a [`RequestContext`] and check it
//!    against registered field metadata
//! 4. read and decode the body, if the action takes one
//! 5. call the resource binding
//! 6. encode the result, or the error, as a JSON:API document
//!
//! Steps 2 to 6 run inside a panic guard: a panicking resource produces a
//! 500 error document and the connection stays up.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures_util::FutureExt;
use http::request::Parts;
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hypatia_core::{
    codec, ApiError, Document, FieldKind, Linkage, LinkageOp, Links, QueryParser, Registry,
    RequestContext, RequestId, ResourceBinding, ResourceObject,
};
use hypatia_router::{Resolution, Routeable};
use hypatia_telemetry::{log_request_complete, log_request_error, log_request_start};

use crate::config::ApiConfig;
use crate::fallback::FallbackHandler;
use crate::negotiate;
use crate::present::Presenter;
use crate::response::{self, HttpResponse};
use crate::routes::{Action, Endpoint};
use crate::url::{LinkBuilder, UrlResolver};

/// Everything a request needs, shared read-only by all request tasks.
pub(crate) struct Dispatcher {
    pub(crate) config: ApiConfig,
    pub(crate) registry: Registry,
    pub(crate) router: Box<dyn Routeable<Endpoint>>,
    pub(crate) resolver: Arc<dyn UrlResolver>,
    pub(crate) fallback: Arc<dyn FallbackHandler>,
    pub(crate) query_parser: QueryParser,
}

/// Per-request inputs threaded through the action handlers.
struct Call<'a> {
    endpoint: &'a Endpoint,
    binding: &'a Arc<dyn ResourceBinding>,
    id: String,
    presenter: Presenter<'a>,
}

impl Dispatcher {
    pub(crate) async fn handle<B>(&self, request: Request<B>) -> HttpResponse
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let request_id = RequestId::new();
        let started = Instant::now();
        let _in_flight = hypatia_telemetry::InFlightGuard::new();

        let (parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();
        log_request_start!(request_id, parts.method, path);

        let (resource, operation, response) = match self.router.resolve(&parts.method, &path) {
            Resolution::Matched { handler, params } => {
                let raw_id = params.get("id").unwrap_or_default();
                let id = urlencoding::decode(raw_id).map_or_else(|_| raw_id.to_string(), Cow::into_owned);
                let response = self.guarded(handler, id, &parts, body, request_id).await;
                (handler.resource.clone(), handler.operation_id(), response)
            }
            Resolution::MethodNotAllowed { allowed } => {
                let response = self
                    .fallback
                    .method_not_allowed(&parts.method, &path, &allowed, request_id);
                (String::new(), "method_not_allowed".to_string(), response)
            }
            Resolution::NotFound => {
                let response = self.fallback.not_found(&parts.method, &path, request_id);
                (String::new(), "not_found".to_string(), response)
            }
        };

        let elapsed = started.elapsed();
        let status = response.status().as_u16();
        log_request_complete!(
            request_id,
            operation,
            status,
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        );
        hypatia_telemetry::record_request(&resource, &operation, status, elapsed);
        response
    }

    /// Runs one matched endpoint, turning errors and panics into documents.
    async fn guarded<B>(
        &self,
        endpoint: &Endpoint,
        id: String,
        parts: &Parts,
        body: B,
        request_id: RequestId,
    ) -> HttpResponse
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let outcome = AssertUnwindSafe(self.dispatch(endpoint, id, parts, body, request_id))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                if error.is_server_error() {
                    log_request_error!(request_id, endpoint.operation_id(), error);
                } else {
                    tracing::debug!(
                        request_id = %request_id,
                        operation_id = %endpoint.operation_id(),
                        error = %error,
                        "Request rejected"
                    );
                }
                response::error(&error, request_id)
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(
                    request_id = %request_id,
                    operation_id = %endpoint.operation_id(),
                    resource = %endpoint.resource,
                    panic_message = %message,
                    "Handler panicked"
                );
                hypatia_telemetry::record_panic(&endpoint.resource);
                response::error(&ApiError::internal("handler panicked"), request_id)
            }
        }
    }

    async fn dispatch<B>(
        &self,
        endpoint: &Endpoint,
        id: String,
        parts: &Parts,
        body: B,
        request_id: RequestId,
    ) -> Result<HttpResponse, ApiError>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let binding = self.registry.get(&endpoint.resource).ok_or_else(|| {
            ApiError::internal(format!(
                "route bound to unregistered resource `{}`",
                endpoint.resource
            ))
        })?;

        if let Action::Options { collection } = endpoint.action {
            return Ok(options(binding.as_ref(), collection));
        }

        negotiate::check_accept(&parts.headers)?;
        let query = self.query_parser.parse(parts.uri.query().unwrap_or_default())?;
        let ctx = RequestContext::new(request_id, query).with_operation_id(endpoint.operation_id());

        let call = Call {
            endpoint,
            binding,
            id,
            presenter: Presenter {
                registry: &self.registry,
                links: LinkBuilder::new(&self.resolver.base_url(&parts.headers), self.config.prefix()),
                ctx: &ctx,
            },
        };

        match &endpoint.action {
            Action::FindAll => self.find_all(&call).await,
            Action::FindOne => self.find_one(&call).await,
            Action::Create => {
                let body = self.read_body(parts, body).await?;
                self.create(&call, &body).await
            }
            Action::Update => {
                let body = self.read_body(parts, body).await?;
                self.update(&call, &body).await
            }
            Action::Delete => {
                binding.delete(&call.id, &ctx).await?;
                Ok(response::empty(StatusCode::NO_CONTENT))
            }
            Action::Related(key) => self.related(&call, key).await,
            Action::RelationshipRead(key) => self.relationship_read(&call, key).await,
            Action::RelationshipReplace(key) => {
                let body = self.read_body(parts, body).await?;
                let linkage = codec::parse_linkage_document(&body)?;
                self.mutate_linkage(&call, key, linkage, LinkageKind::Replace).await
            }
            Action::RelationshipAdd(key) => {
                let body = self.read_body(parts, body).await?;
                let linkage = codec::parse_linkage_document(&body)?;
                self.mutate_linkage(&call, key, linkage, LinkageKind::Add).await
            }
            Action::RelationshipRemove(key) => {
                let body = self.read_body(parts, body).await?;
                let linkage = codec::parse_linkage_document(&body)?;
                self.mutate_linkage(&call, key, linkage, LinkageKind::Remove).await
            }
            Action::Options { collection } => Ok(options(binding.as_ref(), *collection)),
        }
    }

    /// Checks the content type and reads the body within the size limit.
    async fn read_body<B>(&self, parts: &Parts, body: B) -> Result<Bytes, ApiError>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        negotiate::check_content_type(&parts.headers)?;

        let limit = self.config.max_body_size();
        match Limited::new(body, limit).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(ApiError::http(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("request body exceeds {limit} bytes"),
            )),
            Err(e) => Err(ApiError::invalid_document(format!(
                "failed to read request body: {e}"
            ))),
        }
    }

    /// Wraps primary data into a document with resource meta and includes.
    async fn finish(
        &self,
        call: &Call<'_>,
        mut document: Document,
        primary: &[ResourceObject],
    ) -> Result<Document, ApiError> {
        document.included = call.presenter.included(primary).await?;
        if let Some(meta) = call.binding.meta() {
            document = document.with_meta(meta);
        }
        Ok(document)
    }

    fn validate_query(&self, call: &Call<'_>, primary_type: &str) -> Result<(), ApiError> {
        self.registry.validate_query(primary_type, call.presenter.ctx)
    }

    async fn find_all(&self, call: &Call<'_>) -> Result<HttpResponse, ApiError> {
        let type_name = call.endpoint.resource.as_str();
        self.validate_query(call, type_name)?;

        let ctx = call.presenter.ctx;
        let collection = call.binding.find_all(ctx).await?;
        let total = collection.total();
        let already_paged = collection.is_paged();
        let mut items = collection.into_items();

        let mut links: Option<Links> = None;
        if let Some(pagination) = ctx.pagination() {
            if !already_paged {
                let window = pagination.window(total);
                items = items.into_iter().skip(window.start).take(window.len()).collect();
            }
            links = Some(call.presenter.pagination_links(type_name, pagination, total));
        }

        for item in &mut items {
            call.presenter.present(item);
        }
        let mut document = Document::collection(items.clone());
        if let Some(links) = links {
            document = document.with_links(links);
        }
        let document = self.finish(call, document, &items).await?;
        Ok(response::document(StatusCode::OK, &document))
    }

    async fn find_one(&self, call: &Call<'_>) -> Result<HttpResponse, ApiError> {
        self.validate_query(call, &call.endpoint.resource)?;

        let mut object = call.binding.find_one(&call.id, call.presenter.ctx).await?;
        call.presenter.present(&mut object);
        let primary = [object];
        let document = Document::single(primary[0].clone());
        let document = self.finish(call, document, &primary).await?;
        Ok(response::document(StatusCode::OK, &document))
    }

    fn parse_body_object(&self, call: &Call<'_>, body: &[u8]) -> Result<ResourceObject, ApiError> {
        let object = codec::parse_resource_document(body)?;
        if object.type_name != call.endpoint.resource {
            return Err(ApiError::type_mismatch(
                call.endpoint.resource.clone(),
                object.type_name,
                "/data/type",
            ));
        }
        Ok(object)
    }

    async fn create(&self, call: &Call<'_>, body: &[u8]) -> Result<HttpResponse, ApiError> {
        self.validate_query(call, &call.endpoint.resource)?;
        let object = self.parse_body_object(call, body)?;

        let mut created = call.binding.create(&object, call.presenter.ctx).await?;
        if created.id.is_empty() {
            return Err(ApiError::internal(format!(
                "{} create returned a resource without id",
                call.endpoint.resource
            )));
        }
        call.presenter.present(&mut created);

        let location = call
            .presenter
            .links
            .resource(&call.endpoint.resource, &created.id);
        let primary = [created];
        let document = Document::single(primary[0].clone());
        let document = self.finish(call, document, &primary).await?;
        Ok(response::created(&document, &location))
    }

    async fn update(&self, call: &Call<'_>, body: &[u8]) -> Result<HttpResponse, ApiError> {
        let object = self.parse_body_object(call, body)?;
        if !object.id.is_empty() && object.id != call.id {
            return Err(ApiError::conflict(format!(
                "body id `{}` does not match URL id `{}`",
                object.id, call.id
            )));
        }

        call.binding
            .update(&call.id, &object, call.presenter.ctx)
            .await?;
        Ok(response::empty(StatusCode::NO_CONTENT))
    }

    async fn owner_linkage(&self, call: &Call<'_>, key: &str) -> Result<Linkage, ApiError> {
        let owner = call.binding.find_one(&call.id, call.presenter.ctx).await?;
        Ok(owner.linkage(key).cloned().unwrap_or_default())
    }

    /// Related resources of the owner. Linkage to resources that no longer
    /// exist is left out, as it is from `included`.
    async fn related(&self, call: &Call<'_>, key: &str) -> Result<HttpResponse, ApiError> {
        if let Some(related) = relationship_kind(call, key)?.related() {
            self.validate_query(call, related)?;
        }

        let (document, primary) = match self.owner_linkage(call, key).await? {
            Linkage::ToOne(None) => (Document::null(), Vec::new()),
            Linkage::ToOne(Some(ident)) => {
                match call.presenter.fetch_existing(&[ident]).await?.pop() {
                    Some(object) => (Document::single(object.clone()), vec![object]),
                    None => (Document::null(), Vec::new()),
                }
            }
            Linkage::ToMany(idents) => {
                let objects = call.presenter.fetch_existing(&idents).await?;
                (Document::collection(objects.clone()), objects)
            }
        };

        let document = self.finish(call, document, &primary).await?;
        Ok(response::document(StatusCode::OK, &document))
    }

    async fn relationship_read(&self, call: &Call<'_>, key: &str) -> Result<HttpResponse, ApiError> {
        let linkage = self.owner_linkage(call, key).await?;
        let links = call
            .presenter
            .relationship_links(&call.endpoint.resource, &call.id, key);

        let mut document = Document::linkage(linkage).with_links(links);
        if let Some(meta) = call.binding.meta() {
            document = document.with_meta(meta);
        }
        Ok(response::document(StatusCode::OK, &document))
    }

    async fn mutate_linkage(
        &self,
        call: &Call<'_>,
        key: &str,
        linkage: Linkage,
        kind: LinkageKind,
    ) -> Result<HttpResponse, ApiError> {
        let field = relationship_kind(call, key)?;
        let related = field.related().unwrap_or_default();

        let op = match (kind, field) {
            (LinkageKind::Replace, _) => {
                let fits = matches!(
                    (field, &linkage),
                    (FieldKind::ToOne { .. }, Linkage::ToOne(_))
                        | (FieldKind::ToMany { .. }, Linkage::ToMany(_))
                );
                if !fits {
                    return Err(ApiError::invalid_document_at(
                        format!("linkage does not match the cardinality of `{key}`"),
                        "/data",
                    ));
                }
                LinkageOp::Replace(linkage.clone())
            }
            (_, FieldKind::ToOne { .. }) => {
                return Err(ApiError::method_not_allowed(format!(
                    "`{key}` is a to-one relationship; use PATCH to replace it"
                )))
            }
            (kind, _) => {
                let Linkage::ToMany(idents) = &linkage else {
                    return Err(ApiError::invalid_document_at(
                        format!("`{key}` is a to-many relationship; expected an array"),
                        "/data",
                    ));
                };
                let mismatched: Vec<ApiError> = idents
                    .iter()
                    .filter(|i| i.type_name != related)
                    .map(|i| ApiError::type_mismatch(related, i.type_name.clone(), "/data"))
                    .collect();
                if let Some(error) = ApiError::aggregate(mismatched) {
                    return Err(error);
                }
                let ids = idents.iter().map(|i| i.id.clone()).collect();
                if matches!(kind, LinkageKind::Add) {
                    LinkageOp::Add(ids)
                } else {
                    LinkageOp::Remove(ids)
                }
            }
        };

        // Targets must exist before anything is written; removal does not care.
        if !matches!(op, LinkageOp::Remove(_)) {
            self.check_targets(call, related, &linkage).await?;
        }

        call.binding
            .mutate_relationship(&call.id, key, op, call.presenter.ctx)
            .await?;
        Ok(response::empty(StatusCode::NO_CONTENT))
    }

    /// Fails with every missing target if any linked resource does not exist.
    async fn check_targets(
        &self,
        call: &Call<'_>,
        related: &str,
        linkage: &Linkage,
    ) -> Result<(), ApiError> {
        let Some(binding) = self.registry.get(related) else {
            return Ok(());
        };
        if !binding.capabilities().find_one {
            return Ok(());
        }

        let idents: Vec<_> = linkage
            .identifiers()
            .filter(|i| i.type_name == related)
            .cloned()
            .collect();
        call.presenter.fetch_all(&idents).await.map(|_| ())
    }
}

#[derive(Debug, Clone, Copy)]
enum LinkageKind {
    Replace,
    Add,
    Remove,
}

fn relationship_kind(call: &Call<'_>, key: &str) -> Result<FieldKind, ApiError> {
    call.binding
        .schema()
        .relationship(key)
        .map(|f| f.kind)
        .ok_or_else(|| {
            ApiError::not_found_message(format!(
                "{} has no relationship `{key}`",
                call.endpoint.resource
            ))
        })
}

/// `204` with the methods the resource actually supports.
fn options(binding: &dyn ResourceBinding, collection: bool) -> HttpResponse {
    let caps = binding.capabilities();
    let candidates = if collection {
        vec![(caps.find_all, Method::GET), (caps.create, Method::POST)]
    } else {
        vec![
            (caps.find_one, Method::GET),
            (caps.update, Method::PATCH),
            (caps.delete, Method::DELETE),
        ]
    };
    let mut allowed: Vec<Method> = candidates
        .into_iter()
        .filter_map(|(supported, method)| supported.then_some(method))
        .collect();
    allowed.push(Method::OPTIONS);
    response::with_allow(response::empty(StatusCode::NO_CONTENT), &allowed)
}
