//! Example resources: users and the chocolates they like.
//!
//! Users are paged and sorted by their resource; chocolates return the full
//! set and leave paging to the dispatcher. Both keep their data in an
//! in-memory [`Store`] that hands out increasing numeric ids.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hypatia_core::{
    ApiError, Capabilities, Collection, Field, FieldSet, Meta, Model, RegistryError,
    RequestContext, Resource,
};
use hypatia_server::{Api, ApiConfig};
use parking_lot::RwLock;

/// Builds an API with [`UserResource`] and [`ChocolateResource`] under `prefix`.
pub fn try_api(prefix: &str) -> Result<Api, RegistryError> {
    let mut api = Api::new(ApiConfig::builder().prefix(prefix).build())?;
    api.add_resource(UserResource::default())?;
    api.add_resource(ChocolateResource::default())?;
    Ok(api)
}

/// Like [`try_api`], for prefixes known to be valid.
///
/// # Panics
///
/// Panics if `prefix` is not a valid path prefix.
pub fn api(prefix: &str) -> Api {
    match try_api(prefix) {
        Ok(api) => api,
        Err(e) => panic!("fixture setup failed: {e}"),
    }
}

/// A user with a favourite friend and a list of sweets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct User {
    /// Storage id
    pub id: String,
    /// Exposed as `user-name`
    pub username: String,
    /// Exposed as the to-many relationship `sweets`
    pub chocolate_ids: Vec<String>,
    /// Exposed as the to-one relationship `best-friend`
    pub best_friend_id: Option<String>,
}

impl Model for User {
    const TYPE: &'static str = "users";

    fn id(&self) -> String {
        self.id.clone()
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn fields() -> FieldSet<Self> {
        FieldSet::<Self>::new()
            .with(Field::<Self>::attribute("username", |u| &u.username, |u| &mut u.username).rename("user-name"))
            .with(
                Field::<Self>::to_many("chocolate_ids", "chocolates", |u| &u.chocolate_ids, |u| {
                    &mut u.chocolate_ids
                })
                .rename("sweets"),
            )
            .with(
                Field::<Self>::to_one("best_friend_id", "users", |u| &u.best_friend_id, |u| {
                    &mut u.best_friend_id
                })
                .rename("best-friend"),
            )
    }
}

/// A chocolate.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Chocolate {
    /// Storage id
    pub id: String,
    /// Product name
    pub name: String,
    /// How it tastes
    pub taste: String,
}

impl Model for Chocolate {
    const TYPE: &'static str = "chocolates";

    fn id(&self) -> String {
        self.id.clone()
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn fields() -> FieldSet<Self> {
        FieldSet::<Self>::new()
            .with(Field::<Self>::attribute("name", |c| &c.name, |c| &mut c.name).required())
            .with(Field::<Self>::attribute("taste", |c| &c.taste, |c| &mut c.taste))
    }
}

/// Thread-safe in-memory storage keyed by numeric id.
#[derive(Debug)]
pub struct Store<M> {
    items: RwLock<BTreeMap<u64, M>>,
    next_id: AtomicU64,
}

impl<M: Model> Store<M> {
    /// Creates an empty store; the first id handed out is `1`.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Stores `model` under a fresh id and returns it with that id set.
    pub fn insert(&self, mut model: M) -> M {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        model.set_id(id.to_string());
        self.items.write().insert(id, model.clone());
        model
    }

    /// Returns the model stored under `id`.
    pub fn get(&self, id: &str) -> Option<M> {
        let key: u64 = id.parse().ok()?;
        self.items.read().get(&key).cloned()
    }

    /// Returns every model in id order.
    pub fn all(&self) -> Vec<M> {
        self.items.read().values().cloned().collect()
    }

    /// Overwrites an existing model; returns `false` if there is none.
    pub fn replace(&self, model: M) -> bool {
        let Ok(key) = model.id().parse::<u64>() else {
            return false;
        };
        let mut items = self.items.write();
        match items.get_mut(&key) {
            Some(slot) => {
                *slot = model;
                true
            }
            None => false,
        }
    }

    /// Removes the model stored under `id`; returns `false` if there is none.
    pub fn remove(&self, id: &str) -> bool {
        id.parse()
            .ok()
            .is_some_and(|key: u64| self.items.write().remove(&key).is_some())
    }
}

impl<M: Model> Default for Store<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Users, paged and sorted by the resource itself.
#[derive(Debug, Default, Clone)]
pub struct UserResource {
    users: Arc<Store<User>>,
}

impl UserResource {
    /// Creates a resource over `users`.
    pub fn new(users: Arc<Store<User>>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Resource for UserResource {
    type Model = User;

    async fn find_all(&self, ctx: &RequestContext) -> Result<Collection<User>, ApiError> {
        let mut users = self.users.all();
        // Stable sorts applied from the last key to the first.
        for sort in ctx.sort().iter().rev() {
            let compare: fn(&User, &User) -> CmpOrdering = match sort.field.as_str() {
                "user-name" => |a, b| a.username.cmp(&b.username),
                "id" => |a, b| numeric_id(a).cmp(&numeric_id(b)),
                other => {
                    return Err(ApiError::invalid_query(
                        "sort",
                        format!("users cannot be sorted by `{other}`"),
                    ))
                }
            };
            if sort.descending {
                users.sort_by(|a, b| compare(b, a));
            } else {
                users.sort_by(compare);
            }
        }

        let total = users.len();
        match ctx.pagination() {
            Some(pagination) => {
                let window = pagination.window(total);
                let page = users.drain(window).collect();
                Ok(Collection::paged(page, total))
            }
            None => Ok(Collection::full(users)),
        }
    }

    async fn find_one(&self, id: &str, _ctx: &RequestContext) -> Result<User, ApiError> {
        self.users
            .get(id)
            .ok_or_else(|| ApiError::not_found_message(format!("User for id {id} not found")))
    }

    async fn create(&self, user: User, _ctx: &RequestContext) -> Result<User, ApiError> {
        if user.username.trim().is_empty() {
            return Err(ApiError::invalid_document_at(
                "user-name must not be empty",
                "/data/attributes/user-name",
            ));
        }
        Ok(self.users.insert(user))
    }

    async fn update(&self, user: User, _ctx: &RequestContext) -> Result<(), ApiError> {
        let id = user.id.clone();
        if self.users.replace(user) {
            Ok(())
        } else {
            Err(ApiError::not_found_message(format!("User for id {id} not found")))
        }
    }

    async fn delete(&self, id: &str, _ctx: &RequestContext) -> Result<(), ApiError> {
        if self.users.remove(id) {
            Ok(())
        } else {
            Err(ApiError::not_found_message(format!("User for id {id} not found")))
        }
    }

    fn meta(&self) -> Option<Meta> {
        let mut meta = Meta::new();
        meta.insert("author".into(), "The Hypatia examples crew".into());
        meta.insert("license".into(), "wtfpl".into());
        meta.insert("license-url".into(), "http://www.wtfpl.net".into());
        Some(meta)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }
}

fn numeric_id(user: &User) -> u64 {
    user.id.parse().unwrap_or_default()
}

/// Chocolates, filterable by `filter[taste]`.
#[derive(Debug, Default, Clone)]
pub struct ChocolateResource {
    chocolates: Arc<Store<Chocolate>>,
}

impl ChocolateResource {
    /// Creates a resource over `chocolates`.
    pub fn new(chocolates: Arc<Store<Chocolate>>) -> Self {
        Self { chocolates }
    }
}

#[async_trait]
impl Resource for ChocolateResource {
    type Model = Chocolate;

    async fn find_all(&self, ctx: &RequestContext) -> Result<Collection<Chocolate>, ApiError> {
        let mut chocolates = self.chocolates.all();
        if let Some(taste) = ctx.filter("taste") {
            chocolates.retain(|c| c.taste == taste);
        }
        Ok(Collection::full(chocolates))
    }

    async fn find_one(&self, id: &str, _ctx: &RequestContext) -> Result<Chocolate, ApiError> {
        self.chocolates
            .get(id)
            .ok_or_else(|| ApiError::not_found("chocolates", id))
    }

    async fn create(
        &self,
        chocolate: Chocolate,
        _ctx: &RequestContext,
    ) -> Result<Chocolate, ApiError> {
        Ok(self.chocolates.insert(chocolate))
    }

    async fn update(&self, chocolate: Chocolate, _ctx: &RequestContext) -> Result<(), ApiError> {
        let id = chocolate.id.clone();
        if self.chocolates.replace(chocolate) {
            Ok(())
        } else {
            Err(ApiError::not_found("chocolates", id))
        }
    }

    async fn delete(&self, id: &str, _ctx: &RequestContext) -> Result<(), ApiError> {
        if self.chocolates.remove(id) {
            Ok(())
        } else {
            Err(ApiError::not_found("chocolates", id))
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_ids_increase() {
        let store = Store::<Chocolate>::new();
        let a = store.insert(Chocolate::default());
        let b = store.insert(Chocolate::default());
        assert_eq!((a.id.as_str(), b.id.as_str()), ("1", "2"));

        assert!(store.remove("1"));
        assert!(!store.remove("1"));
        assert!(!store.remove("not-a-number"));
        assert_eq!(store.all(), vec![b]);
    }

    #[test]
    fn test_replace_requires_existing() {
        let store = Store::<User>::new();
        let mut user = store.insert(User {
            username: "Sansa".into(),
            ..User::default()
        });
        user.username = "Alayne".into();
        assert!(store.replace(user));
        assert_eq!(store.get("1").unwrap().username, "Alayne");

        let ghost = User {
            id: "9".into(),
            ..User::default()
        };
        assert!(!store.replace(ghost));
    }

    #[test]
    fn test_fixture_routes() {
        let api = api("api");
        // users: 7 base routes + 5 per relationship (sweets, best-friend);
        // chocolates: 7 base routes.
        assert_eq!(api.routes().len(), 7 + 10 + 7);
        assert!(api.registry().dangling_relationships().is_empty());
    }
}
