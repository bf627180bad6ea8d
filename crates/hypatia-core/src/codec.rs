//! Conversion between models and JSON:API resource objects.
//!
//! Encoding walks a model's [`FieldSet`]; decoding applies a resource
//! object onto a model, touching only the members the object carries so
//! the same code serves creates and partial updates.
//!
//! Request bodies are parsed from raw JSON rather than deserialised
//! straight into [`Document`](crate::Document): every structural problem is
//! reported with a JSON pointer to the offending member, and all problems
//! found in one body are returned together.

use serde_json::{Map, Value};

use crate::document::{Linkage, Relationship, ResourceIdentifier, ResourceObject};
use crate::error::ApiError;
use crate::field::{Accessor, Field, FieldKind, FieldSet};
use crate::resource::Model;

/// What a decoded body is going to be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// `POST /R`: required members must be present, the id is copied over
    Create,
    /// `PATCH /R/{id}`: only members present are applied, the id is untouched
    Update,
}

/// Encodes a model as a resource object.
///
/// Empty relationships are always written: `[]` for to-many and `null` for
/// to-one. Links are left to the caller, which knows the base URL.
pub fn encode<M: Model>(model: &M, fields: &FieldSet<M>) -> Result<ResourceObject, ApiError> {
    let mut object = ResourceObject::new(M::TYPE, model.id());

    for field in fields.iter() {
        match &field.accessor {
            Accessor::Attribute { read, .. } => {
                let value = read(model).map_err(|e| {
                    ApiError::internal_with_source(
                        format!("failed to serialise {}.{}", M::TYPE, field.name()),
                        e,
                    )
                })?;
                object.attributes.insert(field.key().to_string(), value);
            }
            Accessor::ToOne { .. } | Accessor::ToMany { .. } => {
                object.relationships.insert(
                    field.key().to_string(),
                    Relationship {
                        data: Some(read_linkage(model, field)),
                        ..Relationship::default()
                    },
                );
            }
        }
    }

    Ok(object)
}

/// Applies a resource object onto `model`.
///
/// Unknown attribute and relationship keys are ignored. All problems are
/// collected and returned as one aggregated error.
pub fn decode_into<M: Model>(
    model: &mut M,
    object: &ResourceObject,
    fields: &FieldSet<M>,
    mode: DecodeMode,
) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if mode == DecodeMode::Create {
        model.set_id(object.id.clone());

        for field in fields.iter().filter(|f| f.is_required()) {
            let (present, section) = if field.kind().is_relationship() {
                (object.linkage(field.key()).is_some(), "relationships")
            } else {
                (object.attributes.contains_key(field.key()), "attributes")
            };
            if !present {
                errors.push(ApiError::invalid_document_at(
                    format!("missing required member `{}`", field.key()),
                    format!("/data/{section}/{}", field.key()),
                ));
            }
        }
    }

    for (key, value) in &object.attributes {
        let Some(field) = fields.get(key) else {
            continue;
        };
        let Accessor::Attribute { write, .. } = &field.accessor else {
            continue;
        };
        let pointer = format!("/data/attributes/{key}");
        if value.is_null() && !field.is_nullable() {
            errors.push(ApiError::invalid_document_at(
                format!("attribute `{key}` must not be null"),
                pointer,
            ));
            continue;
        }
        if let Err(e) = write(model, value.clone()) {
            errors.push(ApiError::invalid_document_at(
                format!("invalid value for attribute `{key}`: {e}"),
                pointer,
            ));
        }
    }

    for (key, relationship) in &object.relationships {
        let (Some(field), Some(linkage)) = (fields.get(key), relationship.data.as_ref()) else {
            continue;
        };
        if !field.kind().is_relationship() {
            continue;
        }
        let pointer = format!("/data/relationships/{key}/data");
        match check_linkage(field, linkage, &pointer) {
            Ok(()) => write_linkage(model, field, linkage.clone()),
            Err(e) => errors.push(e),
        }
    }

    match ApiError::aggregate(errors) {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Reads the current linkage of a relationship field.
pub(crate) fn read_linkage<M>(model: &M, field: &Field<M>) -> Linkage {
    let related = field.kind().related().unwrap_or_default();
    match &field.accessor {
        Accessor::ToOne { get, .. } => Linkage::ToOne(
            get(model)
                .as_deref()
                .filter(|id| !id.is_empty())
                .map(|id| ResourceIdentifier::new(related, id)),
        ),
        Accessor::ToMany { get, .. } => Linkage::ToMany(
            get(model)
                .iter()
                .map(|id| ResourceIdentifier::new(related, id.as_str()))
                .collect(),
        ),
        Accessor::Attribute { .. } => Linkage::default(),
    }
}

/// Overwrites the linkage of a relationship field.
///
/// The linkage must already have passed [`check_linkage`].
pub(crate) fn write_linkage<M>(model: &mut M, field: &Field<M>, linkage: Linkage) {
    match (&field.accessor, linkage) {
        (Accessor::ToOne { get_mut, .. }, Linkage::ToOne(id)) => {
            *get_mut(model) = id.map(|id| id.id);
        }
        (Accessor::ToMany { get_mut, .. }, Linkage::ToMany(ids)) => {
            *get_mut(model) = ids.into_iter().map(|id| id.id).collect();
        }
        _ => {}
    }
}

/// Checks that a linkage fits a relationship field: right cardinality and
/// identifiers of the related type.
pub(crate) fn check_linkage<M>(
    field: &Field<M>,
    linkage: &Linkage,
    pointer: &str,
) -> Result<(), ApiError> {
    let (related, many) = match field.kind() {
        FieldKind::ToOne { related } => (*related, false),
        FieldKind::ToMany { related } => (*related, true),
        FieldKind::Attribute => {
            return Err(ApiError::invalid_document_at(
                format!("`{}` is not a relationship", field.key()),
                pointer,
            ))
        }
    };

    match (linkage, many) {
        (Linkage::ToMany(_), false) => {
            return Err(ApiError::invalid_document_at(
                format!("`{}` is a to-one relationship; expected an object or null", field.key()),
                pointer,
            ))
        }
        (Linkage::ToOne(_), true) => {
            return Err(ApiError::invalid_document_at(
                format!("`{}` is a to-many relationship; expected an array", field.key()),
                pointer,
            ))
        }
        _ => {}
    }

    let errors: Vec<ApiError> = linkage
        .identifiers()
        .filter(|id| id.type_name != related)
        .map(|id| ApiError::type_mismatch(related, id.type_name.clone(), pointer))
        .collect();
    match ApiError::aggregate(errors) {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Restricts a resource object's attributes to a sparse fieldset.
///
/// Relationships are left alone so linkage stays intact.
pub fn apply_fieldset(object: &mut ResourceObject, fields: &[String]) {
    object
        .attributes
        .retain(|key, _| fields.iter().any(|f| f == key));
}

fn parse_json(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::invalid_document_at(
            "request document must be a JSON object",
            "",
        )),
        Err(e) => Err(ApiError::invalid_document(format!(
            "request body is not valid JSON: {e}"
        ))),
    }
}

/// Parses a request body carrying a single resource object.
///
/// The `type` member is mandatory; `id` may be omitted and is then empty.
pub fn parse_resource_document(body: &[u8]) -> Result<ResourceObject, ApiError> {
    let mut document = parse_json(body)?;
    let Some(data) = document.remove("data") else {
        return Err(ApiError::invalid_document_at("missing primary data", "/data"));
    };
    let Value::Object(mut data) = data else {
        return Err(ApiError::invalid_document_at(
            "primary data must be a single resource object",
            "/data",
        ));
    };

    let mut errors = Vec::new();
    let mut object = ResourceObject::default();

    match data.remove("type") {
        Some(Value::String(t)) if !t.is_empty() => object.type_name = t,
        Some(_) => errors.push(ApiError::invalid_document_at(
            "`type` must be a non-empty string",
            "/data/type",
        )),
        None => errors.push(ApiError::invalid_document_at(
            "resource object is missing `type`",
            "/data/type",
        )),
    }

    match data.remove("id") {
        Some(Value::String(id)) => object.id = id,
        Some(_) => errors.push(ApiError::invalid_document_at(
            "`id` must be a string",
            "/data/id",
        )),
        None => {}
    }

    match data.remove("attributes") {
        Some(Value::Object(attributes)) => object.attributes = attributes,
        Some(_) => errors.push(ApiError::invalid_document_at(
            "`attributes` must be an object",
            "/data/attributes",
        )),
        None => {}
    }

    match data.remove("relationships") {
        Some(Value::Object(relationships)) => {
            for (key, value) in relationships {
                let pointer = format!("/data/relationships/{key}");
                match value {
                    Value::Object(mut rel) => {
                        let data = match rel.remove("data") {
                            Some(value) => {
                                match parse_linkage(&value, &format!("{pointer}/data")) {
                                    Ok(linkage) => Some(linkage),
                                    Err(e) => {
                                        errors.push(e);
                                        continue;
                                    }
                                }
                            }
                            None => None,
                        };
                        object.relationships.insert(
                            key,
                            Relationship {
                                data,
                                ..Relationship::default()
                            },
                        );
                    }
                    _ => errors.push(ApiError::invalid_document_at(
                        "relationship must be an object",
                        pointer,
                    )),
                }
            }
        }
        Some(_) => errors.push(ApiError::invalid_document_at(
            "`relationships` must be an object",
            "/data/relationships",
        )),
        None => {}
    }

    match ApiError::aggregate(errors) {
        Some(error) => Err(error),
        None => Ok(object),
    }
}

/// Parses a relationship request body: `{"data": null | {..} | [..]}`.
pub fn parse_linkage_document(body: &[u8]) -> Result<Linkage, ApiError> {
    let document = parse_json(body)?;
    match document.get("data") {
        Some(data) => parse_linkage(data, "/data"),
        None => Err(ApiError::invalid_document_at("missing primary data", "/data")),
    }
}

fn parse_linkage(value: &Value, pointer: &str) -> Result<Linkage, ApiError> {
    match value {
        Value::Null => Ok(Linkage::ToOne(None)),
        Value::Object(_) => parse_identifier(value, pointer).map(|id| Linkage::ToOne(Some(id))),
        Value::Array(items) => {
            let mut ids = Vec::with_capacity(items.len());
            let mut errors = Vec::new();
            for (i, item) in items.iter().enumerate() {
                match parse_identifier(item, &format!("{pointer}/{i}")) {
                    Ok(id) => ids.push(id),
                    Err(e) => errors.push(e),
                }
            }
            match ApiError::aggregate(errors) {
                Some(error) => Err(error),
                None => Ok(Linkage::ToMany(ids)),
            }
        }
        _ => Err(ApiError::invalid_document_at(
            "linkage must be null, a resource identifier or an array of them",
            pointer,
        )),
    }
}

fn parse_identifier(value: &Value, pointer: &str) -> Result<ResourceIdentifier, ApiError> {
    let type_name = value.get("type").and_then(Value::as_str).unwrap_or_default();
    let id = value.get("id").and_then(Value::as_str).unwrap_or_default();
    if type_name.is_empty() || id.is_empty() {
        return Err(ApiError::invalid_document_at(
            "resource identifier needs a non-empty `type` and `id`",
            pointer,
        ));
    }
    Ok(ResourceIdentifier::new(type_name, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::field::Field;
    use serde_json::json;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct User {
        id: String,
        username: String,
        nickname: Option<String>,
        mentor_id: Option<String>,
        chocolate_ids: Vec<String>,
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
                .with(
                    Field::<Self>::attribute("username", |u| &u.username, |u| &mut u.username)
                        .rename("user-name")
                        .required(),
                )
                .with(Field::<Self>::attribute("nickname", |u| &u.nickname, |u| &mut u.nickname).nullable())
                .with(Field::<Self>::to_one("mentor_id", "users", |u| &u.mentor_id, |u| &mut u.mentor_id).rename("mentor"))
                .with(
                    Field::<Self>::to_many(
                        "chocolate_ids",
                        "chocolates",
                        |u| &u.chocolate_ids,
                        |u| &mut u.chocolate_ids,
                    )
                    .rename("sweets"),
                )
        }
    }

    fn sansa() -> User {
        User {
            id: "1".into(),
            username: "Sansa Stark".into(),
            nickname: None,
            mentor_id: None,
            chocolate_ids: Vec::new(),
        }
    }

    #[test]
    fn test_encode_writes_empty_relationships() {
        let object = encode(&sansa(), &User::fields()).unwrap();
        let value = serde_json::to_value(&object).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "users",
                "id": "1",
                "attributes": {"user-name": "Sansa Stark", "nickname": null},
                "relationships": {
                    "mentor": {"data": null},
                    "sweets": {"data": []}
                }
            })
        );
    }

    #[test]
    fn test_encode_then_decode_is_lossless() {
        let mut user = sansa();
        user.nickname = Some("Little Dove".into());
        user.mentor_id = Some("2".into());
        user.chocolate_ids = vec!["1".into(), "3".into()];

        let fields = User::fields();
        let object = encode(&user, &fields).unwrap();
        let mut back = User::default();
        decode_into(&mut back, &object, &fields, DecodeMode::Create).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_decode_ignores_unknown_members() {
        let body = br#"{"data":{"type":"users","attributes":{"user-name":"Arya","house":"Stark"},
            "relationships":{"direwolf":{"data":{"type":"wolves","id":"1"}}}}}"#;
        let object = parse_resource_document(body).unwrap();
        let mut user = User::default();
        decode_into(&mut user, &object, &User::fields(), DecodeMode::Create).unwrap();
        assert_eq!(user.username, "Arya");
        assert_eq!(user.id, "");
    }

    #[test]
    fn test_decode_update_only_touches_present_members() {
        let mut user = sansa();
        user.chocolate_ids = vec!["1".into()];
        let object = parse_resource_document(
            br#"{"data":{"type":"users","id":"1","attributes":{"user-name":"Alayne"}}}"#,
        )
        .unwrap();

        decode_into(&mut user, &object, &User::fields(), DecodeMode::Update).unwrap();
        assert_eq!(user.username, "Alayne");
        assert_eq!(user.chocolate_ids, vec!["1".to_string()]);
    }

    #[test]
    fn test_decode_missing_required_attribute() {
        let object = parse_resource_document(br#"{"data":{"type":"users"}}"#).unwrap();
        let err = decode_into(&mut User::default(), &object, &User::fields(), DecodeMode::Create)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDocument);
        assert_eq!(
            err.to_error_objects()[0]
                .source
                .as_ref()
                .and_then(|s| s.pointer.as_deref()),
            Some("/data/attributes/user-name")
        );
    }

    #[test]
    fn test_decode_rejects_null_for_non_nullable() {
        let object = parse_resource_document(
            br#"{"data":{"type":"users","attributes":{"user-name":null,"nickname":null}}}"#,
        )
        .unwrap();
        let err = decode_into(&mut User::default(), &object, &User::fields(), DecodeMode::Update)
            .unwrap_err();
        assert_eq!(err.to_error_objects().len(), 1);
    }

    #[test]
    fn test_decode_rejects_wrong_related_type_and_cardinality() {
        let object = parse_resource_document(
            br#"{"data":{"type":"users","attributes":{"user-name":"x"},
                "relationships":{
                    "sweets":{"data":[{"type":"users","id":"1"}]},
                    "mentor":{"data":[]}
                }}}"#,
        )
        .unwrap();
        let err = decode_into(&mut User::default(), &object, &User::fields(), DecodeMode::Create)
            .unwrap_err();
        let objects = err.to_error_objects();
        let mut codes: Vec<_> = objects.iter().filter_map(|o| o.code.as_deref()).collect();
        codes.sort_unstable();
        assert_eq!(codes, vec!["INVALID_DOCUMENT", "TYPE_MISMATCH"]);
    }

    #[test]
    fn test_parse_missing_type() {
        let err = parse_resource_document(br#"{"data":{"attributes":{}}}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDocument);
        assert_eq!(
            err.to_error_objects()[0]
                .source
                .as_ref()
                .and_then(|s| s.pointer.as_deref()),
            Some("/data/type")
        );
    }

    #[test]
    fn test_parse_rejects_non_json_and_non_objects() {
        assert!(parse_resource_document(b"not json").is_err());
        assert!(parse_resource_document(b"[]").is_err());
        assert!(parse_resource_document(br#"{"data":[]}"#).is_err());
        assert!(parse_resource_document(br#"{"meta":{}}"#).is_err());
    }

    #[test]
    fn test_parse_aggregates_structural_errors() {
        let err = parse_resource_document(br#"{"data":{"type":"","id":7,"attributes":[]}}"#)
            .unwrap_err();
        assert_eq!(err.to_error_objects().len(), 3);
    }

    #[test]
    fn test_parse_linkage_document() {
        assert_eq!(
            parse_linkage_document(br#"{"data":null}"#).unwrap(),
            Linkage::ToOne(None)
        );
        assert_eq!(
            parse_linkage_document(br#"{"data":{"type":"users","id":"2"}}"#).unwrap(),
            Linkage::ToOne(Some(ResourceIdentifier::new("users", "2")))
        );
        assert_eq!(
            parse_linkage_document(br#"{"data":[{"type":"chocolates","id":"1"}]}"#).unwrap(),
            Linkage::ToMany(vec![ResourceIdentifier::new("chocolates", "1")])
        );
        assert!(parse_linkage_document(br#"{"data":[{"type":"chocolates"}]}"#).is_err());
        assert!(parse_linkage_document(br#"{"data":"1"}"#).is_err());
        assert!(parse_linkage_document(br"{}").is_err());
    }

    #[test]
    fn test_apply_fieldset() {
        let mut user = sansa();
        user.nickname = Some("Little Dove".into());
        let mut object = encode(&user, &User::fields()).unwrap();
        apply_fieldset(&mut object, &["nickname".to_string()]);
        assert_eq!(object.attributes.len(), 1);
        assert!(object.attributes.contains_key("nickname"));
        assert_eq!(object.relationships.len(), 2);
    }
}
