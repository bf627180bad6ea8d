//! Content negotiation.
//!
//! JSON:API forbids media type parameters on `application/vnd.api+json`.
//! A request body carrying them is answered with 415; an `Accept` header
//! that offers the JSON:API media type only with parameters gets 406.
//! Plain `application/json` is accepted on both sides.

use http::header::{ACCEPT, CONTENT_TYPE};
use http::HeaderMap;
use hypatia_core::{ApiError, MEDIA_TYPE};

struct MediaRange<'a> {
    essence: String,
    params: Vec<&'a str>,
}

fn parse_media_range(raw: &str) -> MediaRange<'_> {
    let mut parts = raw.split(';').map(str::trim);
    let essence = parts.next().unwrap_or_default().to_ascii_lowercase();
    let params = parts
        .filter(|p| !p.is_empty())
        // `q` is an accept-param, not a media type parameter.
        .filter(|p| !p.to_ascii_lowercase().starts_with("q="))
        .collect();
    MediaRange { essence, params }
}

/// Checks the `Content-Type` of a request that carries a body.
///
/// A missing header is tolerated.
pub(crate) fn check_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Ok(());
    };
    let raw = value
        .to_str()
        .map_err(|_| ApiError::unsupported_media_type("Content-Type is not valid ASCII"))?;
    let range = parse_media_range(raw);

    match range.essence.as_str() {
        MEDIA_TYPE if range.params.is_empty() => Ok(()),
        MEDIA_TYPE => Err(ApiError::unsupported_media_type(format!(
            "{MEDIA_TYPE} must not carry media type parameters"
        ))),
        "application/json" => Ok(()),
        other => Err(ApiError::unsupported_media_type(format!(
            "unsupported Content-Type `{other}`, expected {MEDIA_TYPE}"
        ))),
    }
}

/// Checks the `Accept` header.
pub(crate) fn check_accept(headers: &HeaderMap) -> Result<(), ApiError> {
    let mut offered_jsonapi = false;
    for value in headers.get_all(ACCEPT) {
        let Ok(raw) = value.to_str() else { continue };
        for range in raw.split(',').map(parse_media_range) {
            match range.essence.as_str() {
                MEDIA_TYPE if range.params.is_empty() => return Ok(()),
                MEDIA_TYPE => offered_jsonapi = true,
                "*/*" | "application/*" | "application/json" => return Ok(()),
                _ => {}
            }
        }
    }

    if offered_jsonapi {
        Err(ApiError::not_acceptable(format!(
            "{MEDIA_TYPE} is only acceptable without media type parameters"
        )))
    } else {
        Ok(())
    }
}
