//! Building wire requests from external messages.

use bridge_core::content_type::{APPLICATION_OCTET_STREAM, TEXT_PLAIN_UTF8};
use bridge_core::ExternalMessage;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, Request, Uri};
use tracing::warn;

use super::target::{with_path_and_query, HttpPublishTarget, PushEndpoint};
use crate::error::CodecError;

/// A request ready to be signed and executed.
pub type WireRequest = Request<Bytes>;

/// Header whose value replaces the request path. Never forwarded.
pub const HTTP_PATH: &str = "http.path";

/// Header whose value replaces the raw query string. Never forwarded.
pub const HTTP_QUERY: &str = "http.query";

/// Whether `name` is consumed by the codec instead of being forwarded.
#[must_use]
pub fn is_reserved_header(name: &str) -> bool {
    [HTTP_PATH, HTTP_QUERY]
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Builds the request for `message` addressed at `target` on `endpoint`.
///
/// Reserved headers adjust the URI; a `content-type` header decides the entity's
/// content type, otherwise text payloads go out as UTF-8 text and everything
/// else as `application/octet-stream`. Endpoint credentials become a basic
/// `Authorization` header unless the message carries one.
///
/// # Errors
///
/// Returns `CodecError` if the resulting URI or request is invalid.
pub fn build_request(
    connection_id: &str,
    endpoint: &PushEndpoint,
    target: &HttpPublishTarget,
    message: &ExternalMessage,
) -> Result<WireRequest, CodecError> {
    let (mut headers, content_type) = forwarded_headers(connection_id, message);
    if let Some(credentials) = endpoint.credentials() {
        if !headers.contains_key(AUTHORIZATION) {
            headers.insert(AUTHORIZATION, credentials.authorization()?);
        }
    }
    let uri = apply_path_and_query(
        &endpoint.request_uri(target)?,
        message.header(HTTP_PATH),
        message.header(HTTP_QUERY),
    )?;

    let (content_type, body) = match content_type {
        Some(content_type) => (content_type, Bytes::from(message.payload_bytes())),
        None if message.is_text_message() => (
            HeaderValue::from_static(TEXT_PLAIN_UTF8),
            Bytes::from(message.text_payload().to_owned()),
        ),
        None => (
            HeaderValue::from_static(APPLICATION_OCTET_STREAM),
            Bytes::copy_from_slice(message.byte_payload()),
        ),
    };
    headers.insert(CONTENT_TYPE, content_type);

    let mut request = Request::builder()
        .method(target.method().clone())
        .uri(uri)
        .body(body)
        .map_err(|e| CodecError::InvalidRequest(e.to_string()))?;
    *request.headers_mut() = headers;
    Ok(request)
}

/// Splits message headers into forwarded HTTP headers and the content type.
///
/// Reserved headers are dropped. Headers that are not valid HTTP are skipped with a warning.
fn forwarded_headers(
    connection_id: &str,
    message: &ExternalMessage,
) -> (HeaderMap, Option<HeaderValue>) {
    let mut headers = HeaderMap::with_capacity(message.headers.len());
    let mut content_type = None;
    for (name, value) in &message.headers {
        if is_reserved_header(name) {
            continue;
        }
        let parsed = HeaderName::from_bytes(name.as_bytes())
            .ok()
            .zip(HeaderValue::from_str(value).ok());
        let Some((name, value)) = parsed else {
            warn!(connection_id, header = %name, "Skipping header that is not valid HTTP");
            continue;
        };
        if name == CONTENT_TYPE {
            content_type = Some(value);
        } else {
            headers.append(name, value);
        }
    }
    (headers, content_type)
}

/// Replaces the path (prefixing `/` if missing) and/or the raw query of `uri`.
fn apply_path_and_query(
    uri: &Uri,
    path: Option<&str>,
    query: Option<&str>,
) -> Result<Uri, CodecError> {
    if path.is_none() && query.is_none() {
        return Ok(uri.clone());
    }
    let path = match path {
        Some(path) if path.starts_with('/') => path.to_string(),
        Some(path) => format!("/{path}"),
        None => uri.path().to_string(),
    };
    match query.or(uri.query()) {
        Some(query) => with_path_and_query(uri, &format!("{path}?{query}")),
        None => with_path_and_query(uri, &path),
    }
}
