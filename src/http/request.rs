//! Per-exchange request state and the request context builder.
//!
//! # Responsibilities
//! - Split the raw target into `pathname` and `query` once per exchange
//! - Parse the `cookie` header
//! - Carry the payload stream until the body decoder accumulates it
//! - Hold route params, decoded body and file attachments
//!
//! # Design Decisions
//! - The pathname is kept exactly as received (no percent-decoding); captures
//!   bind the raw segment text
//! - Query and cookie maps are last-wins on duplicate keys
//! - `body` stays `None` until a decoder stage runs

use std::collections::HashMap;

use axum::http::{header, Extensions, HeaderMap, HeaderName, HeaderValue, Method};
use bytes::Bytes;
use percent_encoding::percent_decode_str;

use crate::body::{Body, FileAttachment};

/// String map used for query, cookies, params and form fields.
pub type Params = HashMap<String, String>;

/// One inbound exchange as seen by middleware and route handlers.
#[derive(Debug)]
pub struct Request {
    method: Method,
    target: String,
    pathname: String,
    query: Params,
    headers: HeaderMap,
    cookies: Params,
    pub(crate) params: Params,
    pub(crate) body: Option<Body>,
    pub(crate) files: HashMap<String, FileAttachment>,
    payload: Option<axum::body::Body>,
    extensions: Extensions,
}

impl Request {
    /// Build a request from a method and a raw target such as `/users?id=1`.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self::from_parts(method, target.into(), HeaderMap::new(), axum::body::Body::empty())
    }

    /// Build a request from the pieces handed over by the transport.
    pub fn from_parts(
        method: Method,
        target: String,
        headers: HeaderMap,
        payload: axum::body::Body,
    ) -> Self {
        let (pathname, query) = parse_target(&target);
        let cookies = parse_cookies(&headers);

        Self {
            method,
            target,
            pathname,
            query,
            headers,
            cookies,
            params: Params::new(),
            body: None,
            files: HashMap::new(),
            payload: Some(payload),
            extensions: Extensions::new(),
        }
    }

    /// Convert an axum request into a dispatch request.
    pub fn from_http(req: axum::extract::Request) -> Self {
        let (parts, payload) = req.into_parts();
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Self::from_parts(parts.method, target, parts.headers, payload)
    }

    /// Add a header. Re-parses cookies when the `cookie` header changes.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        let is_cookie = name == header::COOKIE;
        self.headers.append(name, value);
        if is_cookie {
            self.cookies = parse_cookies(&self.headers);
        }
        self
    }

    /// Replace the payload stream with a fully buffered one.
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = Some(axum::body::Body::from(payload.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The target exactly as received, including the query string.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    pub fn query(&self) -> &Params {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text; `None` when missing or not visible ASCII.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE)
    }

    pub fn cookies(&self) -> &Params {
        &self.cookies
    }

    /// Path parameters bound by the matched route. Empty before routing.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Decoded body, or `None` when no decoder stage has run.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn files(&self) -> &HashMap<String, FileAttachment> {
        &self.files
    }

    pub fn file(&self, field: &str) -> Option<&FileAttachment> {
        self.files.get(field)
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Take the payload stream out of the request. Returns `None` once taken.
    pub fn take_payload(&mut self) -> Option<axum::body::Body> {
        self.payload.take()
    }

    /// Store the decoded body and attachments.
    pub fn set_body(&mut self, body: Body, files: HashMap<String, FileAttachment>) {
        self.body = Some(body);
        self.files = files;
    }
}

/// Split a raw target into its pathname and query map.
///
/// Fragments are dropped, an empty path becomes `/`, and absolute-form targets
/// (`http://host/path`) are reduced to their path.
pub fn parse_target(target: &str) -> (String, Params) {
    let target = target.split('#').next().unwrap_or_default();
    let (path, raw_query) = match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    };

    let path = strip_authority(path);
    let pathname = if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    };

    let query = url::form_urlencoded::parse(raw_query.as_bytes())
        .into_owned()
        .collect();

    (pathname, query)
}

/// Origin-form targets start with `/` and are left untouched, even when a
/// later segment contains `://`.
fn strip_authority(path: &str) -> &str {
    if path.starts_with('/') {
        return path;
    }
    match path.find("://") {
        Some(scheme_end) => {
            let rest = &path[scheme_end + 3..];
            rest.find('/').map_or("", |slash| &rest[slash..])
        }
        None => path,
    }
}

fn parse_cookies(headers: &HeaderMap) -> Params {
    let mut cookies = Params::new();

    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((name, raw)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let raw = raw.trim().trim_matches('"');
            let decoded = percent_decode_str(raw).decode_utf8_lossy().into_owned();
            cookies.insert(name.to_string(), decoded);
        }
    }

    cookies
}
