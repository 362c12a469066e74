//! Outbound response sink.
//!
//! # Responsibilities
//! - Hold status, headers and a fully buffered body
//! - Provide the fixed 404/500 responses written by the dispatcher
//! - Hand the finished response to axum
//!
//! # Design Decisions
//! - JSON is only produced through the explicit `Response::json` constructor
//! - Middleware decorates a response by mutating what `Next::run` returned

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;
use serde::Serialize;

use crate::error::DispatchError;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// A buffered HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// An empty `200 OK`.
    pub fn new() -> Self {
        Self::with_status(StatusCode::OK)
    }

    /// An empty response with the given status.
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A plain-text response.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::bytes(status, TEXT_PLAIN, body.into())
    }

    /// A JSON response with status `200 OK`.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, DispatchError> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::bytes(StatusCode::OK, APPLICATION_JSON, body))
    }

    /// A response with an explicit content type.
    pub fn bytes(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut response = Self::with_status(status);
        response
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        response.body = body.into();
        response
    }

    /// The fixed response for an exchange no route matched.
    pub fn not_found() -> Self {
        Self::text(StatusCode::NOT_FOUND, "Not Found")
    }

    /// The fixed response for an exchange aborted by an error.
    pub fn internal_error() -> Self {
        Self::text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Builder-style header insert.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(axum::body::Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
