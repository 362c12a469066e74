//! Request body decoding.
//!
//! # Data Flow
//! ```text
//! payload stream
//!     → accumulate (bounded by limits.max_body_bytes)
//!     → dispatch on Content-Type essence
//!         application/json                  → Body::Json (malformed → {})
//!         application/x-www-form-urlencoded → Body::Form   (form.rs)
//!         multipart/form-data               → Body::Form + files (multipart.rs)
//!         anything else                     → Body::Raw
//!     → Request::set_body
//! ```
//!
//! # Design Decisions
//! - Only POST, PUT and PATCH are decoded; other methods get an empty form
//!   and the payload is never read
//! - Decode problems degrade to an empty or partial result; only transport
//!   read failures abort the exchange

pub mod form;
pub mod multipart;

use std::collections::HashMap;

use axum::http::Method;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::error::DispatchError;
use crate::http::request::{Params, Request};
use crate::pipeline::{Middleware, Next, Outcome};

/// Default accumulation limit when no configuration is supplied (2 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// A decoded request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Parsed `application/json` payload.
    Json(Value),
    /// Url-encoded or multipart fields. Also the empty body.
    Form(Params),
    /// Any other content type, undecoded.
    Raw(Bytes),
}

impl Body {
    /// The empty mapping given to non-mutating methods.
    pub fn empty() -> Self {
        Body::Form(Params::new())
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&Params> {
        match self {
            Body::Form(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Bytes> {
        match self {
            Body::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Look up a top-level text field in a form or JSON object body.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            Body::Form(fields) => fields.get(name).map(String::as_str),
            Body::Json(value) => value.get(name).and_then(Value::as_str),
            Body::Raw(_) => None,
        }
    }
}

/// An uploaded file from a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Pipeline stage that accumulates and decodes the payload.
#[derive(Debug, Clone)]
pub struct BodyParser {
    limit: usize,
}

impl BodyParser {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl Default for BodyParser {
    fn default() -> Self {
        Self::new(DEFAULT_BODY_LIMIT)
    }
}

impl Middleware for BodyParser {
    fn handle(&self, mut req: Request, next: Next) -> BoxFuture<'static, Outcome> {
        let limit = self.limit;
        Box::pin(async move {
            decode_request(&mut req, limit).await?;
            next.run(req).await
        })
    }
}

/// Accumulate the request payload and store the decoded body on the request.
pub async fn decode_request(req: &mut Request, limit: usize) -> Result<(), DispatchError> {
    if !is_mutating(req.method()) {
        req.set_body(Body::empty(), HashMap::new());
        return Ok(());
    }

    let payload = match req.take_payload() {
        Some(stream) => axum::body::to_bytes(stream, limit)
            .await
            .map_err(DispatchError::BodyRead)?,
        None => Bytes::new(),
    };

    let content_type = req.content_type().unwrap_or_default().to_string();
    let (body, files) = decode(&content_type, payload);
    req.set_body(body, files);
    Ok(())
}

/// Decode an accumulated payload according to its declared content type.
pub fn decode(content_type: &str, payload: Bytes) -> (Body, HashMap<String, FileAttachment>) {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "application/json" => {
            let value = serde_json::from_slice(&payload).unwrap_or_else(|err| {
                tracing::debug!(error = %err, "Malformed JSON body, using empty object");
                Value::Object(serde_json::Map::new())
            });
            (Body::Json(value), HashMap::new())
        }
        "application/x-www-form-urlencoded" => (Body::Form(form::parse(&payload)), HashMap::new()),
        "multipart/form-data" => match multipart::boundary(content_type) {
            Some(boundary) => {
                let decoded = multipart::parse(&payload, boundary);
                (Body::Form(decoded.fields), decoded.files)
            }
            None => {
                tracing::debug!(content_type, "Multipart body without boundary");
                (Body::empty(), HashMap::new())
            }
        },
        _ => (Body::Raw(payload), HashMap::new()),
    }
}

fn is_mutating(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}
