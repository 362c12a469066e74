//! Application assembly and per-exchange dispatch.
//!
//! # Responsibilities
//! - Build the top-level router with the body decoder as stage 0
//! - Freeze the router into a shareable `Dispatcher`
//! - Turn pipeline errors into the fixed 500 response
//! - Record per-exchange metrics
//!
//! # Design Decisions
//! - The frozen chain is behind one `Arc`; exchanges share nothing mutable
//! - Every exchange ends in exactly one response, whatever the stages do

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

use crate::body::{BodyParser, DEFAULT_BODY_LIMIT};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::observability::metrics;
use crate::pipeline::next::Chain;
use crate::pipeline::Next;
use crate::routing::Router;

/// Top-level application: a [`Router`] whose first stage decodes bodies.
///
/// Derefs to the router for registration.
#[derive(Debug)]
pub struct App {
    router: Router,
}

impl App {
    /// An application with the default body limit.
    pub fn new() -> Self {
        Self::with_body_limit(DEFAULT_BODY_LIMIT)
    }

    /// An application whose body decoder accumulates at most `limit` bytes.
    pub fn with_body_limit(limit: usize) -> Self {
        let mut router = Router::new();
        router.use_middleware(BodyParser::new(limit));
        Self { router }
    }

    /// An application without the body decoder. `Request::body` stays `None`
    /// unless a stage sets it.
    pub fn bare() -> Self {
        Self {
            router: Router::new(),
        }
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    /// Freeze routes and stages for serving.
    pub fn into_dispatcher(self) -> Dispatcher {
        Dispatcher::new(self.router)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for App {
    type Target = Router;

    fn deref(&self) -> &Router {
        &self.router
    }
}

impl DerefMut for App {
    fn deref_mut(&mut self) -> &mut Router {
        &mut self.router
    }
}

/// Immutable, cheaply cloneable entry point for exchanges.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    chain: Arc<Chain>,
}

impl Dispatcher {
    pub fn new(router: Router) -> Self {
        let (stages, routes) = router.into_parts();
        tracing::info!(
            stages = stages.len(),
            routes = routes.len(),
            "Dispatcher ready"
        );
        Self {
            chain: Arc::new(Chain { stages, routes }),
        }
    }

    /// Run one exchange through the pipeline and route table.
    pub async fn dispatch(&self, req: Request) -> Response {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.pathname().to_string();

        let response = match Next::start(Arc::clone(&self.chain)).run(req).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(method = %method, path = %path, error = %err, "Exchange aborted");
                metrics::record_aborted(method.as_str());
                Response::internal_error()
            }
        };

        metrics::record_request(method.as_str(), response.status().as_u16(), start);
        response
    }

    pub fn stage_count(&self) -> usize {
        self.chain.stages.len()
    }

    pub fn route_count(&self) -> usize {
        self.chain.routes.len()
    }
}
