//! Route registration, sub-router mounting and lookup.
//!
//! # Responsibilities
//! - Store routes and middleware in registration order
//! - Merge sub-routers under a path prefix at registration time
//! - Look up the first route matching a method and pathname
//!
//! # Design Decisions
//! - First match wins; no specificity reordering, no deduplication
//! - Mounting takes the sub-router by value, so later changes to it cannot
//!   reach the parent
//! - Frozen into a `RouteTable` before serving (thread-safe without locks)
//! - Explicit not-found (404) rather than a silent default

use std::future::Future;
use std::sync::Arc;

use axum::http::Method;

use super::handler::Handler;
use super::join_path;
use super::matcher::PathPattern;
use crate::error::RegistrationError;
use crate::http::request::{Params, Request};
use crate::http::response::Response;
use crate::pipeline::{Middleware, Outcome, Stage};

/// A registered (method, pattern, handler) triple.
#[derive(Clone)]
pub struct Route {
    method: Method,
    pattern: PathPattern,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// What can be attached under a prefix with [`Router::mount`].
pub enum Mountable {
    /// A stage that only fires when the pathname starts with the prefix.
    Middleware(Arc<dyn Middleware>),
    /// A sub-router whose routes and stages are merged into the parent.
    Router(Router),
}

impl From<Router> for Mountable {
    fn from(router: Router) -> Self {
        Mountable::Router(router)
    }
}

impl<M: Middleware> From<M> for Mountable {
    fn from(middleware: M) -> Self {
        Mountable::Middleware(Arc::new(middleware))
    }
}

/// An application or sub-application: ordered routes plus ordered middleware.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
    stages: Vec<Stage>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `method` and `pattern`.
    pub fn route<F, Fut>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let pattern = PathPattern::parse(pattern)?;
        tracing::debug!(method = %method, pattern = %pattern, "Route registered");
        self.routes.push(Route {
            method,
            pattern,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    pub fn get<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        self.route(Method::GET, pattern, handler)
    }

    pub fn post<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        self.route(Method::POST, pattern, handler)
    }

    pub fn put<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        self.route(Method::PUT, pattern, handler)
    }

    pub fn delete<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        self.route(Method::DELETE, pattern, handler)
    }

    pub fn patch<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        self.route(Method::PATCH, pattern, handler)
    }

    /// Append a stage that runs for every exchange.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.stages.push(Stage::global(Arc::new(middleware)));
        self
    }

    /// Attach a gated middleware or merge a sub-router under `prefix`.
    ///
    /// Sub-router routes are copied with the prefix joined in front (`/` is
    /// elided on either side) and its stages are re-gated under the prefix.
    pub fn mount(
        &mut self,
        prefix: &str,
        item: impl Into<Mountable>,
    ) -> Result<&mut Self, RegistrationError> {
        if !prefix.starts_with('/') {
            return Err(RegistrationError::InvalidPrefix(prefix.to_string()));
        }

        match item.into() {
            Mountable::Middleware(middleware) => {
                self.stages.push(Stage::gated(prefix, middleware));
            }
            Mountable::Router(router) => {
                tracing::debug!(
                    prefix,
                    routes = router.routes.len(),
                    stages = router.stages.len(),
                    "Mounting sub-router"
                );
                for route in router.routes {
                    let pattern = PathPattern::parse(&join_path(prefix, route.pattern.as_str()))?;
                    self.routes.push(Route { pattern, ..route });
                }
                self.stages
                    .extend(router.stages.into_iter().map(|stage| stage.nest(prefix)));
            }
        }

        Ok(self)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub(crate) fn into_parts(self) -> (Vec<Stage>, RouteTable) {
        (self.stages, RouteTable { routes: self.routes })
    }
}

/// Immutable route list consulted once the pipeline is exhausted.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// First route matching `method` and `pathname`, with its bound params.
    pub fn resolve(&self, method: &Method, pathname: &str) -> Option<(&Route, Params)> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| route.pattern.matches(pathname).map(|params| (route, params)))
    }

    /// Bind params and run the matching handler, or answer 404.
    pub async fn dispatch(&self, mut req: Request) -> Outcome {
        let Some((route, params)) = self.resolve(req.method(), req.pathname()) else {
            tracing::debug!(method = %req.method(), path = %req.pathname(), "No route matched");
            return Ok(Response::not_found());
        };

        tracing::debug!(
            method = %req.method(),
            path = %req.pathname(),
            pattern = %route.pattern,
            "Route matched"
        );
        req.params.extend(params);
        route.handler.call(req).await
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
