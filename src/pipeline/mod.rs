//! Middleware pipeline.
//!
//! # Data Flow
//! ```text
//! Request
//!     → stage 0 (BodyParser by default)
//!     → stage 1 .. stage N-1, each deciding whether to run `Next`
//!     → route table (once the cursor passes the last stage)
//!     → Response
//!
//! Err at any stage → remaining stages and the route table are skipped
//!                  → dispatcher writes the fixed 500 response
//! ```
//!
//! # Design Decisions
//! - `Next` is consumed by `run`, so a stage can continue at most once
//! - The cursor lives in `Next`, never in shared state
//! - Gated stages keep their slot; a failed gate just continues

pub(crate) mod next;

pub use next::Next;

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::DispatchError;
use crate::http::request::Request;
use crate::http::response::Response;

/// What every stage and handler produces.
pub type Outcome = Result<Response, DispatchError>;

/// A cross-cutting pipeline stage.
///
/// Return a response without calling `next` to end the exchange early, or
/// return an error to abort it with a 500.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request, next: Next) -> BoxFuture<'static, Outcome>;
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn handle(&self, req: Request, next: Next) -> BoxFuture<'static, Outcome> {
        (**self).handle(req, next)
    }
}

/// Middleware built from an async closure. See [`from_fn`].
#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
}

impl<F> std::fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}

/// Turn `async |req, next| { ... }` into a [`Middleware`].
///
/// ```rust,ignore
/// router.use_middleware(from_fn(|req: Request, next: Next| async move {
///     let mut res = next.run(req).await?;
///     res.headers_mut().insert("x-powered-by", HeaderValue::from_static("dispatch"));
///     Ok(res)
/// }));
/// ```
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    FromFn { f }
}

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn handle(&self, req: Request, next: Next) -> BoxFuture<'static, Outcome> {
        Box::pin((self.f)(req, next))
    }
}

/// A registered middleware plus its optional path gate.
#[derive(Clone)]
pub struct Stage {
    prefix: Option<String>,
    middleware: Arc<dyn Middleware>,
}

impl Stage {
    pub fn global(middleware: Arc<dyn Middleware>) -> Self {
        Self {
            prefix: None,
            middleware,
        }
    }

    pub fn gated(prefix: impl Into<String>, middleware: Arc<dyn Middleware>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            middleware,
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Re-gate this stage under an outer mount prefix.
    pub(crate) fn nest(self, outer: &str) -> Self {
        let prefix = match self.prefix.as_deref() {
            Some(inner) => crate::routing::join_path(outer, inner),
            None => outer.to_string(),
        };
        Self {
            prefix: Some(prefix),
            middleware: self.middleware,
        }
    }

    fn applies_to(&self, pathname: &str) -> bool {
        self.prefix
            .as_deref()
            .map_or(true, |prefix| pathname.starts_with(prefix))
    }

    fn call(&self, req: Request, next: Next) -> BoxFuture<'static, Outcome> {
        if self.applies_to(req.pathname()) {
            self.middleware.handle(req, next)
        } else {
            next.run(req)
        }
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
