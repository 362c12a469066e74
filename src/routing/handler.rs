//! Route handler abstraction.

use std::future::Future;

use futures_util::future::BoxFuture;

use crate::http::request::Request;
use crate::pipeline::Outcome;

/// The terminal stage of an exchange, invoked by the route table.
///
/// Implemented for any `Fn(Request) -> impl Future<Output = Outcome>`.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture<'static, Outcome>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Outcome> {
        Box::pin(self(req))
    }
}
