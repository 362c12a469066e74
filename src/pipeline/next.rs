//! The continuation handed to each stage.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::{Outcome, Stage};
use crate::http::request::Request;
use crate::routing::RouteTable;

/// Frozen stages and routes shared by every exchange.
#[derive(Debug)]
pub(crate) struct Chain {
    pub(crate) stages: Vec<Stage>,
    pub(crate) routes: RouteTable,
}

/// Continuation to the rest of the pipeline.
///
/// `run` takes `self`, so each stage gets exactly one chance to continue.
/// Dropping `Next` without running it ends the exchange with whatever
/// response the stage returns.
#[derive(Debug)]
pub struct Next {
    chain: Arc<Chain>,
    cursor: usize,
}

impl Next {
    pub(crate) fn start(chain: Arc<Chain>) -> Self {
        Self { chain, cursor: 0 }
    }

    /// Position of the stage this continuation will run.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Run the next stage, or the route table when no stages are left.
    pub fn run(self, req: Request) -> BoxFuture<'static, Outcome> {
        let Next { chain, cursor } = self;

        if let Some(stage) = chain.stages.get(cursor) {
            tracing::trace!(stage = cursor, prefix = ?stage.prefix(), "Entering middleware");
            let next = Next {
                chain: Arc::clone(&chain),
                cursor: cursor + 1,
            };
            return stage.call(req, next);
        }

        Box::pin(async move { chain.routes.dispatch(req).await })
    }
}
