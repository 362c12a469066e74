//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create an axum Router whose fallback forwards every exchange to the
//!   dispatcher
//! - Wire up transport middleware (request ID, tracing, timeout, body limit)
//! - Bind server to listener
//! - Stop accepting on shutdown and let in-flight exchanges finish

use std::time::Duration;

use axum::{extract::State, response::IntoResponse, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::Dispatcher;
use crate::config::ServerConfig;
use crate::http::request::Request;
use crate::lifecycle::shutdown;

pub const X_REQUEST_ID: &str = "x-request-id";

/// HTTP front end for a [`Dispatcher`].
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        let router = Self::build_router(&config, dispatcher);
        Self { router, config }
    }

    /// Build the axum router with all transport layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, dispatcher: Dispatcher) -> Router {
        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(
                    |req: &axum::http::Request<axum::body::Body>| {
                        let request_id = req
                            .headers()
                            .get(X_REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("unknown");
                        tracing::info_span!(
                            "exchange",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id = %request_id,
                        )
                    },
                ),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .fallback(dispatch_handler)
            .with_state(dispatcher)
            .layer(layers)
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_body_bytes = self.config.limits.max_body_bytes,
            request_timeout_secs = self.config.timeouts.request_secs,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The fully layered axum router, for embedding or in-process tests.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Hand the exchange to the dispatcher.
async fn dispatch_handler(
    State(dispatcher): State<Dispatcher>,
    req: axum::extract::Request,
) -> impl IntoResponse {
    dispatcher.dispatch(Request::from_http(req)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::http::response::Response;
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let mut app = App::new();
        app.get("/users/:id", |req: Request| async move {
            Response::json(req.params())
        })
        .unwrap();
        app.post("/echo", |req: Request| async move {
            Ok(Response::text(
                StatusCode::OK,
                req.body().and_then(|b| b.field("msg")).unwrap_or_default(),
            ))
        })
        .unwrap();
        HttpServer::new(ServerConfig::default(), app.into_dispatcher())
    }

    async fn body_text(res: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_routes_through_dispatcher() {
        let req = axum::http::Request::builder()
            .uri("/users/42?verbose=1")
            .body(axum::body::Body::empty())
            .unwrap();

        let res = server().into_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(X_REQUEST_ID));
        assert_eq!(body_text(res).await, r#"{"id":"42"}"#);
    }

    #[tokio::test]
    async fn test_propagates_incoming_request_id() {
        let req = axum::http::Request::builder()
            .uri("/nope")
            .header(X_REQUEST_ID, "abc-123")
            .body(axum::body::Body::empty())
            .unwrap();

        let res = server().into_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers().get(X_REQUEST_ID).unwrap(), "abc-123");
    }

    #[tokio::test]
    async fn test_decodes_form_body() {
        let req = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(axum::body::Body::from("msg=hello%20there"))
            .unwrap();

        let res = server().into_router().oneshot(req).await.unwrap();
        assert_eq!(body_text(res).await, "hello there");
    }
}
