//! Request dispatch for HTTP services.
//!
//! Turns an inbound exchange into a matched handler invocation after running
//! an ordered chain of middleware. The body decoder is the first stage of
//! every [`App`].
//!
//! ```rust,ignore
//! let mut app = App::new();
//! app.use_middleware(from_fn(|req: Request, next: Next| async move {
//!     tracing::info!(path = %req.pathname(), "hit");
//!     next.run(req).await
//! }));
//! app.get("/users/:id", |req: Request| async move { Response::json(req.params()) })?;
//!
//! let mut admin = Router::new();
//! admin.get("/stats", stats)?;
//! app.mount("/admin", admin)?;
//!
//! let server = HttpServer::new(config, app.into_dispatcher());
//! ```

pub mod app;
pub mod body;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod routing;

pub use app::{App, Dispatcher};
pub use body::{Body, BodyParser, FileAttachment};
pub use config::ServerConfig;
pub use error::{DispatchError, RegistrationError};
pub use http::{HttpServer, Request, Response};
pub use lifecycle::Shutdown;
pub use pipeline::{from_fn, Middleware, Next, Outcome};
pub use routing::{Mountable, Router};
