//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum::serve, tower-http layers: request id, trace,
//!                  timeout, body limit)
//!     → request.rs (context builder: pathname, query, cookies)
//!     → Dispatcher (pipeline → route table)
//!     → response.rs (buffered response → axum)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Params, Request};
pub use response::Response;
pub use server::HttpServer;
