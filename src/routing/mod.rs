//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (startup):
//!     Router::route / get / post / ...  → PathPattern::parse (matcher.rs)
//!     Router::mount(prefix, sub_router) → patterns re-joined, stages re-gated
//!     → frozen into RouteTable
//!
//! Dispatch (per exchange, after the last middleware):
//!     (method, pathname)
//!     → RouteTable::resolve (first match in registration order)
//!     → params bound into the request
//!     → Handler::call, or 404
//! ```

pub mod handler;
pub mod matcher;
pub mod router;

pub use handler::Handler;
pub use matcher::{PathPattern, Segment};
pub use router::{Mountable, Route, RouteTable, Router};

/// Join a mount prefix and a path, eliding a `/` on either side.
///
/// `("/a", "/b")` → `/a/b`, `("/", "/b")` → `/b`, `("/a", "/")` → `/a`.
pub fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.to_string();
    }
    if path == "/" || path.is_empty() {
        return prefix.to_string();
    }
    format!("{prefix}{path}")
}

#[cfg(test)]
mod tests {
    use super::join_path;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/a", "/b"), "/a/b");
        assert_eq!(join_path("/a/", "/b"), "/a/b");
        assert_eq!(join_path("/", "/b"), "/b");
        assert_eq!(join_path("/a", "/"), "/a");
        assert_eq!(join_path("/", "/"), "/");
    }
}
