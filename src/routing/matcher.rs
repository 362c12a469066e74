//! Path pattern matching.
//!
//! # Responsibilities
//! - Compile a pattern such as `/users/:id/posts` into segments
//! - Match a request pathname against it, binding captures
//!
//! # Design Decisions
//! - Both sides are split on `/` with empty segments discarded, so `//a/`
//!   and `/a` are the same path and a capture never binds an empty string
//! - Segment counts must be equal: no wildcards, no optional segments
//! - Literal segments compare byte-for-byte (case-sensitive)
//! - Captures bind the raw segment; no decoding, no type checks
//! - Duplicate capture names: the rightmost binding wins

use crate::error::RegistrationError;
use crate::http::request::Params;

/// One segment of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Capture(String),
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern. It must start with `/` and every `:` segment needs a
    /// name.
    pub fn parse(pattern: &str) -> Result<Self, RegistrationError> {
        if !pattern.starts_with('/') {
            return Err(RegistrationError::InvalidPattern(pattern.to_string()));
        }

        let segments = segments(pattern)
            .map(|segment| match segment.strip_prefix(':') {
                Some("") => Err(RegistrationError::EmptyCapture(pattern.to_string())),
                Some(name) => Ok(Segment::Capture(name.to_string())),
                None => Ok(Segment::Literal(segment.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match a pathname, returning the bound captures on success.
    pub fn matches(&self, pathname: &str) -> Option<Params> {
        let mut params = Params::new();
        let mut request = segments(pathname);

        for expected in &self.segments {
            let actual = request.next()?;
            match expected {
                Segment::Literal(literal) => {
                    if literal != actual {
                        return None;
                    }
                }
                Segment::Capture(name) => {
                    params.insert(name.clone(), actual.to_string());
                }
            }
        }

        // Leftover request segments mean the counts differ.
        if request.next().is_some() {
            return None;
        }

        Some(params)
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Non-empty `/`-separated segments of a path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(p: &str) -> PathPattern {
        PathPattern::parse(p).unwrap()
    }

    #[test]
    fn test_literal_match() {
        let p = pattern("/users/list");
        assert_eq!(p.matches("/users/list"), Some(Params::new()));
        assert!(p.matches("/users/List").is_none());
        assert!(p.matches("/users").is_none());
    }

    #[test]
    fn test_capture_binds_segment() {
        let p = pattern("/users/:id");
        let params = p.matches("/users/42").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_capture_binds_any_content() {
        let p = pattern("/files/:name/raw");
        let params = p.matches("/files/a%20b.tar.gz/raw").unwrap();
        assert_eq!(params.get("name").map(String::as_str), Some("a%20b.tar.gz"));
    }

    #[test]
    fn test_segment_count_mismatch() {
        let p = pattern("/:a/:b");
        assert!(p.matches("/x").is_none());
        assert!(p.matches("/x/y/z").is_none());
        assert!(p.matches("/x/y").is_some());
    }

    #[test]
    fn test_root_matches_only_root() {
        let p = pattern("/");
        assert!(p.segments().is_empty());
        assert!(p.matches("/").is_some());
        assert!(p.matches("//").is_some());
        assert!(p.matches("").is_some());
        assert!(p.matches("/a").is_none());
    }

    #[test]
    fn test_empty_segments_are_discarded() {
        let p = pattern("/users/:id");
        assert_eq!(
            p.matches("//users///7/").unwrap().get("id").map(String::as_str),
            Some("7")
        );
        // `/users//` normalizes to `/users`, so there is nothing to capture.
        assert!(p.matches("/users//").is_none());
    }

    #[test]
    fn test_trailing_slash_in_pattern() {
        let p = pattern("/docs/");
        assert!(p.matches("/docs").is_some());
        assert!(p.matches("/docs/").is_some());
    }

    #[test]
    fn test_duplicate_capture_last_wins() {
        let p = pattern("/orgs/:id/users/:id");
        let params = p.matches("/orgs/acme/users/7").unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id").map(String::as_str), Some("7"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert_eq!(
            PathPattern::parse("users"),
            Err(RegistrationError::InvalidPattern("users".into()))
        );
        assert_eq!(
            PathPattern::parse("/users/:"),
            Err(RegistrationError::EmptyCapture("/users/:".into()))
        );
    }
}
