//! Path pattern matching.
//!
//! # Responsibilities
//! - Split patterns and request paths on `/`
//! - Bind `:name` segments to the request segment at the same position
//! - Compare every other segment literally
//!
//! # Design Decisions
//! - Case-sensitive, no trailing-slash normalization
//! - Segment counts must be equal (no prefix matching)
//! - A parameter never binds an empty segment
//! - No regex to guarantee O(n) matching

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route path such as `/users/:id/posts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

/// Parameters bound by a successful match, keyed by name.
pub type PathParams = BTreeMap<String, String>;

impl PathPattern {
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) if !name.is_empty() => Segment::Param(name.to_string()),
                _ => Segment::Literal(segment.to_string()),
            })
            .collect();

        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a request path, returning bound parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut params = PathParams::new();
        let mut incoming = path.split('/');

        for segment in &self.segments {
            let value = incoming.next()?;
            match segment {
                Segment::Literal(literal) => {
                    if literal != value {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if value.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), value.to_string());
                }
            }
        }

        if incoming.next().is_some() {
            return None;
        }

        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let pattern = PathPattern::parse("/users");
        assert!(pattern.matches("/users").is_some());
        assert!(pattern.matches("/Users").is_none()); // Case sensitive
        assert!(pattern.matches("/users/").is_none()); // No normalization
        assert!(pattern.matches("/users/1").is_none()); // No prefix matching
    }

    #[test]
    fn test_param_binding() {
        let pattern = PathPattern::parse("/users/:id/posts/:post_id");
        let params = pattern.matches("/users/42/posts/7").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert_eq!(params.get("post_id").map(String::as_str), Some("7"));
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["id", "post_id"]);
    }

    #[test]
    fn test_segment_count_must_match() {
        let pattern = PathPattern::parse("/users/:id");
        assert!(pattern.matches("/users").is_none());
        assert!(pattern.matches("/users/1/extra").is_none());
    }

    #[test]
    fn test_param_never_binds_empty_segment() {
        let pattern = PathPattern::parse("/users/:id");
        assert!(pattern.matches("/users/").is_none());
    }

    #[test]
    fn test_root_pattern() {
        let pattern = PathPattern::parse("/");
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("/a").is_none());
    }
}
