//! Path pattern matching.
//!
//! # Responsibilities
//! - Compile `/talks/{title}` style patterns into segments
//! - Match a request path in full (anchored, never as a prefix)
//! - Extract captures in encounter order, percent-decoded
//!
//! # Design Decisions
//! - A capture spans exactly one non-empty segment, never a `/`
//! - Literal segments are compared case-sensitively
//! - No regex: matching is a single pass over the segments

use percent_encoding::percent_decode_str;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Invalid route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern {0:?} must start with '/'")]
    MissingLeadingSlash(String),

    #[error("pattern {0:?} has an unnamed or unterminated capture")]
    BadCapture(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let Some(rest) = pattern.strip_prefix('/') else {
            return Err(PatternError::MissingLeadingSlash(pattern.to_string()));
        };

        let segments = rest
            .split('/')
            .map(|segment| {
                match segment.strip_prefix('{') {
                    Some(inner) => match inner.strip_suffix('}') {
                        Some(name) if !name.is_empty() && !name.contains(['{', '}']) => {
                            Ok(Segment::Capture(name.to_string()))
                        }
                        _ => Err(PatternError::BadCapture(pattern.to_string())),
                    },
                    None if segment.contains(['{', '}']) => {
                        Err(PatternError::BadCapture(pattern.to_string()))
                    }
                    None => Ok(Segment::Literal(segment.to_string())),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// Match `path` in full, returning the decoded captures.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let rest = path.strip_prefix('/')?;
        let mut parts = rest.split('/');
        let mut captures = Vec::new();

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) => {
                    if part != literal {
                        return None;
                    }
                }
                Segment::Capture(_) => {
                    if part.is_empty() {
                        return None;
                    }
                    let decoded = percent_decode_str(part).decode_utf8().ok()?;
                    captures.push(decoded.into_owned());
                }
            }
        }

        // Trailing segments mean the pattern only matched a prefix.
        if parts.next().is_some() {
            return None;
        }
        Some(captures)
    }

    pub fn matches(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }

    /// Capture names in encounter order.
    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Capture(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for PathPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern_is_anchored() {
        let pattern = PathPattern::parse("/talks").unwrap();
        assert!(pattern.matches("/talks"));
        assert!(!pattern.matches("/talks/"));
        assert!(!pattern.matches("/talks/x"));
        assert!(!pattern.matches("/api/talks"));
        assert!(!pattern.matches("/Talks"));
    }

    #[test]
    fn test_capture_single_segment() {
        let pattern = PathPattern::parse("/talks/{title}").unwrap();
        assert_eq!(pattern.captures("/talks/Rust"), Some(vec!["Rust".to_string()]));
        assert_eq!(pattern.captures("/talks/"), None);
        assert_eq!(pattern.captures("/talks/a/b"), None);
        assert_eq!(pattern.capture_names().collect::<Vec<_>>(), ["title"]);
    }

    #[test]
    fn test_captures_are_percent_decoded() {
        let pattern = PathPattern::parse("/talks/{title}/comments").unwrap();
        assert_eq!(
            pattern.captures("/talks/Unituning%20%2F%20tips/comments"),
            Some(vec!["Unituning / tips".to_string()])
        );
        // Invalid UTF-8 after decoding does not match.
        assert_eq!(pattern.captures("/talks/%FF/comments"), None);
    }

    #[test]
    fn test_multiple_captures_in_order() {
        let pattern: PathPattern = "/a/{x}/b/{y}".parse().unwrap();
        assert_eq!(
            pattern.captures("/a/1/b/2"),
            Some(vec!["1".to_string(), "2".to_string()])
        );
    }

    #[test]
    fn test_invalid_patterns() {
        assert_eq!(
            PathPattern::parse("talks"),
            Err(PatternError::MissingLeadingSlash("talks".into()))
        );
        assert!(PathPattern::parse("/talks/{}").is_err());
        assert!(PathPattern::parse("/talks/{title").is_err());
        assert!(PathPattern::parse("/talks/x{title}").is_err());
    }

    #[test]
    fn test_root_pattern() {
        let pattern = PathPattern::parse("/").unwrap();
        assert!(pattern.matches("/"));
        assert!(!pattern.matches("/x"));
    }
}
