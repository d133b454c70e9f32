//! Package and slice patterns.
//!
//! Patterns are `.` separated segment sequences matched against package
//! names. `..` stands for any number of complete segments (including none)
//! and `*` inside a segment matches any run of characters within that one
//! segment. Matching is segment-wise and anchored at both ends, so
//! `..service..` matches `app.service.impl` but never `app.services`.
//!
//! A [`SlicePattern`] additionally contains exactly one `(*)` segment that
//! captures the slice key, e.g. `com.example.(*)..`.

use serde::{Serialize, Serializer};
use std::fmt;

// ────────────────────────────────────────────
// Tokens
// ────────────────────────────────────────────

/// A single segment matcher: either a literal or a compiled glob.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SegmentMatcher {
    Literal(String),
    Glob(glob::Pattern),
}

impl SegmentMatcher {
    fn matches(&self, segment: &str) -> bool {
        match self {
            Self::Literal(lit) => lit == segment,
            Self::Glob(pattern) => pattern.matches(segment),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// One complete segment.
    Segment(SegmentMatcher),
    /// `..` matches zero or more complete segments.
    AnySegments,
    /// `(*)` matches exactly one segment, captured as the slice key.
    Capture,
}

const CAPTURE: &str = "(*)";

fn is_glob_segment(segment: &str) -> bool {
    segment.contains(['*', '?', '['])
}

fn parse_segment(pattern: &str, segment: &str, allow_capture: bool) -> Result<Token, PatternError> {
    if segment == CAPTURE {
        if allow_capture {
            return Ok(Token::Capture);
        }
        return Err(PatternError::UnexpectedCapture {
            pattern: pattern.to_string(),
        });
    }

    if let Some(bad) = segment.chars().find(|&c| {
        !(c.is_alphanumeric() || matches!(c, '_' | '$' | '-' | '*' | '?' | '[' | ']' | '!'))
    }) {
        return Err(PatternError::InvalidSegment {
            pattern: pattern.to_string(),
            segment: segment.to_string(),
            reason: format!("unexpected character `{bad}`"),
        });
    }

    if is_glob_segment(segment) {
        let compiled = glob::Pattern::new(segment).map_err(|e| PatternError::InvalidSegment {
            pattern: pattern.to_string(),
            segment: segment.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Token::Segment(SegmentMatcher::Glob(compiled)))
    } else {
        Ok(Token::Segment(SegmentMatcher::Literal(segment.to_string())))
    }
}

fn tokenize(pattern: &str, allow_capture: bool) -> Result<Vec<Token>, PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }

    let mut tokens = Vec::new();
    let mut rest = pattern;

    loop {
        if let Some(after) = rest.strip_prefix("..") {
            if tokens.last() == Some(&Token::AnySegments) {
                return Err(PatternError::AdjacentWildcards {
                    pattern: pattern.to_string(),
                });
            }
            tokens.push(Token::AnySegments);
            rest = after;
            if rest.is_empty() {
                break;
            }
            continue;
        }

        let end = rest.find('.').unwrap_or(rest.len());
        let segment = &rest[..end];
        if segment.is_empty() {
            return Err(PatternError::EmptySegment {
                pattern: pattern.to_string(),
            });
        }
        tokens.push(parse_segment(pattern, segment, allow_capture)?);

        rest = &rest[end..];
        if rest.is_empty() {
            break;
        }
        if rest.starts_with("..") {
            continue;
        }
        // Single `.` separator.
        rest = &rest[1..];
        if rest.is_empty() {
            return Err(PatternError::EmptySegment {
                pattern: pattern.to_string(),
            });
        }
    }

    Ok(tokens)
}

fn package_segments(package: &str) -> Vec<&str> {
    if package.is_empty() {
        Vec::new()
    } else {
        package.split('.').collect()
    }
}

/// Matches tokens against segments, returning the captured segment (if any)
/// on success.
fn match_tokens<'a>(
    tokens: &[Token],
    segments: &[&'a str],
    captured: Option<&'a str>,
) -> Option<Option<&'a str>> {
    let Some((first, rest)) = tokens.split_first() else {
        return segments.is_empty().then_some(captured);
    };

    match first {
        Token::AnySegments => {
            (0..=segments.len()).find_map(|i| match_tokens(rest, &segments[i..], captured))
        }
        Token::Capture => {
            let (head, tail) = segments.split_first()?;
            match_tokens(rest, tail, Some(head))
        }
        Token::Segment(matcher) => {
            let (head, tail) = segments.split_first()?;
            if matcher.matches(head) {
                match_tokens(rest, tail, captured)
            } else {
                None
            }
        }
    }
}

// ────────────────────────────────────────────
// PackagePattern
// ────────────────────────────────────────────

/// A validated package pattern such as `..controller..` or `java..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePattern {
    raw: String,
    tokens: Vec<Token>,
}

impl PackagePattern {
    /// Parses a package pattern.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is empty, has an empty segment,
    /// adjacent `..` wildcards, an invalid segment glob, or a `(*)` capture.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let tokens = tokenize(pattern, false)?;
        Ok(Self {
            raw: pattern.to_string(),
            tokens,
        })
    }

    /// Tests whether a package name (e.g. `com.example.service`) matches.
    #[must_use]
    pub fn matches(&self, package: &str) -> bool {
        match_tokens(&self.tokens, &package_segments(package), None).is_some()
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PackagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.raw)
    }
}

impl Serialize for PackagePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

// ────────────────────────────────────────────
// SlicePattern
// ────────────────────────────────────────────

/// A validated slice pattern with exactly one `(*)` capture segment.
///
/// `com.example.(*)..` assigns `com.example.service.impl` to slice `service`
/// and leaves `com.example` itself outside every slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePattern {
    raw: String,
    tokens: Vec<Token>,
}

impl SlicePattern {
    /// Parses a slice pattern.
    ///
    /// # Errors
    ///
    /// Returns error on the same malformations as [`PackagePattern::new`],
    /// or if the pattern does not contain exactly one `(*)` segment.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let tokens = tokenize(pattern, true)?;
        let captures = tokens.iter().filter(|t| **t == Token::Capture).count();
        if captures != 1 {
            return Err(PatternError::CaptureCount {
                pattern: pattern.to_string(),
                found: captures,
            });
        }
        Ok(Self {
            raw: pattern.to_string(),
            tokens,
        })
    }

    /// Returns the slice key for a package, or `None` if it matches no slice.
    #[must_use]
    pub fn slice_of<'a>(&self, package: &'a str) -> Option<&'a str> {
        match_tokens(&self.tokens, &package_segments(package), None).flatten()
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for SlicePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.raw)
    }
}

impl Serialize for SlicePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

// ────────────────────────────────────────────
// NamePattern
// ────────────────────────────────────────────

/// A validated glob over simple names, e.g. `*Controller` or `Order?Dto`.
///
/// The glob is compiled once at construction and reused for all match calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    raw: String,
    compiled: glob::Pattern,
}

impl NamePattern {
    /// Creates a new name pattern.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is empty or has invalid glob syntax.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let compiled = glob::Pattern::new(pattern).map_err(|e| PatternError::InvalidNameGlob {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Tests whether a simple name matches.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.compiled.matches(name)
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.raw)
    }
}

impl Serialize for NamePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

// ────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────

/// Errors in pattern construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// Pattern is empty.
    #[error("package pattern must not be empty")]
    Empty,

    /// A `.` separator with nothing on one side, e.g. `.a` or `a.`.
    #[error("empty segment in pattern `{pattern}`")]
    EmptySegment {
        /// The malformed pattern.
        pattern: String,
    },

    /// Two `..` wildcards in a row, e.g. `a....b`.
    #[error("adjacent `..` wildcards in pattern `{pattern}`")]
    AdjacentWildcards {
        /// The malformed pattern.
        pattern: String,
    },

    /// A segment with characters or glob syntax that cannot be matched.
    #[error("invalid segment `{segment}` in pattern `{pattern}`: {reason}")]
    InvalidSegment {
        /// The malformed pattern.
        pattern: String,
        /// The offending segment.
        segment: String,
        /// Why it is invalid.
        reason: String,
    },

    /// A `(*)` capture in a plain package pattern.
    #[error("capture `(*)` is only allowed in slice patterns: `{pattern}`")]
    UnexpectedCapture {
        /// The malformed pattern.
        pattern: String,
    },

    /// A simple-name glob with invalid syntax.
    #[error("invalid name glob `{pattern}`: {reason}")]
    InvalidNameGlob {
        /// The malformed glob.
        pattern: String,
        /// Why it is invalid.
        reason: String,
    },

    /// A slice pattern without exactly one capture.
    #[error("slice pattern `{pattern}` must contain exactly one `(*)`, found {found}")]
    CaptureCount {
        /// The malformed pattern.
        pattern: String,
        /// Number of captures found.
        found: usize,
    },
}
