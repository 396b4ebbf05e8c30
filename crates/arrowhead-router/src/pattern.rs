//! Compiled path patterns.
//!
//! A pattern is a `/`-separated list of segments:
//!
//! - a literal segment matches exactly the same input segment;
//! - a segment starting with `#` captures one input segment, named after the
//!   rest of the segment (a bare `#` captures without a name);
//! - a final `>` segment turns the pattern into a prefix pattern, matching
//!   every path that starts with the preceding segments.
//!
//! ```rust
//! use arrowhead_router::HttpPattern;
//!
//! let pattern: HttpPattern = "/orgs/#org/files/>".parse().unwrap();
//!
//! let params = pattern.match_path("/orgs/acme/files/a/b.txt").unwrap();
//! assert_eq!(params.get("org"), Some("acme"));
//! assert!(pattern.match_path("/orgs/acme").is_none());
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::params::Params;

/// Marks a capturing segment.
pub const PARAM_MARKER: char = '#';

/// A final segment consisting of this marker makes a prefix pattern.
pub const PREFIX_MARKER: char = '>';

/// Reasons a pattern is rejected at compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The pattern text is empty.
    #[error("path pattern is empty")]
    Empty,

    /// The pattern does not start with `/`.
    #[error("path pattern `{pattern}` must start with '/'")]
    MissingLeadingSlash {
        /// The offending pattern.
        pattern: String,
    },

    /// The pattern contains a `%`.
    #[error("path pattern `{pattern}` must not contain percent-encoded characters")]
    PercentEncoded {
        /// The offending pattern.
        pattern: String,
    },

    /// The pattern contains a `.` or `..` segment.
    #[error("path pattern `{pattern}` contains relative segment `{segment}`")]
    RelativeSegment {
        /// The offending pattern.
        pattern: String,
        /// The relative segment.
        segment: String,
    },

    /// The pattern contains `//`.
    #[error("path pattern `{pattern}` contains an empty segment")]
    EmptySegment {
        /// The offending pattern.
        pattern: String,
    },

    /// The pattern contains a character outside the RFC 3986 path set.
    #[error("path pattern `{pattern}` contains invalid character {character:?}")]
    InvalidCharacter {
        /// The offending pattern.
        pattern: String,
        /// The rejected character.
        character: char,
    },

    /// The prefix marker appears anywhere but as the final segment.
    #[error("path pattern `{pattern}` may only use '>' as its final segment")]
    MisplacedPrefixMarker {
        /// The offending pattern.
        pattern: String,
    },
}

/// One compiled pattern segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Matches the exact text.
    Literal(String),
    /// Captures any single segment under the given name.
    Param(String),
}

impl Segment {
    /// Returns `true` for a capturing segment.
    #[must_use]
    pub fn is_param(&self) -> bool {
        matches!(self, Self::Param(_))
    }

    fn is_equivalent(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Param(_), Self::Param(_)) => true,
            _ => false,
        }
    }

    fn cmp_specificity(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a.cmp(b),
            (Self::Literal(_), Self::Param(_)) => Ordering::Less,
            (Self::Param(_), Self::Literal(_)) => Ordering::Greater,
            (Self::Param(_), Self::Param(_)) => Ordering::Equal,
        }
    }
}

/// A compiled, immutable path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpPattern {
    segments: Vec<Segment>,
    prefix: bool,
    param_count: usize,
}

impl HttpPattern {
    /// The root pattern `/`, matching only the root path.
    pub const ROOT: Self = Self {
        segments: Vec::new(),
        prefix: false,
        param_count: 0,
    };

    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] describing the first rejected construct.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let owned = || pattern.to_string();
        let Some(body) = pattern.strip_prefix('/') else {
            return Err(PatternError::MissingLeadingSlash { pattern: owned() });
        };
        if pattern.contains('%') {
            return Err(PatternError::PercentEncoded { pattern: owned() });
        }
        if body.is_empty() {
            return Ok(Self::ROOT);
        }

        // A single trailing slash is not significant.
        let body = body.strip_suffix('/').unwrap_or(body);
        let raw: Vec<&str> = body.split('/').collect();
        let last = raw.len() - 1;

        let mut segments = Vec::with_capacity(raw.len());
        let mut prefix = false;
        for (index, segment) in raw.into_iter().enumerate() {
            if segment.len() == 1 && segment.starts_with(PREFIX_MARKER) {
                if index != last {
                    return Err(PatternError::MisplacedPrefixMarker { pattern: owned() });
                }
                prefix = true;
                continue;
            }
            if segment.is_empty() {
                return Err(PatternError::EmptySegment { pattern: owned() });
            }
            if segment == "." || segment == ".." {
                return Err(PatternError::RelativeSegment {
                    pattern: owned(),
                    segment: segment.to_string(),
                });
            }
            let (text, param) = match segment.strip_prefix(PARAM_MARKER) {
                Some(name) => (name, true),
                None => (segment, false),
            };
            if let Some(character) = text.chars().find(|c| !is_pchar(*c)) {
                return Err(if character == PREFIX_MARKER {
                    PatternError::MisplacedPrefixMarker { pattern: owned() }
                } else {
                    PatternError::InvalidCharacter {
                        pattern: owned(),
                        character,
                    }
                });
            }
            segments.push(if param {
                Segment::Param(text.to_string())
            } else {
                Segment::Literal(text.to_string())
            });
        }

        let param_count = segments.iter().filter(|s| s.is_param()).count();
        Ok(Self {
            segments,
            prefix,
            param_count,
        })
    }

    /// Returns the compiled segments, excluding the prefix marker.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns `true` if the pattern ends in the prefix marker.
    #[must_use]
    pub fn is_prefix(&self) -> bool {
        self.prefix
    }

    /// Returns the number of capturing segments.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Returns `true` if the pattern has neither captures nor a prefix
    /// marker, so it matches exactly one path.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        !self.prefix && self.param_count == 0
    }

    /// Matches `path`, returning the captured parameters in pattern order.
    ///
    /// Trailing slashes in `path` are ignored, so `/users/42/` matches like
    /// `/users/42`. A capture consumes exactly one input segment, which may
    /// be empty.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let mut input = split_path(path)?;
        let mut params = Params::with_capacity(self.param_count);
        for segment in &self.segments {
            let value = input.next()?;
            match segment {
                Segment::Literal(text) if text == value => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.push(name.as_str(), value),
            }
        }
        if self.prefix || input.next().is_none() {
            Some(params)
        } else {
            None
        }
    }

    /// Returns `true` if `path` matches this pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.match_path(path).is_some()
    }

    /// Returns `true` if both patterns match exactly the same paths.
    ///
    /// Parameter names are ignored.
    #[must_use]
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.prefix == other.prefix
            && self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.is_equivalent(b))
    }

    /// Returns `true` if at least one path matches both patterns.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        let disjoint_literal = self.segments.iter().zip(&other.segments).any(|pair| {
            matches!(pair, (Segment::Literal(a), Segment::Literal(b)) if a != b)
        });
        if disjoint_literal {
            return false;
        }
        match self.segments.len().cmp(&other.segments.len()) {
            Ordering::Equal => true,
            Ordering::Less => self.prefix,
            Ordering::Greater => other.prefix,
        }
    }

    /// Compares two patterns by specificity; `Less` means `self` is more
    /// specific and must be tried first.
    ///
    /// Segments are compared left to right: a literal precedes a capture,
    /// two literals compare by text and two captures tie. If one pattern
    /// runs out of segments first, the longer one is more specific; if both
    /// end together, an exact pattern precedes a prefix pattern.
    #[must_use]
    pub fn cmp_specificity(&self, other: &Self) -> Ordering {
        self.segments
            .iter()
            .zip(&other.segments)
            .map(|(a, b)| a.cmp_specificity(b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| {
                other
                    .segments
                    .len()
                    .cmp(&self.segments.len())
                    .then(self.prefix.cmp(&other.prefix))
            })
    }
}

impl Default for HttpPattern {
    fn default() -> Self {
        Self::ROOT
    }
}

impl FromStr for HttpPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for HttpPattern {
    type Error = PatternError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl fmt::Display for HttpPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() && !self.prefix {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => write!(f, "/{text}")?,
                Segment::Param(name) => write!(f, "/{PARAM_MARKER}{name}")?,
            }
        }
        if self.prefix {
            write!(f, "/{PREFIX_MARKER}")?;
        }
        Ok(())
    }
}

/// RFC 3986 `pchar` without percent-encoding.
fn is_pchar(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-._~!$&'()*+,;=:@".contains(c)
}

/// Splits a request path into segments, ignoring trailing slashes.
///
/// Returns `None` for a non-empty path without a leading `/`.
fn split_path(path: &str) -> Option<impl Iterator<Item = &str>> {
    let trimmed = path.trim_end_matches('/');
    let body = match trimmed.strip_prefix('/') {
        Some(body) => body,
        None if trimmed.is_empty() => "",
        None => return None,
    };
    Some(body.split('/').filter(move |_| !body.is_empty()))
}
