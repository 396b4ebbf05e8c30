//! Captured path parameters.

use smallvec::SmallVec;

/// Captures held before spilling to the heap; patterns rarely have more.
const INLINE_CAPTURES: usize = 4;

/// Path parameters captured by a pattern match.
///
/// Values are kept in left-to-right pattern order and can be looked up by
/// segment name or by position. Unnamed segments (a bare `#`) capture under
/// the empty name and are only reachable by position.
///
/// # Example
///
/// ```rust
/// use arrowhead_router::Params;
///
/// let mut params = Params::new();
/// params.push("orgId", "acme");
/// params.push("userId", "123");
///
/// assert_eq!(params.get("userId"), Some("123"));
/// assert_eq!(params.get_index(0), Some("acme"));
/// assert_eq!(params.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    captures: SmallVec<[(String, String); INLINE_CAPTURES]>,
}

impl Params {
    /// An empty capture list, as produced by a route without a pattern.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Room for the `count` captures a compiled pattern will produce.
    #[must_use]
    pub(crate) fn with_capacity(count: usize) -> Self {
        Self {
            captures: SmallVec::with_capacity(count),
        }
    }

    /// Appends the value captured by the next parameter segment.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.captures.push((name.into(), value.into()));
    }

    /// Returns the first value captured under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.captures
            .iter()
            .find(|(captured, _)| captured == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the value captured by the `index`-th parameter segment.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&str> {
        self.captures.get(index).map(|(_, value)| value.as_str())
    }

    /// `true` when the matched pattern has no parameter segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    /// Captured values in pattern order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.captures.iter().map(|(_, value)| value.as_str())
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(captures: I) -> Self {
        Self {
            captures: captures.into_iter().collect(),
        }
    }
}
