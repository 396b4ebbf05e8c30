//! Business failures.
//!
//! A [`Failure`] is the error half of an [`Outcome`]. It is immutable and
//! cheap to clone, so a single failure can be delivered to many subscribers
//! (see [`Publisher`](crate::Publisher)).

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::class::{self, ErrorClass};

/// Terminal outcome of an asynchronous computation.
pub type Outcome<T> = Result<T, Failure>;

/// A failed outcome.
///
/// Carries an [`ErrorClass`], a message, an optional source error and the
/// failures that were suppressed while this one was being handled (for
/// example a recovery closure that failed too).
///
/// # Example
///
/// ```rust
/// use arrowhead_future::{class, Failure};
///
/// let failure = Failure::new(&class::IO, "disk unplugged")
///     .with_suppressed(Failure::new(&class::ILLEGAL_STATE, "retry failed"));
///
/// assert!(failure.is(&class::IO));
/// assert_eq!(failure.suppressed().len(), 1);
/// ```
#[derive(Clone)]
pub struct Failure {
    inner: Arc<Inner>,
}

#[derive(Clone)]
struct Inner {
    class: &'static ErrorClass,
    message: String,
    source: Option<Arc<dyn StdError + Send + Sync>>,
    suppressed: Vec<Failure>,
}

impl Failure {
    /// Creates a failure of the given class.
    #[must_use]
    pub fn new(class: &'static ErrorClass, message: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                class,
                message: message.into(),
                source: None,
                suppressed: Vec::new(),
            }),
        }
    }

    /// Wraps an error value, using its `Display` output as the message.
    #[must_use]
    pub fn from_error<E>(class: &'static ErrorClass, error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                class,
                message: error.to_string(),
                source: Some(Arc::new(error)),
                suppressed: Vec::new(),
            }),
        }
    }

    /// A generic failure of class [`ERROR`](class::ERROR).
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(&class::ERROR, message)
    }

    /// The failure produced when a `filter` rejects a value.
    #[must_use]
    pub fn no_such_element() -> Self {
        Self::new(&class::NO_SUCH_ELEMENT, "value rejected by filter")
    }

    /// The failure delivered to a cancelled future's consumer.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(&class::CANCELLED, "cancelled")
    }

    /// The failure delivered when a promise is dropped before completion.
    #[must_use]
    pub fn abandoned() -> Self {
        Self::new(&class::ABANDONED, "promise dropped without being completed")
    }

    /// An [`ILLEGAL_STATE`](class::ILLEGAL_STATE) failure.
    #[must_use]
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(&class::ILLEGAL_STATE, message)
    }

    /// A [`DECODE`](class::DECODE) failure.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(&class::DECODE, message)
    }

    /// Returns the class of this failure.
    #[must_use]
    pub fn class(&self) -> &'static ErrorClass {
        self.inner.class
    }

    /// Returns `true` if this failure's class is `class` or a subclass of it.
    #[must_use]
    pub fn is(&self, class: &ErrorClass) -> bool {
        self.inner.class.is_subclass_of(class)
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// Returns the failures suppressed in favour of this one, oldest first.
    #[must_use]
    pub fn suppressed(&self) -> &[Failure] {
        &self.inner.suppressed
    }

    /// Returns a copy of this failure with `other` appended to its
    /// suppressed list.
    #[must_use]
    pub fn with_suppressed(self, other: Failure) -> Self {
        let mut inner = Arc::try_unwrap(self.inner).unwrap_or_else(|shared| (*shared).clone());
        inner.suppressed.push(other);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns a copy of this failure with `source` attached.
    #[must_use]
    pub fn with_source<E>(self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let mut inner = Arc::try_unwrap(self.inner).unwrap_or_else(|shared| (*shared).clone());
        inner.source = Some(Arc::new(source));
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.inner.class, self.inner.message)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Failure");
        debug
            .field("class", &self.inner.class)
            .field("message", &self.inner.message);
        if let Some(source) = &self.inner.source {
            debug.field("source", source);
        }
        if !self.inner.suppressed.is_empty() {
            debug.field("suppressed", &self.inner.suppressed);
        }
        debug.finish()
    }
}

impl StdError for Failure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for Failure {
    fn from(error: std::io::Error) -> Self {
        let class = if error.kind() == std::io::ErrorKind::NotFound {
            &class::FILE_NOT_FOUND
        } else {
            &class::IO
        };
        Self::from_error(class, error)
    }
}
