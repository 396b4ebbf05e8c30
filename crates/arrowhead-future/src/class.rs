//! Error classes.
//!
//! Every [`Failure`](crate::Failure) carries an [`ErrorClass`]. Classes form a
//! single-inheritance tree rooted at [`ERROR`], which lets catchers register
//! for a class and receive every failure of that class or of any class below
//! it.
//!
//! Classes are compared by identity, so they must be declared as `static`
//! items:
//!
//! ```rust
//! use arrowhead_future::class::{ErrorClass, IO};
//!
//! static QUOTA_EXCEEDED: ErrorClass = ErrorClass::new("QuotaExceeded", &IO);
//!
//! assert!(QUOTA_EXCEEDED.is_subclass_of(&IO));
//! assert!(!IO.is_subclass_of(&QUOTA_EXCEEDED));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

/// A node in the error class tree.
pub struct ErrorClass {
    name: &'static str,
    parent: Option<&'static ErrorClass>,
}

impl ErrorClass {
    /// Creates a class without a parent.
    ///
    /// Only [`ERROR`] should normally be a root; user classes descend from it
    /// or from one of its children.
    #[must_use]
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Creates a class below `parent`.
    #[must_use]
    pub const fn new(name: &'static str, parent: &'static ErrorClass) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// Returns the class name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the parent class, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&'static ErrorClass> {
        self.parent
    }

    /// Returns `true` if `self` is `other` or descends from it.
    #[must_use]
    pub fn is_subclass_of(&self, other: &ErrorClass) -> bool {
        if self == other {
            return true;
        }
        self.ancestors().any(|ancestor| ancestor == other)
    }

    /// Returns `true` if `self` descends from `other` and is not `other`.
    #[must_use]
    pub fn is_strict_subclass_of(&self, other: &ErrorClass) -> bool {
        self != other && self.is_subclass_of(other)
    }

    /// Number of ancestors between this class and its root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }

    /// Iterates over the ancestors of this class, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &'static ErrorClass> {
        std::iter::successors(self.parent, |class| class.parent)
    }
}

impl PartialEq for ErrorClass {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for ErrorClass {}

impl Hash for ErrorClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self, state);
    }
}

impl fmt::Debug for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Root of the class tree. Every failure is an `ERROR`.
pub static ERROR: ErrorClass = ErrorClass::root("Error");

/// Input/output failures.
pub static IO: ErrorClass = ErrorClass::new("IoError", &ERROR);

/// A file or directory that does not exist.
pub static FILE_NOT_FOUND: ErrorClass = ErrorClass::new("FileNotFound", &IO);

/// A value was required but none was available, e.g. a rejected `filter`.
pub static NO_SUCH_ELEMENT: ErrorClass = ErrorClass::new("NoSuchElement", &ERROR);

/// The computation was cancelled before it produced a result.
pub static CANCELLED: ErrorClass = ErrorClass::new("Cancelled", &ERROR);

/// An operation was attempted in a state that does not permit it.
pub static ILLEGAL_STATE: ErrorClass = ErrorClass::new("IllegalState", &ERROR);

/// A promise was dropped without ever being completed.
pub static ABANDONED: ErrorClass = ErrorClass::new("Abandoned", &ILLEGAL_STATE);

/// Bytes could not be decoded into the requested representation.
pub static DECODE: ErrorClass = ErrorClass::new("DecodeError", &ERROR);

/// A value could not be encoded.
pub static ENCODE: ErrorClass = ErrorClass::new("EncodeError", &ERROR);

#[cfg(test)]
mod tests {
    use super::*;

    static CHILD_OF_FNF: ErrorClass = ErrorClass::new("ChildOfFnf", &FILE_NOT_FOUND);

    #[test]
    fn test_subclass_is_reflexive() {
        assert!(IO.is_subclass_of(&IO));
        assert!(!IO.is_strict_subclass_of(&IO));
    }

    #[test]
    fn test_subclass_walks_ancestors() {
        assert!(CHILD_OF_FNF.is_subclass_of(&FILE_NOT_FOUND));
        assert!(CHILD_OF_FNF.is_subclass_of(&IO));
        assert!(CHILD_OF_FNF.is_subclass_of(&ERROR));
        assert!(!IO.is_subclass_of(&FILE_NOT_FOUND));
        assert!(!DECODE.is_subclass_of(&IO));
    }

    #[test]
    fn test_depth() {
        assert_eq!(ERROR.depth(), 0);
        assert_eq!(IO.depth(), 1);
        assert_eq!(FILE_NOT_FOUND.depth(), 2);
        assert_eq!(CHILD_OF_FNF.depth(), 3);
    }

    #[test]
    fn test_identity_not_name() {
        static LOOKALIKE: ErrorClass = ErrorClass::new("IoError", &ERROR);
        assert_ne!(&LOOKALIKE, &IO);
        assert_eq!(LOOKALIKE.name(), IO.name());
    }

    #[test]
    fn test_display() {
        assert_eq!(FILE_NOT_FOUND.to_string(), "FileNotFound");
    }
}
