//! Contract violations.
//!
//! Completing a promise twice, registering two consumers on one future and
//! requesting a request body twice are bugs in the calling code, not
//! business failures. They never travel through an [`Outcome`](crate::Outcome);
//! the offending call panics instead.

use thiserror::Error;

/// A misuse of a single-assignment primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// `complete` was called on a promise that already holds a result.
    #[error("promise already completed")]
    AlreadyCompleted,

    /// A second consumer was registered on the same future.
    #[error("future already has a consumer")]
    ConsumerAlreadySet,

    /// A request body was requested in a second consumption mode.
    #[error("request body already requested")]
    BodyAlreadyRequested,
}

impl ContractViolation {
    /// Aborts the current code path.
    ///
    /// # Panics
    ///
    /// Always.
    #[track_caller]
    pub fn raise(self) -> ! {
        panic!("contract violation: {self}")
    }
}
