//! Single-threaded promises and futures.
//!
//! Same contract as the crate-level [`Promise`](crate::Promise) and
//! [`Future`](crate::Future), without any synchronisation. Values and
//! closures need not be `Send`, and the handles themselves are `!Send`, so
//! the compiler keeps every completion and subscription on one thread.
//!
//! ```rust
//! use std::rc::Rc;
//! use arrowhead_future::local::Promise;
//!
//! let promise = Promise::new();
//! let shared = Rc::new(5);
//! promise
//!     .future()
//!     .map(move |n: u32| n + *shared)
//!     .if_success(|n| assert_eq!(n, 7));
//! promise.complete(Ok(2));
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::failure::{Failure, Outcome};
use crate::violation::ContractViolation;

type Consumer<T> = Box<dyn FnOnce(Outcome<T>)>;

enum Slot<T> {
    Initial,
    HasConsumer(Consumer<T>),
    HasResult(Outcome<T>),
    Completed,
}

struct LocalCell<T> {
    slot: RefCell<Slot<T>>,
    written: Cell<bool>,
    subscribed: Cell<bool>,
}

impl<T> LocalCell<T> {
    fn new() -> Self {
        Self {
            slot: RefCell::new(Slot::Initial),
            written: Cell::new(false),
            subscribed: Cell::new(false),
        }
    }

    fn try_complete(&self, outcome: Outcome<T>) -> bool {
        if self.written.replace(true) {
            return false;
        }
        let previous = self.slot.replace(Slot::Completed);
        match previous {
            Slot::HasConsumer(consumer) => consumer(outcome),
            _ => *self.slot.borrow_mut() = Slot::HasResult(outcome),
        }
        true
    }

    fn subscribe(&self, consumer: Consumer<T>) {
        if self.subscribed.replace(true) {
            ContractViolation::ConsumerAlreadySet.raise();
        }
        let previous = self.slot.replace(Slot::Completed);
        match previous {
            Slot::HasResult(outcome) => consumer(outcome),
            _ => *self.slot.borrow_mut() = Slot::HasConsumer(consumer),
        }
    }
}

/// The write side of a single-threaded cell.
pub struct Promise<T> {
    cell: Rc<LocalCell<T>>,
}

impl<T: 'static> Promise<T> {
    /// Creates an uncompleted promise.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: Rc::new(LocalCell::new()),
        }
    }

    /// Returns a future reading this promise's cell.
    #[must_use]
    pub fn future(&self) -> Future<T> {
        Future {
            inner: Inner::Pending(Rc::clone(&self.cell)),
        }
    }

    /// Completes the promise.
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::AlreadyCompleted`] if the promise was
    /// already completed.
    #[track_caller]
    pub fn complete(&self, outcome: Outcome<T>) {
        if !self.cell.try_complete(outcome) {
            ContractViolation::AlreadyCompleted.raise();
        }
    }

    /// Completes the promise unless it already holds a result.
    pub fn try_complete(&self, outcome: Outcome<T>) -> bool {
        self.cell.try_complete(outcome)
    }

    /// Returns `true` once the promise holds a result.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.cell.written.get()
    }
}

impl<T: 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if !self.cell.written.get() {
            self.cell.try_complete(Err(Failure::abandoned()));
        }
    }
}

/// The read side of a single-threaded cell.
pub struct Future<T> {
    inner: Inner<T>,
}

enum Inner<T> {
    Ready(Outcome<T>),
    Pending(Rc<LocalCell<T>>),
}

impl<T: 'static> Future<T> {
    /// An already completed, successful future.
    #[must_use]
    pub fn success(value: T) -> Self {
        Self::from_outcome(Ok(value))
    }

    /// An already completed, failed future.
    #[must_use]
    pub fn failure(failure: Failure) -> Self {
        Self::from_outcome(Err(failure))
    }

    /// An already completed future holding `outcome`.
    #[must_use]
    pub fn from_outcome(outcome: Outcome<T>) -> Self {
        Self {
            inner: Inner::Ready(outcome),
        }
    }

    /// Registers the consumer that receives this future's outcome.
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::ConsumerAlreadySet`] on a second
    /// registration against the same cell.
    #[track_caller]
    pub fn on_completion<F>(self, consumer: F)
    where
        F: FnOnce(Outcome<T>) + 'static,
    {
        match self.inner {
            Inner::Ready(outcome) => consumer(outcome),
            Inner::Pending(cell) => cell.subscribe(Box::new(consumer)),
        }
    }

    /// Returns `true` if the outcome is already available.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        match &self.inner {
            Inner::Ready(_) => true,
            Inner::Pending(cell) => cell.written.get(),
        }
    }

    /// Cancels the future if it has not completed yet.
    pub fn cancel(&self) -> bool {
        match &self.inner {
            Inner::Ready(_) => false,
            Inner::Pending(cell) => cell.try_complete(Err(Failure::cancelled())),
        }
    }
}

impl Future<()> {
    /// An already completed, successful future without a value.
    #[must_use]
    pub fn done() -> Self {
        Self::success(())
    }
}

struct Shared<S>(Rc<RefCell<S>>);

impl<S> Shared<S> {
    fn new(state: S) -> Self {
        Self(Rc::new(RefCell::new(state)))
    }

    fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}

impl<S> Clone for Shared<S> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl_combinators!(Future, Promise, Shared);
