//! Thread-safe promises and futures.
//!
//! A [`Promise`] and the [`Future`] handles it hands out share one cell. The
//! cell moves out of its initial state exactly once, through a single atomic
//! transition won either by the producer ("got a result") or by the consumer
//! ("became ready"). Whichever side loses the race finds the other side's
//! data already published and performs the delivery, so the consumer runs
//! exactly once, on the thread of whoever arrived second.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::failure::{Failure, Outcome};
use crate::violation::ContractViolation;

const INITIAL: u8 = 0;
const HAS_CONSUMER: u8 = 1;
const HAS_RESULT: u8 = 2;
const COMPLETED: u8 = 3;

type Consumer<T> = Box<dyn FnOnce(Outcome<T>) + Send>;

struct Cell<T> {
    state: AtomicU8,
    written: AtomicBool,
    subscribed: AtomicBool,
    outcome: Mutex<Option<Outcome<T>>>,
    consumer: Mutex<Option<Consumer<T>>>,
}

impl<T> Cell<T> {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(INITIAL),
            written: AtomicBool::new(false),
            subscribed: AtomicBool::new(false),
            outcome: Mutex::new(None),
            consumer: Mutex::new(None),
        }
    }

    fn try_complete(&self, outcome: Outcome<T>) -> bool {
        if self.written.swap(true, Ordering::AcqRel) {
            return false;
        }
        *self.outcome.lock() = Some(outcome);
        self.advance(HAS_RESULT);
        true
    }

    fn subscribe(&self, consumer: Consumer<T>) {
        if self.subscribed.swap(true, Ordering::AcqRel) {
            ContractViolation::ConsumerAlreadySet.raise();
        }
        *self.consumer.lock() = Some(consumer);
        self.advance(HAS_CONSUMER);
    }

    /// Leaves `INITIAL` for `arrived`; the second side to arrive delivers.
    fn advance(&self, arrived: u8) {
        if self
            .state
            .compare_exchange(INITIAL, arrived, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.state.store(COMPLETED, Ordering::Release);
            self.deliver();
        }
    }

    fn deliver(&self) {
        let consumer = self.consumer.lock().take();
        let outcome = self.outcome.lock().take();
        if let (Some(consumer), Some(outcome)) = (consumer, outcome) {
            consumer(outcome);
        }
    }

    fn is_written(&self) -> bool {
        self.written.load(Ordering::Acquire)
    }
}

/// The write side of a single-assignment cell.
///
/// # Example
///
/// ```rust
/// use arrowhead_future::Promise;
///
/// let promise = Promise::new();
/// let future = promise.future().map(|n: u32| n * 2);
///
/// promise.complete(Ok(21));
///
/// future.on_completion(|outcome| assert_eq!(outcome.unwrap(), 42));
/// ```
pub struct Promise<T> {
    cell: Arc<Cell<T>>,
}

impl<T: Send + 'static> Promise<T> {
    /// Creates an uncompleted promise.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: Arc::new(Cell::new()),
        }
    }

    /// Returns a future reading this promise's cell.
    ///
    /// Every call returns a handle to the same cell; only one of them may
    /// register a consumer.
    #[must_use]
    pub fn future(&self) -> Future<T> {
        Future {
            inner: Inner::Pending(Arc::clone(&self.cell)),
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
    ///
    /// Returns `true` if this call completed the promise.
    pub fn try_complete(&self, outcome: Outcome<T>) -> bool {
        self.cell.try_complete(outcome)
    }

    /// Returns `true` once the promise holds a result, including a
    /// cancellation.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.cell.is_written()
    }
}

impl<T: Send + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if !self.cell.is_written() {
            self.cell.try_complete(Err(Failure::abandoned()));
        }
    }
}

/// The read side of a single-assignment cell.
///
/// A future accepts exactly one consumer. Consumers registered on an already
/// completed future run immediately, on the registering thread.
pub struct Future<T> {
    inner: Inner<T>,
}

enum Inner<T> {
    Ready(Outcome<T>),
    Pending(Arc<Cell<T>>),
}

impl<T: Send + 'static> Future<T> {
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
    /// Panics with [`ContractViolation::ConsumerAlreadySet`] if another handle
    /// to the same cell already registered a consumer.
    #[track_caller]
    pub fn on_completion<F>(self, consumer: F)
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
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
            Inner::Pending(cell) => cell.is_written(),
        }
    }

    /// Cancels the future if it has not completed yet.
    ///
    /// The consumer then receives a [`CANCELLED`](crate::class::CANCELLED)
    /// failure and the producer's eventual result is discarded. Work already
    /// started by the producer is not undone.
    pub fn cancel(&self) -> bool {
        self.canceller().cancel()
    }

    /// Returns a handle able to cancel this future after it was moved into
    /// a consumer or operator.
    #[must_use]
    pub fn canceller(&self) -> Canceller<T> {
        Canceller {
            cell: match &self.inner {
                Inner::Ready(_) => None,
                Inner::Pending(cell) => Some(Arc::clone(cell)),
            },
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

/// Cancels a [`Future`] from outside its consumer chain.
pub struct Canceller<T> {
    cell: Option<Arc<Cell<T>>>,
}

impl<T> Canceller<T> {
    /// Completes the future with a cancellation failure.
    ///
    /// Returns `false` if the future had already completed.
    pub fn cancel(&self) -> bool {
        self.cell
            .as_ref()
            .is_some_and(|cell| cell.try_complete(Err(Failure::cancelled())))
    }
}

impl<T> Clone for Canceller<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

/// Lock-guarded state shared between an operator and its consumers.
struct Shared<S>(Arc<Mutex<S>>);

impl<S> Shared<S> {
    fn new(state: S) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.0.lock())
    }
}

impl<S> Clone for Shared<S> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl_combinators!(Future, Promise, Shared, Send);
