//! Fan-out of one future to many subscribers.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::failure::Outcome;
use crate::promise::{Future, Promise};

enum State<T> {
    Collecting(Vec<Promise<T>>),
    Flushed(Outcome<T>),
}

/// Shares the outcome of one source future with any number of subscribers.
///
/// Subscribers that arrive before the source completes wait on their own
/// promise; subscribers that arrive later receive an already completed
/// future built from the cached outcome.
///
/// # Example
///
/// ```rust
/// use arrowhead_future::{Promise, Publisher};
///
/// let source = Promise::new();
/// let publisher = Publisher::new(source.future());
///
/// let early = publisher.subscribe();
/// source.complete(Ok("token".to_string()));
/// let late = publisher.subscribe();
///
/// early.if_success(|token| assert_eq!(token, "token"));
/// late.if_success(|token| assert_eq!(token, "token"));
/// ```
pub struct Publisher<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T: Clone + Send + 'static> Publisher<T> {
    /// Subscribes to `source` and starts collecting subscribers.
    #[must_use]
    pub fn new(source: Future<T>) -> Self {
        let state = Arc::new(Mutex::new(State::Collecting(Vec::new())));
        let target = Arc::clone(&state);
        source.on_completion(move |outcome| flush(&target, outcome));
        Self { state }
    }

    /// Returns a future completing with the source's outcome.
    #[must_use]
    pub fn subscribe(&self) -> Future<T> {
        let mut state = self.state.lock();
        match &mut *state {
            State::Collecting(pending) => {
                let promise = Promise::new();
                let future = promise.future();
                pending.push(promise);
                future
            }
            State::Flushed(outcome) => Future::from_outcome(outcome.clone()),
        }
    }

    /// Returns `true` once the source completed and subscribers were served.
    #[must_use]
    pub fn is_flushed(&self) -> bool {
        matches!(*self.state.lock(), State::Flushed(_))
    }
}

/// Delivers `outcome` to every pending subscriber.
///
/// A subscriber whose consumer panics does not stop delivery to the others.
/// Every panic is logged and re-raised once all subscribers were served: a
/// single panic keeps its payload, several are combined into one message
/// naming each of them.
fn flush<T: Clone + Send + 'static>(state: &Mutex<State<T>>, outcome: Outcome<T>) {
    let pending = {
        let mut state = state.lock();
        match std::mem::replace(&mut *state, State::Flushed(outcome.clone())) {
            State::Collecting(pending) => pending,
            State::Flushed(_) => Vec::new(),
        }
    };

    let mut panics: Vec<Box<dyn Any + Send>> = Vec::new();
    for promise in pending {
        let outcome = outcome.clone();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || {
            promise.try_complete(outcome);
        })) {
            tracing::error!(
                panic = panic_message(payload.as_ref()),
                "publisher subscriber panicked"
            );
            panics.push(payload);
        }
    }

    match panics.len() {
        0 => {}
        1 => {
            if let Some(payload) = panics.pop() {
                panic::resume_unwind(payload);
            }
        }
        count => {
            tracing::error!(count, "multiple publisher subscribers panicked");
            let messages: Vec<&str> = panics
                .iter()
                .map(|payload| panic_message(payload.as_ref()))
                .collect();
            let combined = format!(
                "{count} publisher subscribers panicked: {}",
                messages.join("; ")
            );
            panic::resume_unwind(Box::new(combined));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
