//! Composition operators shared by both future flavors.
//!
//! The operators are written once against the primitive surface every flavor
//! provides (`Promise::new`, `Promise::future`, `Promise::try_complete`,
//! `Future::on_completion`, `Future::success`) and stamped out for the
//! thread-safe and the single-threaded flavor. The optional trailing bound
//! (`Send` for the thread-safe flavor) is added to every value and closure.
//!
//! Every operator derives a new future backed by a fresh promise. Derived
//! promises are completed with `try_complete`, so a cancelled derived future
//! silently discards the late result. Panics raised by user closures are
//! never caught: they propagate out of whichever call completed the source.
//!
//! Operators that span many futures (`serialize`, `join_all`) keep their
//! state in the flavor's `Shared` cell instead of nesting derived futures.

use std::mem;

use crate::failure::{Failure, Outcome};

/// Passes control between a driving loop and the consumer it registered.
///
/// Whichever side arrives second receives the outcome together with the
/// loop state and continues the loop.
pub(crate) enum Handoff<T, S> {
    Registering,
    Delivered(Outcome<T>),
    Parked(S),
    Resumed,
}

impl<T, S> Handoff<T, S> {
    /// Consumer side.
    pub(crate) fn deliver(&mut self, outcome: Outcome<T>) -> Option<(Outcome<T>, S)> {
        match mem::replace(self, Self::Resumed) {
            Self::Parked(state) => Some((outcome, state)),
            _ => {
                *self = Self::Delivered(outcome);
                None
            }
        }
    }

    /// Loop side, once the consumer is registered.
    pub(crate) fn park(&mut self, state: S) -> Option<(Outcome<T>, S)> {
        match mem::replace(self, Self::Resumed) {
            Self::Delivered(outcome) => Some((outcome, state)),
            _ => {
                *self = Self::Parked(state);
                None
            }
        }
    }
}

/// Collected state of a `join_all`.
///
/// `pending` counts unfinished futures plus one for the registration loop,
/// so the result is assembled exactly once, by whoever finishes last.
pub(crate) struct Join<T, P> {
    values: Vec<Option<T>>,
    failures: Vec<(usize, Failure)>,
    pending: usize,
    promise: Option<P>,
}

impl<T, P> Join<T, P> {
    pub(crate) fn new(promise: P) -> Self {
        Self {
            values: Vec::new(),
            failures: Vec::new(),
            pending: 1,
            promise: Some(promise),
        }
    }

    /// Reserves a slot for the next future and returns its index.
    pub(crate) fn expect(&mut self) -> usize {
        self.values.push(None);
        self.pending += 1;
        self.values.len() - 1
    }

    pub(crate) fn record(&mut self, index: usize, outcome: Outcome<T>) -> Option<(P, Outcome<Vec<T>>)> {
        match outcome {
            Ok(value) => {
                if let Some(slot) = self.values.get_mut(index) {
                    *slot = Some(value);
                }
            }
            Err(failure) => self.failures.push((index, failure)),
        }
        self.settle()
    }

    /// Marks the registration loop as finished.
    pub(crate) fn seal(&mut self) -> Option<(P, Outcome<Vec<T>>)> {
        self.settle()
    }

    fn settle(&mut self) -> Option<(P, Outcome<Vec<T>>)> {
        self.pending -= 1;
        if self.pending > 0 {
            return None;
        }
        let promise = self.promise.take()?;
        let mut failures = mem::take(&mut self.failures);
        failures.sort_by_key(|(index, _)| *index);
        let mut failures = failures.into_iter().map(|(_, failure)| failure);
        let outcome = match failures.next() {
            None => Ok(mem::take(&mut self.values).into_iter().flatten().collect()),
            Some(first) => Err(failures.fold(first, Failure::with_suppressed)),
        };
        Some((promise, outcome))
    }
}

macro_rules! impl_combinators {
    ($future:ident, $promise:ident, $shared:ident $(, $bound:ident)?) => {
        impl<T: 'static $(+ $bound)?> $future<T> {
            /// Transforms a successful value. Failures pass through unchanged.
            pub fn map<U, F>(self, f: F) -> $future<U>
            where
                U: 'static $(+ $bound)?,
                F: FnOnce(T) -> U + 'static $(+ $bound)?,
            {
                self.try_map(move |value| Ok(f(value)))
            }

            /// Transforms a successful value with a fallible closure.
            ///
            /// An `Err` returned by `f` becomes the derived future's failure.
            pub fn try_map<U, F>(self, f: F) -> $future<U>
            where
                U: 'static $(+ $bound)?,
                F: FnOnce(T) -> $crate::Outcome<U> + 'static $(+ $bound)?,
            {
                let promise = $promise::new();
                let derived = promise.future();
                self.on_completion(move |outcome| {
                    promise.try_complete(outcome.and_then(f));
                });
                derived
            }

            /// Chains a computation that itself returns a future and adopts
            /// its outcome.
            pub fn flat_map<U, F>(self, f: F) -> $future<U>
            where
                U: 'static $(+ $bound)?,
                F: FnOnce(T) -> $future<U> + 'static $(+ $bound)?,
            {
                let promise = $promise::new();
                let derived = promise.future();
                self.on_completion(move |outcome| match outcome {
                    Ok(value) => f(value).on_completion(move |nested| {
                        promise.try_complete(nested);
                    }),
                    Err(failure) => {
                        promise.try_complete(Err(failure));
                    }
                });
                derived
            }

            /// Substitutes a value for a failure.
            ///
            /// If `f` fails as well, the original failure is kept and `f`'s
            /// failure is attached to it as suppressed.
            pub fn recover<F>(self, f: F) -> $future<T>
            where
                F: FnOnce(&$crate::Failure) -> $crate::Outcome<T> + 'static $(+ $bound)?,
            {
                let promise = $promise::new();
                let derived = promise.future();
                self.on_completion(move |outcome| {
                    let outcome = match outcome {
                        Ok(value) => Ok(value),
                        Err(failure) => match f(&failure) {
                            Ok(value) => Ok(value),
                            Err(secondary) => Err(failure.with_suppressed(secondary)),
                        },
                    };
                    promise.try_complete(outcome);
                });
                derived
            }

            /// Substitutes a future for a failure and adopts its outcome.
            pub fn flat_recover<F>(self, f: F) -> $future<T>
            where
                F: FnOnce($crate::Failure) -> $future<T> + 'static $(+ $bound)?,
            {
                let promise = $promise::new();
                let derived = promise.future();
                self.on_completion(move |outcome| match outcome {
                    Ok(value) => {
                        promise.try_complete(Ok(value));
                    }
                    Err(failure) => f(failure).on_completion(move |nested| {
                        promise.try_complete(nested);
                    }),
                });
                derived
            }

            /// Fails with [`NO_SUCH_ELEMENT`](crate::class::NO_SUCH_ELEMENT)
            /// unless `predicate` accepts the value.
            pub fn filter<P>(self, predicate: P) -> $future<T>
            where
                P: FnOnce(&T) -> bool + 'static $(+ $bound)?,
            {
                self.filter_or_else(predicate, |_| $crate::Failure::no_such_element())
            }

            /// Fails with the failure built by `rejected` unless `predicate`
            /// accepts the value.
            pub fn filter_or_else<P, R>(self, predicate: P, rejected: R) -> $future<T>
            where
                P: FnOnce(&T) -> bool + 'static $(+ $bound)?,
                R: FnOnce(T) -> $crate::Failure + 'static $(+ $bound)?,
            {
                self.try_map(move |value| {
                    if predicate(&value) {
                        Ok(value)
                    } else {
                        Err(rejected(value))
                    }
                })
            }

            /// Waits for this future and `other`, then combines both values.
            ///
            /// If one side fails the derived future fails with that failure;
            /// if both fail, `other`'s failure is attached as suppressed.
            pub fn zip<V, R, F>(self, other: $future<V>, combine: F) -> $future<R>
            where
                V: 'static $(+ $bound)?,
                R: 'static $(+ $bound)?,
                F: FnOnce(T, V) -> $crate::Outcome<R> + 'static $(+ $bound)?,
            {
                let promise = $promise::new();
                let derived = promise.future();
                self.on_completion(move |first| {
                    other.on_completion(move |second| {
                        let outcome = match (first, second) {
                            (Ok(left), Ok(right)) => combine(left, right),
                            (Err(left), Err(right)) => Err(left.with_suppressed(right)),
                            (Err(failure), Ok(_)) | (Ok(_), Err(failure)) => Err(failure),
                        };
                        promise.try_complete(outcome);
                    });
                });
                derived
            }

            /// Like [`zip`](Self::zip), with a combinator returning a future.
            pub fn flat_zip<V, R, F>(self, other: $future<V>, combine: F) -> $future<R>
            where
                V: 'static $(+ $bound)?,
                R: 'static $(+ $bound)?,
                F: FnOnce(T, V) -> $future<R> + 'static $(+ $bound)?,
            {
                self.zip(other, |left, right| Ok((left, right)))
                    .flat_map(move |(left, right)| combine(left, right))
            }

            /// Runs a side effect once the outcome is known, keeping the
            /// outcome unless the side effect fails.
            ///
            /// A failing side effect replaces the outcome; an original
            /// failure is attached to it as suppressed.
            pub fn also<F>(self, f: F) -> $future<T>
            where
                F: FnOnce(&$crate::Outcome<T>) -> $crate::Outcome<()> + 'static $(+ $bound)?,
            {
                let promise = $promise::new();
                let derived = promise.future();
                self.on_completion(move |outcome| {
                    let outcome = match f(&outcome) {
                        Ok(()) => outcome,
                        Err(failure) => match outcome {
                            Ok(_) => Err(failure),
                            Err(original) => Err(failure.with_suppressed(original)),
                        },
                    };
                    promise.try_complete(outcome);
                });
                derived
            }

            /// Discards the value.
            pub fn pass(self) -> $future<()> {
                self.map(|_| ())
            }

            /// Consumes the future, running `f` only on success.
            pub fn if_success<F>(self, f: F)
            where
                F: FnOnce(T) + 'static $(+ $bound)?,
            {
                self.on_completion(move |outcome| {
                    if let Ok(value) = outcome {
                        f(value);
                    }
                });
            }

            /// Consumes the future, running `f` only on failure.
            pub fn on_failure<F>(self, f: F)
            where
                F: FnOnce($crate::Failure) + 'static $(+ $bound)?,
            {
                self.on_completion(move |outcome| {
                    if let Err(failure) = outcome {
                        f(failure);
                    }
                });
            }

            /// Runs `suppliers` one after another, starting each only after
            /// the previous one succeeded, and collects their values.
            ///
            /// The first failure stops the sequence. Suppliers that complete
            /// synchronously are driven in a loop, so long sequences do not
            /// grow the stack.
            pub fn serialize<I, S>(suppliers: I) -> $future<Vec<T>>
            where
                I: IntoIterator<Item = S>,
                I::IntoIter: 'static $(+ $bound)?,
                S: FnOnce() -> $future<T>,
            {
                let promise = $promise::new();
                let serialized = promise.future();
                Self::serialize_drive(suppliers.into_iter(), Vec::new(), promise, None);
                serialized
            }

            /// Starts suppliers until one of them completes after its
            /// consumer was registered; that consumer then resumes the loop.
            fn serialize_drive<I, S>(
                mut suppliers: I,
                mut values: Vec<T>,
                mut promise: $promise<Vec<T>>,
                mut last: Option<$crate::Outcome<T>>,
            ) where
                I: Iterator<Item = S> + 'static $(+ $bound)?,
                S: FnOnce() -> $future<T>,
            {
                loop {
                    match last.take() {
                        Some(Ok(value)) => values.push(value),
                        Some(Err(failure)) => {
                            promise.try_complete(Err(failure));
                            return;
                        }
                        None => {}
                    }
                    let Some(supplier) = suppliers.next() else {
                        promise.try_complete(Ok(values));
                        return;
                    };

                    let handoff: $shared<
                        $crate::combinators::Handoff<T, (I, Vec<T>, $promise<Vec<T>>)>,
                    > = $shared::new($crate::combinators::Handoff::Registering);
                    let consumer_side = handoff.clone();
                    supplier().on_completion(move |outcome| {
                        let resumed = consumer_side.with(|stage| stage.deliver(outcome));
                        if let Some((outcome, (suppliers, values, promise))) = resumed {
                            Self::serialize_drive(suppliers, values, promise, Some(outcome));
                        }
                    });

                    let state = (suppliers, values, promise);
                    match handoff.with(|stage| stage.park(state)) {
                        None => return,
                        Some((outcome, state)) => {
                            (suppliers, values, promise) = state;
                            last = Some(outcome);
                        }
                    }
                }
            }

            /// Waits for every future in `futures` and collects their values
            /// in iteration order.
            ///
            /// The first failure in iteration order wins; later failures are
            /// attached to it as suppressed.
            pub fn join_all<I>(futures: I) -> $future<Vec<T>>
            where
                I: IntoIterator<Item = $future<T>>,
            {
                let promise = $promise::new();
                let joined = promise.future();
                let join = $shared::new($crate::combinators::Join::new(promise));
                for future in futures {
                    let index = join.with($crate::combinators::Join::expect);
                    let join = join.clone();
                    future.on_completion(move |outcome| {
                        let finished = join.with(|state| state.record(index, outcome));
                        if let Some((promise, all)) = finished {
                            promise.try_complete(all);
                        }
                    });
                }
                if let Some((promise, all)) = join.with($crate::combinators::Join::seal) {
                    promise.try_complete(all);
                }
                joined
            }
        }
    };
}
