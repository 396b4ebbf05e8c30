//! # Arrowhead Future
//!
//! Single-assignment asynchronous composition for the Arrowhead framework.
//!
//! Every operation in Arrowhead returns a [`Future`]: the read side of a cell
//! that a [`Promise`] writes exactly once. Futures do not poll; a future
//! accepts exactly one consumer, which runs synchronously inside whichever
//! call supplies the last missing piece (the result or the consumer).
//!
//! - [`Outcome`] / [`Failure`] - terminal outcome of a computation
//! - [`class`] - the error class tree failures are classified by
//! - [`Promise`] / [`Future`] - thread-safe cell and its operators
//! - [`local`] - the same contract for single-threaded use
//! - [`Publisher`] - shares one outcome with many subscribers
//! - [`ContractViolation`] - misuse of the single-assignment contract
//!
//! ## Example
//!
//! ```rust
//! use arrowhead_future::{Failure, Future, Promise};
//!
//! let promise = Promise::new();
//! let total = promise
//!     .future()
//!     .try_map(|raw: String| raw.parse::<u32>().map_err(|e| Failure::decode(e.to_string())))
//!     .zip(Future::success(2), |a, b| Ok(a + b))
//!     .recover(|_| Ok(0));
//!
//! promise.complete(Ok("40".to_string()));
//! total.if_success(|value| assert_eq!(value, 42));
//! ```
//!
//! ## Failures and panics
//!
//! Business failures travel as `Err(Failure)` values. Panics raised inside
//! consumers or operator closures are never captured and never turned into
//! failures; they unwind out of the call that completed the cell.

#![doc(html_root_url = "https://docs.rs/arrowhead-future/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

#[macro_use]
mod combinators;

mod bridge;
pub mod class;
mod failure;
pub mod local;
mod promise;
mod publisher;
mod violation;

pub use bridge::Completion;
pub use class::ErrorClass;
pub use failure::{Failure, Outcome};
pub use promise::{Canceller, Future, Promise};
pub use publisher::Publisher;
pub use violation::ContractViolation;
