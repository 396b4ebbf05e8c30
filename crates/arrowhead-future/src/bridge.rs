//! Interoperability with `async` code running on tokio.

use std::future::IntoFuture;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::failure::{Failure, Outcome};
use crate::promise::{Future, Promise};

/// The `std::future::Future` produced by awaiting a [`Future`].
///
/// Registers the awaited future's consumer; resolves to its outcome.
#[must_use = "completions do nothing unless awaited"]
pub struct Completion<T> {
    receiver: oneshot::Receiver<Outcome<T>>,
}

impl<T> std::future::Future for Completion<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(Failure::abandoned())))
    }
}

impl<T: Send + 'static> IntoFuture for Future<T> {
    type Output = Outcome<T>;
    type IntoFuture = Completion<T>;

    fn into_future(self) -> Self::IntoFuture {
        let (sender, receiver) = oneshot::channel();
        self.on_completion(move |outcome| {
            // The awaiting side may have been dropped.
            let _ = sender.send(outcome);
        });
        Completion { receiver }
    }
}

impl<T: Send + 'static> Future<T> {
    /// Runs `task` on the current tokio runtime and exposes its outcome as a
    /// [`Future`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<F>(task: F) -> Self
    where
        F: std::future::Future<Output = Outcome<T>> + Send + 'static,
    {
        let promise = Promise::new();
        let future = promise.future();
        tokio::spawn(async move {
            promise.try_complete(task.await);
        });
        future
    }
}
