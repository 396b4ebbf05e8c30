//! Incoming request bodies.
//!
//! The transport pushes body chunks into a [`BodySender`] as they arrive,
//! while the handler decides, at most once, how it wants to consume the body
//! through the matching [`IncomingBody`]. Chunks arriving before that
//! decision are queued and replayed, in arrival order, into the chosen
//! consumer.
//!
//! ```text
//!  collecting ──(mode chosen)──▶ consuming ──finish()──▶ finished
//!      │                             │
//!      └──────────abort()────────────┴──────────────────▶ aborted
//! ```
//!
//! `finish()` received while still collecting is remembered, so a consumer
//! chosen afterwards completes as soon as the backlog is replayed. An abort
//! received while collecting is remembered as well and fails the eventual
//! consumer immediately. Once finished or aborted, further `append`,
//! `finish` and `abort` calls are ignored.
//!
//! # Example
//!
//! ```rust
//! use arrowhead_core::body;
//!
//! let (sender, body) = body::channel(None);
//! sender.append("Hello, ");
//! sender.append("world");
//!
//! let text = body.text();
//! sender.finish();
//!
//! text.if_success(|text| assert_eq!(text, "Hello, world"));
//! ```

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use arrowhead_future::{ContractViolation, Failure, Future, Outcome, Promise};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::codec::Decoder;
use crate::error::failures;

/// Creates a connected sender/receiver pair for one request body.
///
/// With `max_len` set, a body growing past that many bytes is aborted with a
/// [`PAYLOAD_TOO_LARGE`](crate::error::PAYLOAD_TOO_LARGE) failure.
#[must_use]
pub fn channel(max_len: Option<usize>) -> (BodySender, IncomingBody) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State::Collecting {
            backlog: Vec::new(),
            ended: false,
        }),
        requested: AtomicBool::new(false),
        received: AtomicUsize::new(0),
        max_len,
    });
    (
        BodySender {
            shared: Arc::clone(&shared),
        },
        IncomingBody { shared },
    )
}

struct Shared {
    state: Mutex<State>,
    requested: AtomicBool,
    received: AtomicUsize,
    max_len: Option<usize>,
}

enum State {
    Collecting { backlog: Vec<Bytes>, ended: bool },
    Consuming(Sink),
    Finished,
    Aborted(Failure),
}

enum Sink {
    Aggregate {
        buffer: BytesMut,
        promise: Promise<Bytes>,
    },
    Stream(mpsc::UnboundedSender<Outcome<Bytes>>),
}

impl Sink {
    fn push(&mut self, chunk: Bytes) {
        match self {
            Self::Aggregate { buffer, .. } => buffer.extend_from_slice(&chunk),
            Self::Stream(sender) => {
                // The reader may have dropped the stream.
                let _ = sender.send(Ok(chunk));
            }
        }
    }

    fn finish(self) {
        match self {
            Self::Aggregate { buffer, promise } => {
                promise.try_complete(Ok(buffer.freeze()));
            }
            Self::Stream(sender) => drop(sender),
        }
    }

    fn fail(self, failure: Failure) {
        match self {
            Self::Aggregate { promise, .. } => {
                promise.try_complete(Err(failure));
            }
            Self::Stream(sender) => {
                let _ = sender.send(Err(failure));
            }
        }
    }
}

/// What to do with a sink once the state lock is released.
enum Settle {
    Keep,
    Finish(Sink),
    Fail(Sink, Failure),
}

impl Settle {
    fn run(self) {
        match self {
            Self::Keep => {}
            Self::Finish(sink) => sink.finish(),
            Self::Fail(sink, failure) => sink.fail(failure),
        }
    }
}

impl Shared {
    /// Accounts for `len` more bytes; `false` once the limit is exceeded.
    fn admit(&self, len: usize) -> bool {
        let received = self.received.fetch_add(len, Ordering::AcqRel).saturating_add(len);
        self.max_len.map_or(true, |max| received <= max)
    }

    fn append(&self, chunk: Bytes) {
        let settle = {
            let mut state = self.state.lock();
            let open = matches!(
                &*state,
                State::Collecting { ended: false, .. } | State::Consuming(_)
            );
            if !open {
                return;
            }
            if self.admit(chunk.len()) {
                match &mut *state {
                    State::Collecting { backlog, .. } => backlog.push(chunk),
                    State::Consuming(sink) => sink.push(chunk),
                    State::Finished | State::Aborted(_) => {}
                }
                Settle::Keep
            } else {
                let failure = failures::payload_too_large(self.max_len.unwrap_or_default());
                abort_locked(&mut state, failure)
            }
        };
        settle.run();
    }

    fn finish(&self) {
        let settle = {
            let mut state = self.state.lock();
            match *state {
                State::Collecting { ref mut ended, .. } => {
                    *ended = true;
                    Settle::Keep
                }
                State::Consuming(_) => match std::mem::replace(&mut *state, State::Finished) {
                    State::Consuming(sink) => Settle::Finish(sink),
                    _ => Settle::Keep,
                },
                State::Finished | State::Aborted(_) => Settle::Keep,
            }
        };
        settle.run();
    }

    fn abort(&self, failure: Failure) {
        let settle = {
            let mut state = self.state.lock();
            abort_locked(&mut state, failure)
        };
        settle.run();
    }

    /// Installs the consumer, replaying the backlog into it.
    fn consume(&self, mut sink: Sink) {
        if self.requested.swap(true, Ordering::AcqRel) {
            ContractViolation::BodyAlreadyRequested.raise();
        }
        let settle = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, State::Finished) {
                State::Collecting { backlog, ended } => {
                    for chunk in backlog {
                        sink.push(chunk);
                    }
                    if ended {
                        Settle::Finish(sink)
                    } else {
                        *state = State::Consuming(sink);
                        Settle::Keep
                    }
                }
                State::Aborted(failure) => {
                    *state = State::Aborted(failure.clone());
                    Settle::Fail(sink, failure)
                }
                State::Finished => Settle::Finish(sink),
                State::Consuming(existing) => {
                    *state = State::Consuming(existing);
                    Settle::Keep
                }
            }
        };
        settle.run();
    }
}

/// Moves to `Aborted` unless already terminal.
fn abort_locked(state: &mut State, failure: Failure) -> Settle {
    match *state {
        State::Collecting { ended: false, .. } => {
            *state = State::Aborted(failure);
            Settle::Keep
        }
        State::Consuming(_) => match std::mem::replace(state, State::Aborted(failure.clone())) {
            State::Consuming(sink) => Settle::Fail(sink, failure),
            _ => Settle::Keep,
        },
        State::Collecting { ended: true, .. } | State::Finished | State::Aborted(_) => {
            Settle::Keep
        }
    }
}

/// The transport's side of a request body.
pub struct BodySender {
    shared: Arc<Shared>,
}

impl BodySender {
    /// Delivers the next chunk.
    pub fn append(&self, chunk: impl Into<Bytes>) {
        self.shared.append(chunk.into());
    }

    /// Signals that the body is complete.
    pub fn finish(&self) {
        self.shared.finish();
    }

    /// Signals that the body cannot be completed.
    pub fn abort(&self, failure: Failure) {
        self.shared.abort(failure);
    }
}

impl std::fmt::Debug for BodySender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodySender").finish_non_exhaustive()
    }
}

/// The handler's side of a request body.
///
/// Exactly one consumption method may be called per body; a second call
/// panics with [`ContractViolation::BodyAlreadyRequested`].
pub struct IncomingBody {
    shared: Arc<Shared>,
}

impl IncomingBody {
    /// A body that is already complete and empty.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// A body that is already complete with the given content.
    #[must_use]
    pub fn from_bytes(content: impl Into<Bytes>) -> Self {
        let (sender, body) = channel(None);
        let content = content.into();
        if !content.is_empty() {
            sender.append(content);
        }
        sender.finish();
        body
    }

    /// Returns `true` once a consumption method was called.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.shared.requested.load(Ordering::Acquire)
    }

    /// Collects the whole body.
    pub fn bytes(&self) -> Future<Bytes> {
        let promise = Promise::new();
        let future = promise.future();
        self.shared.consume(Sink::Aggregate {
            buffer: BytesMut::new(),
            promise,
        });
        future
    }

    /// Collects the whole body as UTF-8 text.
    pub fn text(&self) -> Future<String> {
        self.bytes().try_map(|bytes| {
            String::from_utf8(bytes.to_vec()).map_err(|e| Failure::decode(e.to_string()))
        })
    }

    /// Collects the whole body and decodes it with `decoder`.
    pub fn decode<T, D>(&self, decoder: D) -> Future<T>
    where
        T: DeserializeOwned + Send + 'static,
        D: Decoder,
    {
        self.bytes().try_map(move |bytes| decoder.decode(&bytes))
    }

    /// Streams the body chunk by chunk.
    ///
    /// The stream ends after the last chunk; an aborted body yields the
    /// abort failure as its final item.
    pub fn stream(&self) -> BodyStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.shared.consume(Sink::Stream(sender));
        BodyStream { receiver }
    }

    /// Writes the body to `path`, resolving to the number of bytes written.
    ///
    /// The file is written by a task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn write_to_file(&self, path: impl Into<PathBuf>) -> Future<u64> {
        let path = path.into();
        let mut stream = self.stream();
        Future::spawn(async move {
            let mut file = tokio::fs::File::create(&path).await?;
            let mut written = 0u64;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok(written)
        })
    }
}

impl Default for IncomingBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for IncomingBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncomingBody")
            .field("requested", &self.is_requested())
            .finish_non_exhaustive()
    }
}

/// A request body consumed as a stream of chunks.
pub struct BodyStream {
    receiver: mpsc::UnboundedReceiver<Outcome<Bytes>>,
}

impl Stream for BodyStream {
    type Item = Outcome<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PAYLOAD_TOO_LARGE;
    use arrowhead_future::class;
    use proptest::prelude::*;
    use std::panic::{self, AssertUnwindSafe};

    fn outcome<T: Send + 'static>(future: Future<T>) -> Option<Outcome<T>> {
        let slot = Arc::new(Mutex::new(None));
        let target = Arc::clone(&slot);
        future.on_completion(move |outcome| *target.lock() = Some(outcome));
        let taken = slot.lock().take();
        taken
    }

    #[test]
    fn test_backlog_replayed_in_order() {
        let (sender, body) = channel(None);
        sender.append("A");
        sender.append("B");
        let bytes = body.bytes();
        sender.finish();
        assert_eq!(&outcome(bytes).unwrap().unwrap()[..], b"AB");
    }

    #[test]
    fn test_backlog_then_live_chunks() {
        let (sender, body) = channel(None);
        sender.append("A");
        let text = body.text();
        sender.append("B");
        sender.append("C");
        sender.finish();
        assert_eq!(outcome(text).unwrap().unwrap(), "ABC");
    }

    #[test]
    fn test_finish_before_mode_chosen() {
        let (sender, body) = channel(None);
        sender.append("done");
        sender.finish();
        assert_eq!(outcome(body.text()).unwrap().unwrap(), "done");
    }

    #[test]
    fn test_consumer_waits_for_finish() {
        let (sender, body) = channel(None);
        let bytes = body.bytes();
        sender.append("x");
        let slot = Arc::new(Mutex::new(None));
        let target = Arc::clone(&slot);
        bytes.on_completion(move |outcome| *target.lock() = Some(outcome));
        assert!(slot.lock().is_none());
        sender.finish();
        assert!(slot.lock().is_some());
    }

    #[test]
    fn test_abort_before_mode_chosen_is_remembered() {
        let (sender, body) = channel(None);
        sender.append("partial");
        sender.abort(Failure::new(&class::IO, "connection reset"));
        let failure = outcome(body.bytes()).unwrap().unwrap_err();
        assert!(failure.is(&class::IO));
    }

    #[test]
    fn test_abort_while_consuming() {
        let (sender, body) = channel(None);
        let bytes = body.bytes();
        sender.append("partial");
        sender.abort(Failure::new(&class::IO, "connection reset"));
        assert_eq!(
            outcome(bytes).unwrap().unwrap_err().message(),
            "connection reset"
        );
    }

    #[test]
    fn test_terminal_states_ignore_further_calls() {
        let (sender, body) = channel(None);
        let bytes = body.bytes();
        sender.append("a");
        sender.finish();
        sender.append("b");
        sender.abort(Failure::error("late"));
        sender.finish();
        assert_eq!(&outcome(bytes).unwrap().unwrap()[..], b"a");
    }

    #[test]
    fn test_abort_after_finish_while_collecting_is_ignored() {
        let (sender, body) = channel(None);
        sender.append("kept");
        sender.finish();
        sender.abort(Failure::error("late"));
        assert_eq!(outcome(body.text()).unwrap().unwrap(), "kept");
    }

    #[test]
    fn test_second_request_is_contract_violation() {
        let body = IncomingBody::from_bytes("once");
        let _first = body.bytes();
        let result = panic::catch_unwind(AssertUnwindSafe(|| body.text()));
        let payload = result.err().unwrap();
        let message = payload.downcast_ref::<String>().cloned().unwrap_or_default();
        assert!(message.contains("request body already requested"));
    }

    #[test]
    fn test_max_len_aborts_with_payload_too_large() {
        let (sender, body) = channel(Some(4));
        let bytes = body.bytes();
        sender.append("abc");
        sender.append("de");
        sender.finish();
        assert!(outcome(bytes).unwrap().unwrap_err().is(&PAYLOAD_TOO_LARGE));
    }

    #[test]
    fn test_invalid_utf8_is_decode_failure() {
        let body = IncomingBody::from_bytes(vec![0xff, 0xfe]);
        assert!(outcome(body.text()).unwrap().unwrap_err().is(&class::DECODE));
    }

    #[test]
    fn test_decode_with_json() {
        let body = IncomingBody::from_bytes(r#"{"qty": 3}"#);
        #[derive(serde::Deserialize)]
        struct Line {
            qty: u32,
        }
        let line: Line = outcome(body.decode(crate::codec::JsonCodec)).unwrap().unwrap();
        assert_eq!(line.qty, 3);
    }

    #[tokio::test]
    async fn test_stream_replays_backlog_then_live() {
        let (sender, body) = channel(None);
        sender.append("A");
        let mut stream = body.stream();
        sender.append("B");
        sender.finish();
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk.unwrap());
        }
        assert_eq!(chunks, vec![Bytes::from("A"), Bytes::from("B")]);
    }

    #[tokio::test]
    async fn test_stream_yields_abort_failure() {
        let (sender, body) = channel(None);
        let mut stream = body.stream();
        sender.append("A");
        sender.abort(Failure::error("reset"));
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.bin");
        let (sender, body) = channel(None);
        sender.append("hello ");
        let written = body.write_to_file(&path);
        sender.append("file");
        sender.finish();
        assert_eq!(written.await.unwrap(), 10);
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "hello file");
    }

    fn split(content: &[u8], cuts: &[usize]) -> Vec<Bytes> {
        let mut cuts: Vec<usize> = cuts.iter().map(|cut| cut % (content.len() + 1)).collect();
        cuts.sort_unstable();
        let mut chunks = Vec::new();
        let mut start = 0;
        for cut in cuts.into_iter().chain([content.len()]) {
            chunks.push(Bytes::copy_from_slice(&content[start..cut]));
            start = cut;
        }
        chunks
    }

    proptest! {
        #[test]
        fn prop_bytes_equal_appended_content(
            content in proptest::collection::vec(any::<u8>(), 0..256),
            cuts in proptest::collection::vec(any::<usize>(), 0..8),
            requested_at in any::<usize>(),
        ) {
            let chunks = split(&content, &cuts);
            let requested_at = requested_at % (chunks.len() + 1);
            let (sender, body) = channel(None);
            let mut bytes = None;
            for (index, chunk) in chunks.into_iter().enumerate() {
                if index == requested_at {
                    bytes = Some(body.bytes());
                }
                sender.append(chunk);
            }
            let bytes = bytes.unwrap_or_else(|| body.bytes());
            sender.finish();
            prop_assert_eq!(&outcome(bytes).unwrap().unwrap()[..], &content[..]);
        }

        #[test]
        fn prop_limit_admits_exactly_up_to_max(
            content in proptest::collection::vec(any::<u8>(), 0..64),
            cuts in proptest::collection::vec(any::<usize>(), 0..4),
            max in 1usize..64,
        ) {
            let (sender, body) = channel(Some(max));
            let bytes = body.bytes();
            for chunk in split(&content, &cuts) {
                sender.append(chunk);
            }
            sender.finish();
            match outcome(bytes).unwrap() {
                Ok(received) => {
                    prop_assert!(content.len() <= max);
                    prop_assert_eq!(&received[..], &content[..]);
                }
                Err(failure) => {
                    prop_assert!(content.len() > max);
                    prop_assert!(failure.is(&PAYLOAD_TOO_LARGE));
                }
            }
        }
    }
}
