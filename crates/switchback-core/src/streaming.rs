//! Streaming response writers.
//!
//! A streaming response is a normal [`Response`] whose body is fed by
//! a producer task running concurrently with delivery. The producer
//! gets a writer handle; the response head is fixed the moment the
//! constructor returns, so the producer can keep sending chunks but
//! can no longer touch status or headers.
//!
//! Two writers exist:
//! - [`StreamWriter`] sends raw byte or text chunks.
//! - [`JsonStreamWriter`] serializes values, framed either as
//!   newline-delimited JSON or as one bracketed JSON array.
//!
//! Both are safe to close twice, and writes after close are silently
//! dropped. When the request is aborted the producer future is
//! dropped outright, which tears down any timers or buffers it holds.
//!
//! # Example
//!
//! ```ignore
//! async fn events(ctx: RequestContext) -> Result<Response, BoxError> {
//!     Ok(stream_response(&ctx, |writer| {
//!         writer.set_content_type("text/event-stream");
//!         async move {
//!             writer.write("data: tick\n\n").await;
//!             writer.close();
//!             Ok(())
//!         }
//!     }))
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::context::RequestContext;
use crate::middleware::BoxError;
use crate::response::{Response, ResponseBody, StatusCode};

/// Chunks buffered between producer and consumer before writes await.
const CHANNEL_CAPACITY: usize = 16;

// ============================================================================
// Body stream
// ============================================================================

/// The consuming half of a streaming body.
///
/// The host adapter drains this (it implements
/// [`Stream`](futures_core::Stream)); the stream ends when the
/// producer closes its writer or the request is aborted.
pub struct BodyStream {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl BodyStream {
    pub(crate) fn new(rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { rx }
    }

    /// Receive the next chunk, or `None` once the body is complete.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    /// Drain all remaining chunks into one buffer.
    pub async fn collect_bytes(mut self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = self.recv().await {
            out.extend_from_slice(&chunk);
        }
        out
    }
}

impl futures_core::Stream for BodyStream {
    type Item = Vec<u8>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl std::fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyStream").finish_non_exhaustive()
    }
}

// ============================================================================
// Byte writer
// ============================================================================

struct WriterInner {
    // `None` once closed. Taking the sender is what ends the body.
    tx: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    content_type: Mutex<Option<String>>,
}

/// Producer handle for a byte/text streaming body.
///
/// Clones share one underlying channel; closing any clone closes the
/// stream for all of them.
#[derive(Clone)]
pub struct StreamWriter {
    inner: Arc<WriterInner>,
}

impl StreamWriter {
    pub(crate) fn new(tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            inner: Arc::new(WriterInner {
                tx: Mutex::new(Some(tx)),
                content_type: Mutex::new(None),
            }),
        }
    }

    /// Send one chunk.
    ///
    /// Awaits while the channel is full (backpressure). After the
    /// writer is closed, or once the consumer is gone, this is a
    /// silent no-op.
    pub async fn write(&self, chunk: impl Into<Vec<u8>>) {
        let bytes = chunk.into();
        let sender = self.inner.tx.lock().clone();
        let Some(sender) = sender else {
            return;
        };
        if sender.send(bytes).await.is_err() {
            // Consumer dropped the body; behave as closed from now on.
            self.close();
        }
    }

    /// End the body. Idempotent; later writes are dropped.
    pub fn close(&self) {
        self.inner.tx.lock().take();
    }

    /// Whether [`close`](Self::close) has been called (or the
    /// consumer was observed gone).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.tx.lock().is_none()
    }

    /// Override the response `content-type`.
    ///
    /// Only effective during producer setup: call it in the closure
    /// body, before the `async move` block. By the time the first
    /// chunk is written the response head has already been handed to
    /// the host.
    pub fn set_content_type(&self, content_type: impl Into<String>) {
        *self.inner.content_type.lock() = Some(content_type.into());
    }

    fn content_type(&self) -> Option<String> {
        self.inner.content_type.lock().clone()
    }
}

impl std::fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamWriter")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// JSON writer
// ============================================================================

/// Framing for [`JsonStreamWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStreamMode {
    /// One JSON value per line (`application/x-ndjson`).
    NewlineDelimited,
    /// One bracketed JSON array built value by value
    /// (`application/json`).
    Array,
}

impl JsonStreamMode {
    fn content_type(self) -> &'static str {
        match self {
            JsonStreamMode::NewlineDelimited => "application/x-ndjson",
            JsonStreamMode::Array => "application/json",
        }
    }
}

/// Producer handle for a JSON streaming body.
#[derive(Clone)]
pub struct JsonStreamWriter {
    writer: StreamWriter,
    mode: JsonStreamMode,
    // Set once the first value actually went out; drives `[`/`,`
    // framing and whether close emits `]`.
    opened: Arc<AtomicBool>,
}

impl JsonStreamWriter {
    fn new(tx: mpsc::Sender<Vec<u8>>, mode: JsonStreamMode) -> Self {
        Self {
            writer: StreamWriter::new(tx),
            mode,
            opened: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Serialize and send one value.
    ///
    /// Serialization happens before anything touches the channel, so
    /// a failing value surfaces here without corrupting the framing.
    /// On a closed stream this is a no-op, like the byte writer.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for values that fail to
    /// serialize.
    pub async fn send<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), serde_json::Error> {
        let json = serde_json::to_vec(value)?;
        if self.writer.is_closed() {
            return Ok(());
        }
        match self.mode {
            JsonStreamMode::NewlineDelimited => {
                let mut framed = json;
                framed.push(b'\n');
                self.writer.write(framed).await;
            }
            JsonStreamMode::Array => {
                let mut framed = Vec::with_capacity(json.len() + 1);
                if self.opened.swap(true, Ordering::SeqCst) {
                    framed.push(b',');
                } else {
                    framed.push(b'[');
                }
                framed.extend_from_slice(&json);
                self.writer.write(framed).await;
            }
        }
        Ok(())
    }

    /// Finish the body.
    ///
    /// In array mode this emits the closing `]`, but only if at least
    /// one value was sent; an array stream that never sent anything
    /// closes to an empty body. Idempotent.
    pub async fn close(&self) {
        if self.mode == JsonStreamMode::Array
            && self.opened.load(Ordering::SeqCst)
            && !self.writer.is_closed()
        {
            self.writer.write(&b"]"[..]).await;
        }
        self.writer.close();
    }

    /// Whether the stream has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.writer.is_closed()
    }
}

impl std::fmt::Debug for JsonStreamWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStreamWriter")
            .field("mode", &self.mode)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Response constructors
// ============================================================================

/// Build a streaming byte/text response.
///
/// The producer closure runs immediately (its synchronous prelude is
/// the only chance to call [`StreamWriter::set_content_type`]); the
/// future it returns is spawned and raced against the request's abort
/// signal. On abort the future is dropped and the stream closed.
///
/// Defaults to `text/plain; charset=utf-8` unless overridden.
///
/// Must be called within a tokio runtime; a producer error is logged,
/// not surfaced to the client, because the head is already out.
pub fn stream_response<F, Fut>(ctx: &RequestContext, producer: F) -> Response
where
    F: FnOnce(StreamWriter) -> Fut,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let writer = StreamWriter::new(tx);
    let fut = producer(writer.clone());

    let content_type = writer
        .content_type()
        .unwrap_or_else(|| String::from("text/plain; charset=utf-8"));

    let abort = ctx.abort_signal();
    tokio::spawn(async move {
        tokio::select! {
            result = fut => {
                if let Err(err) = result {
                    tracing::error!(target: "switchback::stream", error = %err, "stream producer failed");
                }
            }
            () = abort.aborted() => {}
        }
        writer.close();
    });

    Response::new(StatusCode::OK)
        .header("content-type", content_type)
        .body(ResponseBody::Stream(BodyStream::new(rx)))
}

/// Build a streaming JSON response in the given framing mode.
///
/// Same lifecycle as [`stream_response`]; the content type is fixed
/// by the mode. If the producer returns without closing, the close
/// (including the `]` in array mode) is performed on its behalf.
pub fn json_stream_response<F, Fut>(
    ctx: &RequestContext,
    mode: JsonStreamMode,
    producer: F,
) -> Response
where
    F: FnOnce(JsonStreamWriter) -> Fut,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let writer = JsonStreamWriter::new(tx, mode);
    let fut = producer(writer.clone());

    let abort = ctx.abort_signal();
    tokio::spawn(async move {
        tokio::select! {
            result = fut => {
                if let Err(err) = result {
                    tracing::error!(target: "switchback::stream", error = %err, "stream producer failed");
                }
            }
            () = abort.aborted() => {}
        }
        writer.close().await;
    });

    Response::new(StatusCode::OK)
        .header("content-type", mode.content_type())
        .body(ResponseBody::Stream(BodyStream::new(rx)))
}
