//! Response body forms produced by the interception middleware.
//!
//! Whatever route a response takes through the middleware, the downstream
//! consumer sees a single body type. [`InterceptedBody`] either replays a
//! fully buffered body, streams the upstream body untouched, or flushes a
//! buffered prefix before handing the stream back to the upstream body.

use std::fmt::{self, Debug};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};
use pin_project::pin_project;

/// Body returned by the preload service in place of the upstream body.
#[pin_project(project = InterceptedBodyProj)]
pub enum InterceptedBody<B>
where
    B: HttpBody,
{
    /// The whole upstream body was buffered and is replayed from memory.
    Complete(Option<Bytes>),
    /// The upstream body streams through without buffering.
    Passthrough(#[pin] B),
    /// Buffering stopped midway; the buffered prefix is flushed first and
    /// the rest of the upstream body follows.
    Spilled(#[pin] SpilledBody<B>),
}

impl<B> InterceptedBody<B>
where
    B: HttpBody,
{
    /// Body replayed from a complete in-memory buffer.
    pub fn complete(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            InterceptedBody::Complete(None)
        } else {
            InterceptedBody::Complete(Some(bytes))
        }
    }

    /// Body streamed through untouched.
    pub fn passthrough(body: B) -> Self {
        InterceptedBody::Passthrough(body)
    }

    /// Body that flushes an already buffered prefix and then resumes the
    /// upstream stream where buffering left off.
    pub fn spilled(prefix: Bytes, rest: B) -> Self {
        let prefix = if prefix.is_empty() { None } else { Some(prefix) };
        InterceptedBody::Spilled(SpilledBody {
            prefix,
            remaining: Remaining::Stream(rest),
        })
    }

    /// Body that surfaces an upstream read error on the first poll.
    ///
    /// Bytes buffered before the error are dropped rather than replayed, so
    /// the consumer never sees a truncated document that looks intact.
    pub fn failed(error: B::Error) -> Self {
        InterceptedBody::Spilled(SpilledBody {
            prefix: None,
            remaining: Remaining::Error(Some(error)),
        })
    }
}

impl<B> HttpBody for InterceptedBody<B>
where
    B: HttpBody,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            InterceptedBodyProj::Complete(bytes) => {
                Poll::Ready(bytes.take().map(|bytes| Ok(Frame::data(bytes))))
            }
            InterceptedBodyProj::Passthrough(inner) => poll_data_frame(inner, cx),
            InterceptedBodyProj::Spilled(spilled) => spilled.poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            InterceptedBody::Complete(bytes) => bytes.is_none(),
            InterceptedBody::Passthrough(inner) => inner.is_end_stream(),
            InterceptedBody::Spilled(spilled) => spilled.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            InterceptedBody::Complete(bytes) => {
                let len = bytes.as_ref().map(|bytes| bytes.len() as u64);
                SizeHint::with_exact(len.unwrap_or(0))
            }
            InterceptedBody::Passthrough(inner) => inner.size_hint(),
            InterceptedBody::Spilled(spilled) => spilled.size_hint(),
        }
    }
}

impl<B> Debug for InterceptedBody<B>
where
    B: HttpBody,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterceptedBody::Complete(bytes) => f
                .debug_tuple("Complete")
                .field(&bytes.as_ref().map(Bytes::len))
                .finish(),
            InterceptedBody::Passthrough(_) => f.write_str("Passthrough"),
            InterceptedBody::Spilled(spilled) => f.debug_tuple("Spilled").field(spilled).finish(),
        }
    }
}

/// Buffered prefix plus whatever is left of the upstream body.
#[pin_project]
pub struct SpilledBody<B>
where
    B: HttpBody,
{
    prefix: Option<Bytes>,
    #[pin]
    remaining: Remaining<B>,
}

/// What follows the buffered prefix of a [`SpilledBody`].
#[pin_project(project = RemainingProj)]
pub enum Remaining<B>
where
    B: HttpBody,
{
    /// The upstream body, resumed where buffering stopped.
    Stream(#[pin] B),
    /// A read error, yielded once in place of further frames.
    Error(Option<B::Error>),
}

impl<B> HttpBody for SpilledBody<B>
where
    B: HttpBody,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();
        if let Some(prefix) = this.prefix.take() {
            return Poll::Ready(Some(Ok(Frame::data(prefix))));
        }
        match this.remaining.project() {
            RemainingProj::Stream(inner) => poll_data_frame(inner, cx),
            RemainingProj::Error(error) => Poll::Ready(error.take().map(Err)),
        }
    }

    fn is_end_stream(&self) -> bool {
        if self.prefix.is_some() {
            return false;
        }
        match &self.remaining {
            Remaining::Stream(inner) => inner.is_end_stream(),
            Remaining::Error(error) => error.is_none(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        let prefix = self.prefix.as_ref().map(|prefix| prefix.len() as u64);
        let prefix = prefix.unwrap_or(0);
        match &self.remaining {
            Remaining::Stream(inner) => {
                let mut hint = inner.size_hint();
                hint.set_lower(hint.lower() + prefix);
                if let Some(upper) = hint.upper() {
                    hint.set_upper(upper + prefix);
                }
                hint
            }
            Remaining::Error(_) => SizeHint::with_exact(prefix),
        }
    }
}

impl<B> Debug for SpilledBody<B>
where
    B: HttpBody,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpilledBody")
            .field("prefix", &self.prefix.as_ref().map(Bytes::len))
            .field("remaining", &self.remaining)
            .finish()
    }
}

impl<B> Debug for Remaining<B>
where
    B: HttpBody,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remaining::Stream(_) => f.write_str("Stream"),
            Remaining::Error(error) => f.debug_tuple("Error").field(&error.is_some()).finish(),
        }
    }
}

/// Polls one frame from an inner body and flattens its data chunk into
/// contiguous [`Bytes`].
fn poll_data_frame<B>(
    body: Pin<&mut B>,
    cx: &mut Context<'_>,
) -> Poll<Option<Result<Frame<Bytes>, B::Error>>>
where
    B: HttpBody,
{
    match body.poll_frame(cx) {
        Poll::Ready(Some(Ok(frame))) => {
            let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
            Poll::Ready(Some(Ok(frame)))
        }
        Poll::Ready(Some(Err(error))) => Poll::Ready(Some(Err(error))),
        Poll::Ready(None) => Poll::Ready(None),
        Poll::Pending => Poll::Pending,
    }
}
