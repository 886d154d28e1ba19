//! Controller future driving the interception pipeline.
//!
//! [`PreloadFuture`] wraps the upstream response future and decides, from
//! the response headers alone, whether the body streams through untouched,
//! replays headers from the fingerprint cache, or is buffered, scanned and
//! released with freshly composed `Link` headers.

use std::fmt::{self, Debug};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{BufMut, Bytes, BytesMut};
use futures::future::BoxFuture;
use futures::ready;
use http::{Response, header::{self, HeaderMap, HeaderValue}, response::Parts};
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use pin_project::pin_project;
use tracing::{debug, warn};

use headstart_core::compose;

use crate::body::InterceptedBody;
use crate::layer::PreloadShared;
use crate::metrics::record_session;
use crate::session::{Session, Stage};

const POLL_AFTER_READY_ERROR: &str = "PreloadFuture can't be polled after finishing";

/// Returns true when a media type names HTML exactly.
///
/// Matching is case-insensitive and only accepts `text/html` followed by
/// the end of the value, a parameter separator or whitespace, so types
/// such as `text/html5` stay untouched.
fn is_html_media_type(value: &str) -> bool {
    const HTML: &str = "text/html";
    let media_type = match value.get(..HTML.len()) {
        Some(media_type) => media_type,
        None => return false,
    };
    if !media_type.eq_ignore_ascii_case(HTML) {
        return false;
    }
    match value.as_bytes().get(HTML.len()).copied() {
        None => true,
        Some(b';') => true,
        Some(byte) => byte.is_ascii_whitespace(),
    }
}

/// True when the response advertises an HTML media type.
fn is_html_response<B>(response: &Response<B>) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(is_html_media_type)
        .unwrap_or(false)
}

/// Extracts the validator token the response body is keyed under.
///
/// Responses without a readable `ETag` are scanned on every occurrence and
/// never enter the cache.
fn fingerprint<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get(header::ETAG)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// Appends composed preload values to the `Link` header, leaving values
/// already present in place. Returns the number of values appended.
fn append_preload_headers(headers: &mut HeaderMap, values: &[String]) -> usize {
    let mut appended = 0;
    for value in values {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.append(header::LINK, value);
                appended += 1;
            }
            Err(_) => warn!(value = %value, "dropped preload value that is not a valid header"),
        }
    }
    appended
}

/// Result of draining an upstream body into memory.
enum CaptureOutcome<B>
where
    B: HttpBody,
{
    /// The whole body fit in the buffer.
    Complete(Bytes),
    /// The capture limit was exceeded before the body ended.
    Overflow { prefix: Bytes, rest: B },
    /// The upstream body failed mid-read.
    Failed(B::Error),
}

type CaptureFuture<B> = BoxFuture<'static, CaptureOutcome<B>>;

/// Buffers body frames until the stream ends, fails or outgrows `limit`.
async fn capture_body<B>(mut body: B, limit: Option<usize>) -> CaptureOutcome<B>
where
    B: HttpBody + Unpin,
{
    let mut buffer = BytesMut::new();
    loop {
        match body.frame().await {
            Some(Ok(frame)) => {
                if let Ok(data) = frame.into_data() {
                    buffer.put(data);
                    if let Some(limit) = limit {
                        if buffer.len() > limit {
                            return CaptureOutcome::Overflow {
                                prefix: buffer.freeze(),
                                rest: body,
                            };
                        }
                    }
                }
            }
            Some(Err(error)) => return CaptureOutcome::Failed(error),
            None => return CaptureOutcome::Complete(buffer.freeze()),
        }
    }
}

/// Scans a fully buffered body and assembles the outgoing response, or
/// releases the response unscanned when the capture was cut short.
fn finish_capture<B>(
    session: &mut Session,
    shared: &PreloadShared,
    parts: Parts,
    outcome: CaptureOutcome<B>,
) -> Response<InterceptedBody<B>>
where
    B: HttpBody,
    B::Error: Debug,
{
    match outcome {
        CaptureOutcome::Complete(bytes) => {
            let references = headstart_html::scan(&bytes, &shared.config);
            let values = compose(&references, &shared.config);
            if let Some(fingerprint) = session.fingerprint() {
                shared.cache.put(fingerprint, references);
            }
            let mut response = Response::from_parts(parts, InterceptedBody::complete(bytes));
            let appended = append_preload_headers(response.headers_mut(), &values);
            session.transition(Stage::Injected);
            record_session(session.stage(), appended);
            response
        }
        CaptureOutcome::Overflow { prefix, rest } => {
            debug!(
                buffered = prefix.len(),
                "capture limit exceeded; streaming the response unscanned"
            );
            record_session(session.stage(), 0);
            Response::from_parts(parts, InterceptedBody::spilled(prefix, rest))
        }
        CaptureOutcome::Failed(error) => {
            debug!(error = ?error, "upstream body failed during capture");
            record_session(session.stage(), 0);
            Response::from_parts(parts, InterceptedBody::failed(error))
        }
    }
}

/// Controller state for one intercepted response.
#[pin_project(project = StateProj)]
enum State<F, B>
where
    B: HttpBody,
{
    /// Waiting for the upstream service to produce response headers.
    Upstream {
        #[pin]
        upstream: F,
    },
    /// Draining the response body into memory before releasing it.
    Capture {
        capture: CaptureFuture<B>,
        parts: Option<Parts>,
    },
}

impl<F, B> Debug for State<F, B>
where
    B: HttpBody,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Upstream { .. } => f.write_str("State::Upstream"),
            State::Capture { .. } => f.write_str("State::Capture"),
        }
    }
}

/// Response future returned by [`PreloadService`](crate::PreloadService).
#[pin_project]
pub struct PreloadFuture<F, B, E>
where
    F: Future<Output = Result<Response<B>, E>>,
    B: HttpBody,
{
    #[pin]
    state: State<F, B>,
    shared: Arc<PreloadShared>,
    session: Session,
}

impl<F, B, E> PreloadFuture<F, B, E>
where
    F: Future<Output = Result<Response<B>, E>>,
    B: HttpBody,
{
    pub(crate) fn new(upstream: F, shared: Arc<PreloadShared>) -> Self {
        PreloadFuture {
            state: State::Upstream { upstream },
            shared,
            session: Session::new(),
        }
    }
}

impl<F, B, E> Future for PreloadFuture<F, B, E>
where
    F: Future<Output = Result<Response<B>, E>>,
    B: HttpBody + Unpin + Send + 'static,
    B::Data: Send,
    B::Error: Debug + Send,
{
    type Output = Result<Response<InterceptedBody<B>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        loop {
            let state = match this.state.as_mut().project() {
                StateProj::Upstream { upstream } => {
                    let response = match ready!(upstream.poll(cx)) {
                        Ok(response) => response,
                        Err(error) => return Poll::Ready(Err(error)),
                    };
                    if !this.shared.config.any_enabled() || !is_html_response(&response) {
                        this.session.transition(Stage::Passthrough);
                        record_session(this.session.stage(), 0);
                        return Poll::Ready(Ok(response.map(InterceptedBody::passthrough)));
                    }
                    this.session.set_fingerprint(fingerprint(&response));
                    let cached = this
                        .session
                        .fingerprint()
                        .and_then(|fingerprint| this.shared.cache.get(fingerprint));
                    if let Some(references) = cached {
                        this.session.transition(Stage::Replay);
                        let values = compose(&references, &this.shared.config);
                        let mut response = response.map(InterceptedBody::passthrough);
                        let appended = append_preload_headers(response.headers_mut(), &values);
                        record_session(this.session.stage(), appended);
                        return Poll::Ready(Ok(response));
                    }
                    this.session.transition(Stage::Capturing);
                    let (parts, body) = response.into_parts();
                    let limit = this.shared.config.max_capture_bytes;
                    State::Capture {
                        capture: Box::pin(capture_body(body, limit)),
                        parts: Some(parts),
                    }
                }
                StateProj::Capture { capture, parts } => {
                    let outcome = ready!(capture.as_mut().poll(cx));
                    let parts = parts.take().expect(POLL_AFTER_READY_ERROR);
                    let response = finish_capture(this.session, this.shared, parts, outcome);
                    return Poll::Ready(Ok(response));
                }
            };
            debug!("{:?}", &state);
            this.state.set(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_media_type_matching() {
        assert!(is_html_media_type("text/html"));
        assert!(is_html_media_type("TEXT/HTML"));
        assert!(is_html_media_type("Text/Html; charset=utf-8"));
        assert!(is_html_media_type("text/html;charset=utf-8"));
        assert!(is_html_media_type("text/html \t"));
        assert!(!is_html_media_type("text/html5"));
        assert!(!is_html_media_type("text/htm"));
        assert!(!is_html_media_type("application/xhtml+xml"));
        assert!(!is_html_media_type("text/plain"));
    }

    #[test]
    fn invalid_composed_value_is_skipped() {
        let mut headers = HeaderMap::new();
        let values = vec![
            "</a.jpg>; rel=preload; as=image".to_owned(),
            "</b.js>; rel=preload; as=script; x=\u{7f}".to_owned(),
        ];
        let appended = append_preload_headers(&mut headers, &values);
        assert_eq!(appended, 1);
        assert_eq!(headers.get_all(header::LINK).iter().count(), 1);
    }
}
