//! Tower service that intercepts HTML responses.

use std::fmt::Debug;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::{Request, Response};
use hyper::body::Body as HttpBody;
use tower::Service;

use crate::body::InterceptedBody;
use crate::future::PreloadFuture;
use crate::layer::PreloadShared;

/// Middleware service produced by [`Preload`](crate::Preload).
///
/// Requests pass through untouched. Qualifying HTML responses come back
/// with `Link: rel=preload` values appended and the body unchanged.
pub struct PreloadService<S> {
    upstream: S,
    shared: Arc<PreloadShared>,
}

impl<S> PreloadService<S> {
    pub(crate) fn new(upstream: S, shared: Arc<PreloadShared>) -> Self {
        PreloadService { upstream, shared }
    }
}

impl<S> Clone for PreloadService<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        PreloadService {
            upstream: self.upstream.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for PreloadService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: HttpBody + Unpin + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Debug + Send,
{
    type Response = Response<InterceptedBody<ResBody>>;
    type Error = S::Error;
    type Future = PreloadFuture<S::Future, ResBody, S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.upstream.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let upstream = self.upstream.call(request);
        PreloadFuture::new(upstream, Arc::clone(&self.shared))
    }
}
