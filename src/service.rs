//! hyper boundary.
//!
//! Converts between `http` types and relay's [`Request`] / [`Response`], and
//! exposes a [`Dispatcher`] as a hyper [`Service`]. Binding a listener and
//! accepting connections is left to the caller:
//!
//! ```rust,ignore
//! let svc = DispatchService::new(app);
//! hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
//!     .serve_connection(io, svc.clone())
//!     .await?;
//! ```
//!
//! Dispatch errors never reach hyper. The service error type is
//! [`Infallible`]; failures become `400` (unreadable body) or `500`
//! (anything the stack raised) and are logged.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::Service;
use tracing::{error, warn};

use crate::dispatcher::Dispatcher;
use crate::error::{BoxError, Error, Result};
use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;

/// A heap-allocated, type-erased future, `Send` so hyper can move it across
/// worker threads.
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

// ── Conversions ───────────────────────────────────────────────────────────────

impl Request {
    /// Collects the full body of an `http` request into a relay [`Request`].
    ///
    /// Fails with [`Error::Body`] if the body stream errors.
    pub async fn from_http<B>(req: http::Request<B>) -> Result<Self>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| Error::Body(e.into()))?
            .to_bytes();
        Ok(Self::from_parts(parts, body))
    }

    /// Builds a request from already-buffered parts.
    ///
    /// Header values that are not visible ASCII are dropped.
    pub fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let headers = parts.headers.iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();

        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            headers,
            body,
            attributes: Default::default(),
        }
    }
}

impl Response {
    /// Converts into an `http` response hyper can write.
    ///
    /// A header that `http` rejects (bad name or value) turns the whole
    /// response into an empty `500`.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.body(Full::new(self.body)).unwrap_or_else(|e| {
            error!(error = %e, "invalid response header");
            empty(StatusCode::INTERNAL_SERVER_ERROR)
        })
    }
}

fn empty(status: StatusCode) -> http::Response<Full<Bytes>> {
    let mut res = http::Response::new(Full::new(Bytes::new()));
    *res.status_mut() = status;
    res
}

// ── Service ───────────────────────────────────────────────────────────────────

/// A [`Dispatcher`] shared across connections as a hyper [`Service`].
///
/// Cloning is one atomic reference-count increment.
#[derive(Clone, Debug)]
pub struct DispatchService {
    dispatcher: Arc<Dispatcher>,
}

impl DispatchService {
    pub fn new(dispatcher: impl Into<Arc<Dispatcher>>) -> Self {
        Self { dispatcher: dispatcher.into() }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl<B> Service<http::Request<B>> for DispatchService
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = BoxFuture<std::result::Result<Self::Response, Infallible>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let dispatcher = Arc::clone(&self.dispatcher);
        Box::pin(async move { Ok(dispatch(&dispatcher, req).await) })
    }
}

/// One request in, one response out. Never fails.
async fn dispatch<B>(dispatcher: &Dispatcher, req: http::Request<B>) -> http::Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let request = match Request::from_http(req).await {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "rejecting request");
            return empty(StatusCode::BAD_REQUEST);
        }
    };

    let method = request.method().clone();
    let path = request.path().to_owned();

    // Dispatch is synchronous; it runs to completion on the polling thread.
    match dispatcher.handle(request) {
        Ok(response) => response.into_http(),
        Err(e) => {
            error!(%method, %path, error = %e, "dispatch failed");
            empty(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use hyper::body::Frame;

    use super::*;
    use crate::middleware::Descriptor;

    struct Broken;

    impl Body for Broken {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<std::result::Result<Frame<Bytes>, Self::Error>>> {
            Poll::Ready(Some(Err(std::io::Error::other("connection reset"))))
        }
    }

    fn echo() -> Dispatcher {
        Dispatcher::new(vec![Descriptor::function(|req: Request, _next: &dyn Handler| {
            let body = format!(
                "{} {} {} {}",
                req.method(),
                req.path(),
                req.query().unwrap_or("-"),
                req.header("x-tag").unwrap_or("-"),
            );
            Response::builder().header("x-echo", "1").text(body)
        })])
        .unwrap()
    }

    #[tokio::test]
    async fn converts_both_ways() {
        let req = http::Request::builder()
            .method("PUT")
            .uri("/items/3?full=1")
            .header("X-Tag", "blue")
            .body(Full::new(Bytes::from_static(b"payload")))
            .unwrap();

        let request = Request::from_http(req).await.unwrap();
        assert_eq!(request.body().as_ref(), b"payload");
        assert_eq!(request.header("x-tag"), Some("blue"));

        let res = echo().handle(request).unwrap().into_http();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["x-echo"], "1");
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"PUT /items/3 full=1 blue");
    }

    #[tokio::test]
    async fn unreadable_body_is_a_bad_request() {
        let svc = DispatchService::new(echo());
        let res = svc.call(http::Request::new(Broken)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dispatch_errors_become_500() {
        let exhausted = Dispatcher::new(vec![Descriptor::function(
            |req: Request, next: &dyn Handler| next.handle(req),
        )])
        .unwrap();

        let svc = DispatchService::new(exhausted);
        let res = svc.call(http::Request::new(Full::new(Bytes::new()))).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_headers_become_500() {
        let res = Response::text("x").with_header("bad header", "v").into_http();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
