//! The [`Handler`] capability and its terminal implementations.
//!
//! A handler turns a [`Request`] into a [`Response`]. It is what every chain
//! bottoms out on, and it is also how a middleware sees "the rest of the
//! chain": the `next` argument of [`Middleware::process`](crate::Middleware::process)
//! is a `&dyn Handler`.
//!
//! ```text
//! |req| Ok(Response::text("hi"))    ← user writes this
//!        ↓ handler_fn(..)
//! FnHandler(closure)                ← newtype wrapper
//!        ↓ used as &dyn Handler
//! next.handle(req)                  ← one virtual call
//! ```

use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;

/// Turns a request into a response, or fails.
///
/// Implemented by [`Dispatcher`](crate::Dispatcher), by the per-position
/// cursor handed to middleware as `next`, by [`FnHandler`] and by the
/// end-of-stack sentinel [`Exhausted`].
pub trait Handler: Send + Sync {
    fn handle(&self, request: Request) -> Result<Response>;
}

impl<H: Handler + ?Sized> Handler for &H {
    fn handle(&self, request: Request) -> Result<Response> {
        (**self).handle(request)
    }
}

impl<H: Handler + ?Sized> Handler for std::sync::Arc<H> {
    fn handle(&self, request: Request) -> Result<Response> {
        (**self).handle(request)
    }
}

// ── Terminal handlers ─────────────────────────────────────────────────────────

/// Newtype wrapper that holds a closure and implements [`Handler`].
///
/// Obtain via [`handler_fn`].
pub struct FnHandler<F>(F);

/// Wraps a closure `Fn(Request) -> Result<Response>` as a terminal handler.
///
/// ```rust
/// use relay::{Handler, Request, Response, handler_fn};
///
/// let echo = handler_fn(|req: Request| Ok(Response::text(req.path().to_owned())));
/// let res = echo.handle(Request::get("/x")).unwrap();
/// assert_eq!(res.body().as_ref(), b"/x");
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(Request) -> Result<Response> + Send + Sync,
{
    FnHandler(f)
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(Request) -> Result<Response> + Send + Sync,
{
    fn handle(&self, request: Request) -> Result<Response> {
        (self.0)(request)
    }
}

/// The sentinel past the last stack position.
///
/// Only reached when every middleware delegated to `next` and none produced
/// a response. Always fails with [`Error::StackExhausted`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Exhausted;

impl Handler for Exhausted {
    fn handle(&self, _request: Request) -> Result<Response> {
        Err(Error::StackExhausted)
    }
}
