//! # relay
//!
//! A middleware dispatcher. Give it an ordered stack of middleware and a
//! request; it threads the request through each component in turn and hands
//! back whatever response the chain produces.
//!
//! ## The contract
//!
//! Each middleware gets the request and `next`, a [`Handler`] for the rest of
//! the stack. It may
//!
//! - answer on its own without calling `next` (short-circuit),
//! - call `next` with the same or a new [`Request`] and return what comes back,
//! - post-process that response on the way out.
//!
//! Middleware run in stack order on the way in and in reverse order on the
//! way out. If every middleware delegates and nothing answers, the dispatch
//! fails with [`Error::StackExhausted`].
//!
//! What relay does not do: routing, middleware discovery, listening on a
//! socket. A [`Dispatcher`] is itself a [`Middleware`], so stacks nest, and
//! [`DispatchService`] plugs one into hyper.
//!
//! ## Quick start
//!
//! ```rust
//! use relay::{Dispatcher, Handler, Middleware, Request, Response, Result, StatusCode};
//!
//! struct RequireToken;
//!
//! impl Middleware for RequireToken {
//!     fn process(&self, req: Request, next: &dyn Handler) -> Result<Response> {
//!         if req.header("authorization").is_none() {
//!             return Ok(Response::status(StatusCode::UNAUTHORIZED));
//!         }
//!         next.handle(req)
//!     }
//! }
//!
//! let app = Dispatcher::builder()
//!     .push_middleware(RequireToken)
//!     .push_fn(|req: Request, _next: &dyn Handler| Response::text(req.path().to_owned()))
//!     .build()?;
//!
//! let denied = app.handle(Request::get("/x"))?;
//! assert_eq!(denied.status_code(), StatusCode::UNAUTHORIZED);
//!
//! let echoed = app.handle(Request::get("/x").with_header("authorization", "Bearer t"))?;
//! assert_eq!(echoed.body().as_ref(), b"/x");
//! # Ok::<(), relay::Error>(())
//! ```

mod dispatcher;
mod error;
mod handler;
mod request;
mod response;
mod service;

pub mod middleware;

pub use dispatcher::{Dispatcher, DispatcherBuilder, Next, Resolver};
pub use error::{BoxError, Error, Result};
pub use handler::{Exhausted, FnHandler, Handler, handler_fn};
pub use http::{Method, StatusCode};
pub use middleware::{Descriptor, Middleware};
pub use request::Request;
pub use response::{IntoOutcome, Outcome, Response, ResponseBuilder};
pub use service::DispatchService;
