//! The middleware dispatcher.
//!
//! # How a request travels through the stack
//!
//! Nothing is resolved up front. [`Dispatcher::handle`] creates a cursor at
//! position 0 and invokes it. Invoking the cursor at position `i`:
//!
//! ```text
//! stack[i]  ──resolver──▶  descriptor          (once per invocation)
//!                              │
//!          Middleware ◀────────┼────────▶ Function
//!   m.process(req, Next(i+1))  │   f(req, Next(i+1)).into_outcome()
//!                              ▼
//!                   Opaque → UnsupportedMiddlewareType
//!
//! outcome is a Response?  yes → return it
//!                         no  → UnexpectedResult
//! ```
//!
//! Past the last position the cursor forwards to its tail: the
//! [`Exhausted`] sentinel for a top-level dispatch, or the outer chain's
//! `next` when this dispatcher runs nested inside another one
//! (see [`Middleware::process`] below). The stack itself is never touched,
//! so one dispatcher can serve any number of concurrent requests.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::handler::{Exhausted, Handler};
use crate::middleware::{Descriptor, Middleware};
use crate::request::Request;
use crate::response::{Outcome, Response};

/// Maps a raw stack entry to the descriptor that actually runs.
pub type Resolver = Arc<dyn Fn(&Descriptor) -> Descriptor + Send + Sync>;

/// An ordered middleware stack plus an optional resolver.
///
/// ```rust
/// use relay::{Descriptor, Dispatcher, Handler, Request, Response};
///
/// let app = Dispatcher::new(vec![
///     Descriptor::function(|req: Request, next: &dyn Handler| {
///         next.handle(req.with_attribute("user", "alice"))
///     }),
///     Descriptor::function(|req: Request, _next: &dyn Handler| {
///         Response::text(req.attribute("user").unwrap_or("anonymous").to_owned())
///     }),
/// ])?;
///
/// let res = app.handle(Request::get("/"))?;
/// assert_eq!(res.body().as_ref(), b"alice");
/// # Ok::<(), relay::Error>(())
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    stack: Arc<[Descriptor]>,
    resolver: Option<Resolver>,
}

impl Dispatcher {
    /// A dispatcher running `stack` as-is.
    ///
    /// Fails with [`Error::InvalidConfiguration`] if `stack` is empty.
    pub fn new(stack: Vec<Descriptor>) -> Result<Self> {
        Self::from_parts(stack, None)
    }

    /// A dispatcher passing every stack entry through `resolver` each time
    /// its position runs.
    ///
    /// ```rust
    /// use relay::{Descriptor, Dispatcher, Handler, Request, Response};
    ///
    /// let app = Dispatcher::with_resolver(
    ///     vec![Descriptor::opaque("hello")],
    ///     |d: &Descriptor| match d.downcast_ref::<&str>() {
    ///         Some(&"hello") => Descriptor::function(|_req: Request, _next: &dyn Handler| {
    ///             Response::text("hello")
    ///         }),
    ///         _ => d.clone(),
    ///     },
    /// )?;
    ///
    /// assert_eq!(app.handle(Request::get("/"))?.body().as_ref(), b"hello");
    /// # Ok::<(), relay::Error>(())
    /// ```
    pub fn with_resolver<F>(stack: Vec<Descriptor>, resolver: F) -> Result<Self>
    where
        F: Fn(&Descriptor) -> Descriptor + Send + Sync + 'static,
    {
        Self::from_parts(stack, Some(Arc::new(resolver)))
    }

    /// Builder for assembling a stack entry by entry.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder { stack: Vec::new(), resolver: None }
    }

    fn from_parts(stack: Vec<Descriptor>, resolver: Option<Resolver>) -> Result<Self> {
        if stack.is_empty() {
            return Err(Error::InvalidConfiguration(
                "an empty middleware stack was given".to_owned(),
            ));
        }
        Ok(Self { stack: stack.into(), resolver })
    }

    /// Number of configured stack entries.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Always `false`: construction rejects empty stacks.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    fn cursor<'a>(&'a self, index: usize, tail: &'a dyn Handler) -> Next<'a> {
        Next { dispatcher: self, index, tail }
    }

    /// Runs the entry at `index` and validates what it returns.
    fn invoke(&self, index: usize, request: Request, tail: &dyn Handler) -> Result<Response> {
        let raw = &self.stack[index];
        let resolved;
        let middleware = match &self.resolver {
            Some(resolve) => {
                resolved = resolve(raw);
                &resolved
            }
            None => raw,
        };

        trace!(index, middleware = middleware.name(), "invoking middleware");

        let next = self.cursor(index + 1, tail);
        let outcome = middleware.call(request, &next).inspect_err(|e| {
            if e.is_contract_violation() {
                debug!(index, error = %e, "dispatch failed");
            }
        })?;

        match outcome {
            Outcome::Response(response) => Ok(response),
            Outcome::Unexpected { rendering, .. } => {
                let err = Error::UnexpectedResult {
                    given: rendering,
                    middleware: middleware.name().to_owned(),
                };
                debug!(index, error = %err, "dispatch failed");
                Err(err)
            }
        }
    }
}

impl Handler for Dispatcher {
    fn handle(&self, request: Request) -> Result<Response> {
        self.cursor(0, &Exhausted).handle(request)
    }
}

/// Nesting: this dispatcher's whole stack becomes one step of the outer chain.
///
/// If every inner middleware delegates, control continues with the outer
/// `next` instead of failing with [`Error::StackExhausted`].
impl Middleware for Dispatcher {
    fn process(&self, request: Request, next: &dyn Handler) -> Result<Response> {
        self.cursor(0, next).handle(request)
    }
}

impl From<Dispatcher> for Descriptor {
    fn from(dispatcher: Dispatcher) -> Self {
        Descriptor::middleware(dispatcher)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("stack", &self.stack)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

// ── Cursor ────────────────────────────────────────────────────────────────────

/// "The rest of the chain" from one stack position onwards.
///
/// Handed to each middleware as `next`. Resolves its position only when
/// invoked, so a broken entry fails exactly when the chain reaches it.
pub struct Next<'a> {
    dispatcher: &'a Dispatcher,
    index: usize,
    tail: &'a dyn Handler,
}

impl Next<'_> {
    /// Stack position this cursor will run when invoked.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Handler for Next<'_> {
    fn handle(&self, request: Request) -> Result<Response> {
        if self.index < self.dispatcher.len() {
            self.dispatcher.invoke(self.index, request, self.tail)
        } else {
            self.tail.handle(request)
        }
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Fluent builder for [`Dispatcher`]. Obtain via [`Dispatcher::builder()`].
///
/// ```rust
/// use relay::{Dispatcher, Handler, Request, Response};
///
/// let app = Dispatcher::builder()
///     .push_fn(|req: Request, next: &dyn Handler| next.handle(req))
///     .push_fn(|_req: Request, _next: &dyn Handler| Response::text("done"))
///     .build()?;
///
/// assert_eq!(app.len(), 2);
/// # Ok::<(), relay::Error>(())
/// ```
pub struct DispatcherBuilder {
    stack: Vec<Descriptor>,
    resolver: Option<Resolver>,
}

impl DispatcherBuilder {
    /// Appends any descriptor (or anything convertible, such as a nested
    /// [`Dispatcher`]).
    pub fn push(mut self, descriptor: impl Into<Descriptor>) -> Self {
        self.stack.push(descriptor.into());
        self
    }

    pub fn push_middleware(self, middleware: impl Middleware + 'static) -> Self {
        self.push(Descriptor::middleware(middleware))
    }

    pub fn push_fn<F, R>(self, f: F) -> Self
    where
        F: Fn(Request, &dyn Handler) -> R + Send + Sync + 'static,
        R: crate::response::IntoOutcome,
    {
        self.push(Descriptor::function(f))
    }

    pub fn push_opaque<T>(self, value: T) -> Self
    where
        T: std::any::Any + fmt::Debug + Send + Sync,
    {
        self.push(Descriptor::opaque(value))
    }

    pub fn resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Descriptor) -> Descriptor + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Fails with [`Error::InvalidConfiguration`] if nothing was pushed.
    pub fn build(self) -> Result<Dispatcher> {
        Dispatcher::from_parts(self.stack, self.resolver)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn respond(body: &'static str) -> Descriptor {
        Descriptor::function(move |_req: Request, _next: &dyn Handler| Response::text(body))
    }

    fn delegate() -> Descriptor {
        Descriptor::function(|req: Request, next: &dyn Handler| next.handle(req))
    }

    #[test]
    fn empty_stack_is_rejected_with_or_without_resolver() {
        assert!(matches!(
            Dispatcher::new(Vec::new()),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Dispatcher::with_resolver(Vec::new(), Descriptor::clone),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Dispatcher::builder().build(),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn construction_does_not_resolve() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let app = Dispatcher::with_resolver(vec![respond("x")], move |d: &Descriptor| {
            seen.fetch_add(1, Ordering::SeqCst);
            d.clone()
        })
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        app.handle(Request::get("/")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn broken_entries_fail_only_when_reached() {
        let app = Dispatcher::new(vec![respond("early"), Descriptor::opaque(42_u32)]).unwrap();
        let res = app.handle(Request::get("/")).unwrap();
        assert_eq!(res.body().as_ref(), b"early");

        let app = Dispatcher::new(vec![delegate(), Descriptor::opaque(42_u32)]).unwrap();
        match app.handle(Request::get("/")) {
            Err(Error::UnsupportedMiddlewareType { type_name, value }) => {
                assert_eq!(type_name, "u32");
                assert_eq!(value, "42");
            }
            other => panic!("expected UnsupportedMiddlewareType, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_result_names_the_function() {
        fn forgetful(_req: Request, _next: &dyn Handler) -> Option<Response> {
            None
        }

        let app = Dispatcher::new(vec![Descriptor::function(forgetful)]).unwrap();
        match app.handle(Request::get("/")) {
            Err(Error::UnexpectedResult { given, middleware }) => {
                assert_eq!(given, "None");
                assert!(middleware.ends_with("forgetful"), "got {middleware}");
            }
            other => panic!("expected UnexpectedResult, got {other:?}"),
        }
    }

    #[test]
    fn cursor_reports_its_position() {
        let app = Dispatcher::new(vec![respond("x")]).unwrap();
        let next = app.cursor(1, &Exhausted);
        assert_eq!(next.index(), 1);
        assert!(matches!(next.handle(Request::get("/")), Err(Error::StackExhausted)));
    }

    #[test]
    fn nested_exhaustion_falls_through_to_the_outer_chain() {
        let inner = Dispatcher::new(vec![delegate(), delegate()]).unwrap();
        let outer = Dispatcher::new(vec![inner.into(), respond("outer")]).unwrap();

        let res = outer.handle(Request::get("/")).unwrap();
        assert_eq!(res.body().as_ref(), b"outer");
    }

    #[test]
    fn dispatcher_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dispatcher>();
    }
}
