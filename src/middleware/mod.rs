//! Middleware and stack descriptors.
//!
//! A middleware sits between the caller and the rest of the chain. It can
//! inspect or replace the request, answer on its own without calling `next`
//! (short-circuit), or call `next` and post-process what comes back.
//!
//! The dispatcher stores its stack as [`Descriptor`]s. A descriptor is one of
//! three shapes, tried in this order when the position runs:
//!
//! 1. [`Descriptor::Middleware`] — an object implementing [`Middleware`].
//! 2. [`Descriptor::Function`] — a closure `(Request, &dyn Handler) -> impl IntoOutcome`.
//! 3. [`Descriptor::Opaque`] — any value a resolver knows how to turn into
//!    one of the above. Reaching the dispatch point unresolved is an error.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::request::Request;
use crate::response::{IntoOutcome, Outcome, Response};

// ── Middleware trait ──────────────────────────────────────────────────────────

/// A request-processing step that may delegate to the rest of the chain.
///
/// ```rust
/// use relay::{Handler, Middleware, Request, Response, Result, StatusCode};
///
/// struct RequireToken;
///
/// impl Middleware for RequireToken {
///     fn process(&self, req: Request, next: &dyn Handler) -> Result<Response> {
///         match req.header("authorization") {
///             Some(_) => next.handle(req),
///             None => Ok(Response::status(StatusCode::UNAUTHORIZED)),
///         }
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    fn process(&self, request: Request, next: &dyn Handler) -> Result<Response>;

    /// Name used in diagnostics. Defaults to the implementing type's path.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

// ── Function middleware ───────────────────────────────────────────────────────

/// Internal dispatch interface for function descriptors.
trait ErasedFn: Send + Sync {
    fn call(&self, request: Request, next: &dyn Handler) -> Result<Outcome>;
    fn name(&self) -> &'static str;
}

struct FnMiddleware<F>(F);

impl<F, R> ErasedFn for FnMiddleware<F>
where
    F: Fn(Request, &dyn Handler) -> R + Send + Sync,
    R: IntoOutcome,
{
    fn call(&self, request: Request, next: &dyn Handler) -> Result<Outcome> {
        (self.0)(request, next).into_outcome()
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<F>()
    }
}

/// A type-erased function descriptor. Build one with [`Descriptor::function`].
#[derive(Clone)]
pub struct Function(Arc<dyn ErasedFn>);

impl Function {
    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

// ── Opaque values ─────────────────────────────────────────────────────────────

/// A stack entry only a resolver understands: a service name, a config key,
/// an enum tag. Records its type name and `Debug` rendering for diagnostics.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    rendering: String,
    value: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + fmt::Debug + Send + Sync,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            rendering: format!("{value:?}"),
            value: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str { self.type_name }
    pub fn rendering(&self) -> &str { &self.rendering }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.value).downcast_ref::<T>()
    }
}

// ── Descriptor ────────────────────────────────────────────────────────────────

/// One slot of a dispatcher's stack, before resolution.
#[derive(Clone)]
pub enum Descriptor {
    Middleware(Arc<dyn Middleware>),
    Function(Function),
    Opaque(Opaque),
}

impl Descriptor {
    pub fn middleware(middleware: impl Middleware + 'static) -> Self {
        Self::Middleware(Arc::new(middleware))
    }

    /// Wraps a closure `(Request, &dyn Handler) -> R`.
    ///
    /// `R` is validated when the position runs: anything but a response
    /// fails the dispatch with [`Error::UnexpectedResult`].
    pub fn function<F, R>(f: F) -> Self
    where
        F: Fn(Request, &dyn Handler) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        Self::Function(Function(Arc::new(FnMiddleware(f))))
    }

    pub fn opaque<T>(value: T) -> Self
    where
        T: Any + fmt::Debug + Send + Sync,
    {
        Self::Opaque(Opaque::new(value))
    }

    /// The opaque payload, if this descriptor is one and holds a `T`.
    /// Convenience for resolvers.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(opaque) => opaque.downcast_ref(),
            _ => None,
        }
    }

    /// Name of whatever sits in this slot, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Middleware(m) => m.name(),
            Self::Function(f) => f.name(),
            Self::Opaque(o) => o.type_name(),
        }
    }

    /// The single dispatch point over descriptor shapes.
    pub(crate) fn call(&self, request: Request, next: &dyn Handler) -> Result<Outcome> {
        match self {
            Self::Middleware(m) => m.process(request, next).map(Outcome::Response),
            Self::Function(f) => f.0.call(request, next),
            Self::Opaque(o) => Err(Error::UnsupportedMiddlewareType {
                type_name: o.type_name().to_owned(),
                value: o.rendering().to_owned(),
            }),
        }
    }
}

impl<M: Middleware + 'static> From<Arc<M>> for Descriptor {
    fn from(middleware: Arc<M>) -> Self {
        Self::Middleware(middleware)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Middleware(m) => f.debug_tuple("Middleware").field(&m.name()).finish(),
            Self::Function(func) => f.debug_tuple("Function").field(&func.name()).finish(),
            Self::Opaque(o) => write!(f, "Opaque({}: {})", o.type_name(), o.rendering()),
        }
    }
}
