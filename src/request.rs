//! Incoming request type.
//!
//! relay treats the request as an opaque, immutable value. Middleware never
//! edits one in place: every `with_*` method consumes the request and hands
//! back a new one, which is what gets passed to `next`.

use std::collections::HashMap;

use bytes::Bytes;
use http::Method;

/// An incoming request, as produced by the boundary layer.
///
/// Cloning is cheap: the body is reference-counted [`Bytes`].
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) attributes: HashMap<String, String>,
}

impl Request {
    /// A request with no headers, no query string and an empty body.
    ///
    /// ```rust
    /// use relay::{Method, Request};
    ///
    /// let req = Request::new(Method::GET, "/users/42");
    /// assert_eq!(req.path(), "/users/42");
    /// ```
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: Vec::new(),
            body: Bytes::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self { Self::new(Method::GET, path) }
    pub fn post(path: impl Into<String>) -> Self { Self::new(Method::POST, path) }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Case-insensitive header lookup. Returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// A value attached by an upstream middleware via [`with_attribute`](Self::with_attribute).
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Appends a header. Existing headers with the same name are kept.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Attaches a value for downstream middleware, e.g. the authenticated
    /// user id. Overwrites any previous value under `key`.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
