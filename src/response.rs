//! Outgoing response type and the [`IntoOutcome`] conversion trait.
//!
//! A function middleware may return anything that implements [`IntoOutcome`].
//! The dispatcher converts the return value into an [`Outcome`] and accepts it
//! only if it is an actual [`Response`]. Everything else is reported as
//! [`Error::UnexpectedResult`](crate::Error::UnexpectedResult).

use bytes::Bytes;
use http::StatusCode;

use crate::error::Error;

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use relay::{Response, StatusCode};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use relay::{Response, StatusCode};
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub(crate) body: Bytes,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: StatusCode,
}

impl Response {
    /// `200 OK` — `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Bytes::new(), headers: Vec::new(), status: code }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Case-insensitive header lookup. Returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Appends a header on the way out, e.g. `x-request-id` after `next` returns.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish("application/json", body.into())
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", Bytes::from(body.into()))
    }

    /// Terminate with an arbitrary content type.
    pub fn bytes(self, content_type: &str, body: impl Into<Bytes>) -> Response {
        self.finish(content_type, body.into())
    }

    /// Terminate with no body (e.g. `204 No Content`, redirects).
    pub fn no_body(self) -> Response {
        Response { body: Bytes::new(), headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: &str, body: Bytes) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// The unvalidated result of a function middleware.
#[derive(Debug)]
pub enum Outcome {
    /// A proper response; passes validation.
    Response(Response),
    /// Anything else. Kept only for the error message.
    Unexpected { type_name: &'static str, rendering: String },
}

impl Outcome {
    fn unexpected<T: ?Sized>(rendering: String) -> Self {
        Self::Unexpected { type_name: std::any::type_name::<T>(), rendering }
    }
}

/// Conversion of a middleware return value into an [`Outcome`].
///
/// `Err` values propagate unchanged; they are failures, not results.
///
/// ```rust
/// use relay::{IntoOutcome, Outcome, Response};
///
/// assert!(matches!(Response::text("ok").into_outcome(), Ok(Outcome::Response(_))));
/// assert!(matches!(None::<Response>.into_outcome(), Ok(Outcome::Unexpected { .. })));
/// ```
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<Outcome, Error>;
}

impl IntoOutcome for Response {
    fn into_outcome(self) -> Result<Outcome, Error> { Ok(Outcome::Response(self)) }
}

impl IntoOutcome for Option<Response> {
    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(match self {
            Some(response) => Outcome::Response(response),
            None => Outcome::unexpected::<Self>("None".to_owned()),
        })
    }
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::unexpected::<()>("()".to_owned()))
    }
}

/// A bare string is not a response: build one with [`Response::text`].
impl IntoOutcome for &'static str {
    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::unexpected::<str>(format!("{self:?}")))
    }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::unexpected::<String>(format!("{self:?}")))
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<Error>,
{
    fn into_outcome(self) -> Result<Outcome, Error> {
        self.map_err(Into::into)?.into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_puts_content_type_first() {
        let res = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/7")
            .json("{}");
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.headers()[0].0, "content-type");
        assert_eq!(res.header("Location"), Some("/users/7"));
    }

    #[test]
    fn strings_are_not_responses() {
        match "hello".into_outcome() {
            Ok(Outcome::Unexpected { type_name, rendering }) => {
                assert_eq!(type_name, "str");
                assert_eq!(rendering, "\"hello\"");
            }
            other => panic!("expected an unexpected outcome, got {other:?}"),
        }
    }

    #[test]
    fn errors_pass_through_results() {
        let failed: Result<Response, Error> = Err(Error::StackExhausted);
        assert!(matches!(failed.into_outcome(), Err(Error::StackExhausted)));

        let nested: Result<Option<Response>, Error> = Ok(None);
        assert!(matches!(nested.into_outcome(), Ok(Outcome::Unexpected { .. })));
    }
}
