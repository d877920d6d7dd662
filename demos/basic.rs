//! Minimal relay example — a logging step, a token check and an echo
//! endpoint, with a nested stack and a resolver.
//!
//! Run with:
//!   RUST_LOG=trace cargo run --example basic

use std::time::Instant;

use relay::{
    Descriptor, Dispatcher, Handler, Middleware, Request, Response, Result, StatusCode,
};
use tracing::info;

#[derive(Debug)]
enum Named {
    Auth,
    Echo,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    // Entries the resolver knows by name.
    let guarded = Dispatcher::builder()
        .push_opaque(Named::Auth)
        .push_opaque(Named::Echo)
        .resolver(|d: &Descriptor| match d.downcast_ref::<Named>() {
            Some(Named::Auth) => Descriptor::middleware(RequireToken),
            Some(Named::Echo) => Descriptor::function(echo),
            None => d.clone(),
        })
        .build()?;

    let app = Dispatcher::builder()
        .push_fn(access_log)
        .push(guarded)
        .build()?;

    for req in [
        Request::get("/users/42"),
        Request::get("/users/42").with_header("authorization", "Bearer demo"),
    ] {
        let res = app.handle(req)?;
        info!(
            status = %res.status_code(),
            body = %String::from_utf8_lossy(res.body()),
            "response"
        );
    }

    Ok(())
}

// Runs first on the way in, last on the way out.
fn access_log(req: Request, next: &dyn Handler) -> Result<Response> {
    let started = Instant::now();
    let path = req.path().to_owned();
    let res = next.handle(req)?;
    info!(%path, status = %res.status_code(), elapsed = ?started.elapsed(), "handled");
    Ok(res.with_header("x-served-by", "relay"))
}

struct RequireToken;

impl Middleware for RequireToken {
    fn process(&self, req: Request, next: &dyn Handler) -> Result<Response> {
        match req.header("authorization") {
            Some(token) => {
                let user = token.trim_start_matches("Bearer ").to_owned();
                next.handle(req.with_attribute("user", user))
            }
            None => Ok(Response::status(StatusCode::UNAUTHORIZED)),
        }
    }
}

fn echo(req: Request, _next: &dyn Handler) -> Response {
    let user = req.attribute("user").unwrap_or("anonymous");
    Response::json(format!(r#"{{"path":"{}","user":"{user}"}}"#, req.path()).into_bytes())
}
