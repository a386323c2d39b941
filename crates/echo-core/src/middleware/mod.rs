//! Middleware wrapped around the echo handler

pub mod cors;

// Re-exports for convenience
pub use cors::{Cors, CorsConfig};

use crate::Response;
use http::{HeaderMap, Method};

/// Request view handed to middleware
///
/// The handler consumes the request, so middleware sees the method and a
/// snapshot of the headers instead.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub headers: HeaderMap,
}

impl RequestHead {
    pub fn of<B>(req: &http::Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            headers: req.headers().clone(),
        }
    }

    /// First value of a header, if it is valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Middleware trait - process request/response
pub trait Middleware: Send + Sync {
    /// Process request before handler; `Some` short-circuits
    fn before(&self, head: &RequestHead) -> Option<Response>;

    /// Process response after handler
    fn after(&self, head: &RequestHead, res: &mut Response);
}

/// Middleware chain
#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run before middlewares, return early response if any
    ///
    /// An early response still passes through the `after` hooks.
    pub fn run_before(&self, head: &RequestHead) -> Option<Response> {
        for m in &self.middlewares {
            if let Some(res) = m.before(head) {
                return Some(res);
            }
        }
        None
    }

    /// Run after middlewares in reverse order
    pub fn run_after(&self, head: &RequestHead, res: &mut Response) {
        for m in self.middlewares.iter().rev() {
            m.after(head, res);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ResponseBuilder, StatusCode};

    struct Stamp(&'static str);

    impl Middleware for Stamp {
        fn before(&self, head: &RequestHead) -> Option<Response> {
            (head.method == Method::DELETE).then(|| ResponseBuilder::new(StatusCode(405)).build())
        }

        fn after(&self, _head: &RequestHead, res: &mut Response) {
            res.headers.push(("x-stamp".to_string(), self.0.to_string()));
        }
    }

    fn head(method: Method) -> RequestHead {
        RequestHead::of(&http::Request::builder().method(method).body(()).unwrap())
    }

    #[test]
    fn test_after_runs_in_reverse() {
        let mut chain = MiddlewareChain::new();
        chain.add(Stamp("first"));
        chain.add(Stamp("second"));

        let head = head(Method::GET);
        assert!(chain.run_before(&head).is_none());

        let mut res = Response::ok();
        chain.run_after(&head, &mut res);
        let stamps: Vec<_> = res.headers.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(stamps, vec!["second", "first"]);
    }

    #[test]
    fn test_before_short_circuits() {
        let mut chain = MiddlewareChain::new();
        chain.add(Stamp("only"));
        let res = chain.run_before(&head(Method::DELETE)).unwrap();
        assert_eq!(res.status, StatusCode(405));
    }
}
