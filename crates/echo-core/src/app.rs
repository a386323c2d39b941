//! Application service: middleware, favicon and the catch-all echo route

use crate::handlers::Favicon;
use crate::middleware::{Cors, MiddlewareChain, RequestHead};
use crate::{EchoHandler, Response};
use http_body::Body;

/// Everything a connection needs to answer requests
pub struct EchoApp {
    handler: EchoHandler,
    middleware: MiddlewareChain,
    favicon: Favicon,
}

impl EchoApp {
    pub fn new(handler: EchoHandler) -> Self {
        Self {
            handler,
            middleware: MiddlewareChain::new(),
            favicon: Favicon,
        }
    }

    /// Wrap every route in permissive CORS
    pub fn with_cors(mut self) -> Self {
        self.middleware.add(Cors::permissive());
        self
    }

    pub fn handler(&self) -> &EchoHandler {
        &self.handler
    }

    /// Route one request
    pub async fn call<B>(&self, req: http::Request<B>) -> Response
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        if self.middleware.is_empty() {
            return self.route(req).await;
        }

        let head = RequestHead::of(&req);
        let mut res = match self.middleware.run_before(&head) {
            Some(early) => early,
            None => self.route(req).await,
        };
        self.middleware.run_after(&head, &mut res);
        res
    }

    async fn route<B>(&self, req: http::Request<B>) -> Response
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        if Favicon::matches(req.uri().path()) {
            return self.favicon.handle();
        }
        self.handler.handle(req).await
    }
}
