//! CORS (Cross-Origin Resource Sharing) middleware
//!
//! Handles preflight requests and adds CORS headers.

use super::{Middleware, RequestHead};
use crate::{Response, ResponseBuilder, StatusCode};
use http::Method;
use smallvec::SmallVec;

/// CORS configuration
#[derive(Clone)]
pub struct CorsConfig {
    /// Allowed origins (empty = all)
    pub origins: SmallVec<[String; 4]>,
    /// Allowed methods
    pub methods: SmallVec<[Method; 8]>,
    /// Allow credentials
    pub credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: SmallVec::new(), // Empty = allow all
            methods: smallvec::smallvec![
                Method::HEAD,
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ],
            credentials: false,
        }
    }
}

impl CorsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.origins.push(origin.into());
        self
    }

    pub fn allow_credentials(mut self) -> Self {
        self.credentials = true;
        self
    }
}

/// CORS middleware
pub struct Cors {
    config: CorsConfig,
}

impl Cors {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    /// Any origin, common methods, any requested header, no credentials
    pub fn permissive() -> Self {
        Self::new(CorsConfig::default())
    }

    fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.config.origins.is_empty() {
            return true; // Allow all
        }
        self.config.origins.iter().any(|o| o == origin || o == "*")
    }

    fn is_method_allowed(&self, method: &str) -> bool {
        // Simple methods are always allowed
        matches!(method, "GET" | "HEAD" | "POST")
            || self.config.methods.iter().any(|m| m.as_str().eq_ignore_ascii_case(method))
    }

    fn methods_string(&self) -> String {
        self.config
            .methods
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn allow_origin_value(&self, origin: &str) -> String {
        if self.config.origins.is_empty() && !self.config.credentials {
            "*".to_string()
        } else {
            origin.to_string()
        }
    }

    fn is_preflight(head: &RequestHead) -> bool {
        head.method == Method::OPTIONS && head.header("access-control-request-method").is_some()
    }

    fn preflight_response(&self, head: &RequestHead, origin: &str) -> Response {
        let mut res = ResponseBuilder::new(StatusCode::NO_CONTENT).build();
        res.headers.push(("Vary".to_string(), "Origin".to_string()));

        let requested = head.header("access-control-request-method").unwrap_or("");
        if !self.is_origin_allowed(origin) || !self.is_method_allowed(requested) {
            return res;
        }

        res.headers.push(("Access-Control-Allow-Origin".to_string(), self.allow_origin_value(origin)));
        res.headers.push(("Access-Control-Allow-Methods".to_string(), self.methods_string()));

        // Any requested header is allowed
        if let Some(h) = head.header("access-control-request-headers").filter(|h| !h.is_empty()) {
            res.headers.push(("Access-Control-Allow-Headers".to_string(), h.to_string()));
        }

        if self.config.credentials {
            res.headers.push(("Access-Control-Allow-Credentials".to_string(), "true".to_string()));
        }
        res
    }
}

impl Middleware for Cors {
    fn before(&self, head: &RequestHead) -> Option<Response> {
        let origin = head.header("origin").unwrap_or("");

        // No origin header = same-origin request, skip CORS
        if origin.is_empty() || !Self::is_preflight(head) {
            return None;
        }

        Some(self.preflight_response(head, origin))
    }

    fn after(&self, head: &RequestHead, res: &mut Response) {
        let origin = head.header("origin").unwrap_or("");
        if origin.is_empty() || Self::is_preflight(head) {
            return;
        }

        res.headers.push(("Vary".to_string(), "Origin".to_string()));
        if !self.is_origin_allowed(origin) || !self.is_method_allowed(head.method.as_str()) {
            return;
        }

        res.headers.push(("Access-Control-Allow-Origin".to_string(), self.allow_origin_value(origin)));
        if self.config.credentials {
            res.headers.push(("Access-Control-Allow-Credentials".to_string(), "true".to_string()));
        }
    }
}
