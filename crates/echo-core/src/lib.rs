//! echo-core: request-reflection core of the http-echo server
//!
//! Every request is answered with a JSON description of itself: method, path,
//! query, headers, body (raw or parsed JSON) and an optional decoded bearer
//! token. Clients can steer the response with override headers:
//! - `X-Set-Response-Status-Code` - status code to answer with
//! - `X-Set-Response-Delay-Ms` - wait before answering
//!
//! ## Features
//! - `native` - tokio/hyper listener and connection handling
//! - `tls` - HTTPS via rustls (PEM files or self-signed)

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod app;
pub mod echo;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod token;

#[cfg(feature = "native")]
pub mod server;

#[cfg(feature = "tls")]
pub mod tls;

// Re-exports
pub use app::EchoApp;
pub use echo::{EchoResponse, ErrorBody};
pub use error::{Error, Result};
pub use handler::{EchoHandler, RemoteAddr, RequestCounter};
pub use response::{Response, ResponseBuilder, StatusCode};
pub use token::{DecodedToken, TokenError};

// Middleware re-exports
pub use middleware::{Cors, CorsConfig, Middleware, MiddlewareChain};

#[cfg(feature = "native")]
pub use server::{Acceptor, ConnectionTracker, EchoServer, ServerConfig};

#[cfg(feature = "tls")]
pub use tls::TlsConfig;
