//! Error types for echo-core

use crate::token::TokenError;
use thiserror::Error;

/// Result type alias for echo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the echo server
///
/// Everything above `Io` is request-scoped: the handler turns it into a
/// 500 error body and the process keeps serving. Their `Display` is the bare
/// cause; `summary()` carries the context.
#[derive(Debug, Error)]
pub enum Error {
    /// Token header could not be decoded
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Request body could not be read to the end
    #[error("{0}")]
    BodyRead(String),

    /// Body declared as JSON did not parse
    #[error("{0}")]
    JsonBody(#[source] serde_json::Error),

    /// Echo response could not be serialized
    #[error("{0}")]
    ResponseEncode(#[source] serde_json::Error),

    /// IO error (native only)
    #[cfg(feature = "native")]
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS error
    #[cfg(feature = "tls")]
    #[error("TLS error: {0}")]
    Tls(String),
}

impl Error {
    /// Short description used as the `message` of an error body
    pub fn summary(&self) -> &'static str {
        match self {
            Error::Token(_) => "failed to parse jwt",
            Error::BodyRead(_) => "failed reading body",
            Error::JsonBody(_) => "failed decoding json body",
            Error::ResponseEncode(_) => "failed to marshal response as JSON",
            #[cfg(feature = "native")]
            Error::Io(_) => "io error",
            #[cfg(feature = "tls")]
            Error::Tls(_) => "tls error",
        }
    }
}
