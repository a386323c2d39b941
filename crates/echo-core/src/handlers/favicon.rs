//! Favicon handler
//!
//! Browsers poking at the server ask for `/favicon.ico` on every page load.
//! Answering it here keeps those requests out of the echo counter.

use crate::{Response, ResponseBuilder, StatusCode};
use bytes::Bytes;

/// Path the favicon is served on
pub const FAVICON_PATH: &str = "/favicon.ico";

static FAVICON: &[u8] = include_bytes!("../../assets/favicon.ico");

/// Embedded favicon
#[derive(Debug, Clone, Copy, Default)]
pub struct Favicon;

impl Favicon {
    /// Does this request path belong to the favicon?
    pub fn matches(path: &str) -> bool {
        path == FAVICON_PATH
    }

    pub fn handle(&self) -> Response {
        ResponseBuilder::new(StatusCode::OK)
            .header("content-type", "image/x-icon")
            .header("cache-control", "public, max-age=86400")
            .body(Bytes::from_static(FAVICON))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches() {
        assert!(Favicon::matches("/favicon.ico"));
        assert!(!Favicon::matches("/favicon.ico/x"));
        assert!(!Favicon::matches("/"));
    }

    #[test]
    fn test_icon_body() {
        let res = Favicon.handle();
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.content_type(), Some("image/x-icon"));
        // ICO header: reserved 0, type 1
        assert_eq!(&res.body[..4], &[0, 0, 1, 0]);
    }
}
