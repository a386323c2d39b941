//! Built-in request handlers besides the echo handler

pub mod favicon;

pub use favicon::{Favicon, FAVICON_PATH};
