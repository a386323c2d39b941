//! Echo handler
//!
//! Reflects each request back as an [`EchoResponse`]. Per request, in order:
//! bump the counter, describe the request, read the body (raw or JSON),
//! decode the token header, apply the status/delay override headers, write
//! the pretty-printed JSON.

use crate::echo::{EchoResponse, ErrorBody};
use crate::request::{self, header_str};
use crate::response::{Response, ResponseBuilder, StatusCode};
use crate::{token, Error, Result};
use http::HeaderMap;
use http_body::Body;
use http_body_util::BodyExt;
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Header overriding the response status code
pub const STATUS_OVERRIDE_HEADER: &str = "x-set-response-status-code";
/// Header asking the server to wait before responding (milliseconds)
pub const DELAY_OVERRIDE_HEADER: &str = "x-set-response-delay-ms";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Peer address, stored in request extensions by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

/// Process-wide request sequence
///
/// Each call to [`next`](Self::next) is one atomic increment-and-read, so
/// every request sees a distinct value and none are skipped.
#[derive(Debug, Default)]
pub struct RequestCounter {
    value: AtomicU64,
}

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the new value
    #[inline]
    pub fn next(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number of requests admitted so far
    #[inline]
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

/// Request-reflection handler
#[derive(Debug, Default)]
pub struct EchoHandler {
    /// Header carrying the token; empty disables token decoding
    token_header: String,
    counter: RequestCounter,
}

impl EchoHandler {
    pub fn new(token_header: impl Into<String>) -> Self {
        Self {
            token_header: token_header.into(),
            counter: RequestCounter::new(),
        }
    }

    pub fn token_header(&self) -> Option<&str> {
        Some(self.token_header.as_str()).filter(|h| !h.is_empty())
    }

    pub fn counter(&self) -> &RequestCounter {
        &self.counter
    }

    /// Handle one request
    ///
    /// Never fails: internal errors become a 500 JSON error body.
    pub async fn handle<B>(&self, req: http::Request<B>) -> Response
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let counter = self.counter.next();
        let remote = req
            .extensions()
            .get::<RemoteAddr>()
            .map(|r| r.0.to_string())
            .unwrap_or_else(|| "-".to_string());
        let method = req.method().clone();
        let uri = req.uri().clone();

        tracing::info!(counter, %method, %uri, remote_addr = %remote, "serving request");

        match self.echo(counter, req).await {
            Ok((res, echo)) => {
                match serde_json::to_string(&echo) {
                    Ok(response) => tracing::info!(
                        counter,
                        %method,
                        %uri,
                        remote_addr = %remote,
                        status = res.status.as_u16(),
                        %response,
                        "served request"
                    ),
                    Err(e) => tracing::warn!(
                        counter,
                        %method,
                        %uri,
                        remote_addr = %remote,
                        status = res.status.as_u16(),
                        error = %e,
                        "served request, response not loggable"
                    ),
                }
                res
            }
            Err(err) => error_response(counter, &err),
        }
    }

    async fn echo<B>(&self, counter: u64, req: http::Request<B>) -> Result<(Response, EchoResponse)>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = req.into_parts();

        let mut echo = EchoResponse {
            status_code: StatusCode::OK,
            hostname: request::hostname(&parts.headers, &parts.uri),
            path: parts.uri.path().to_string(),
            method: parts.method.as_str().to_string(),
            query: request::query_params(parts.uri.query()),
            headers: request::header_map(&parts.headers),
            body: None,
            json_body: None,
            token: None,
        };

        let declared = request::declared_length(&parts.headers, body.size_hint().exact());
        if declared.is_some_and(|len| len > 0) {
            let bytes = body
                .collect()
                .await
                .map_err(|e| Error::BodyRead(e.to_string()))?
                .to_bytes();

            if request::content_type(&parts.headers) == Some(JSON_CONTENT_TYPE) {
                // First JSON value wins, trailing bytes are ignored
                let mut de = serde_json::Deserializer::from_slice(&bytes);
                echo.json_body = Some(Value::deserialize(&mut de).map_err(Error::JsonBody)?);
            } else {
                echo.body = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
        }

        if let Some(name) = self.token_header() {
            if let Some(raw) = non_empty(&parts.headers, name) {
                echo.token = Some(token::decode(token::extract(&raw))?);
            }
        }

        if let Some(status) = requested_status(counter, &parts.headers) {
            echo.status_code = status;
        }

        if let Some(delay) = requested_delay(counter, &parts.headers) {
            tracing::info!(counter, delay_ms = delay.as_millis() as u64, "delaying response");
            tokio::time::sleep(delay).await;
        }

        let res = Response::json(echo.status_code, &echo)?;
        Ok((res, echo))
    }
}

fn non_empty(headers: &HeaderMap, name: &str) -> Option<String> {
    header_str(headers, name)
        .filter(|v| !v.is_empty())
        .map(|v| v.into_owned())
}

/// Positive integer header value; anything else is logged and ignored
fn positive_header(counter: u64, headers: &HeaderMap, name: &str) -> Option<i64> {
    let raw = non_empty(headers, name)?;
    match raw.parse::<i64>() {
        Ok(v) if v > 0 => Some(v),
        Ok(v) => {
            tracing::warn!(counter, header = name, value = v, "ignoring non-positive override");
            None
        }
        Err(e) => {
            tracing::warn!(counter, header = name, value = %raw, error = %e, "ignoring invalid override");
            None
        }
    }
}

fn requested_status(counter: u64, headers: &HeaderMap) -> Option<StatusCode> {
    let code = positive_header(counter, headers, STATUS_OVERRIDE_HEADER)?;
    match StatusCode::from_code(code) {
        Some(status) => {
            tracing::info!(counter, status = code, "status code forced");
            Some(status)
        }
        None => {
            tracing::warn!(counter, status = code, "invalid status code requested");
            None
        }
    }
}

fn requested_delay(counter: u64, headers: &HeaderMap) -> Option<Duration> {
    positive_header(counter, headers, DELAY_OVERRIDE_HEADER).map(|ms| Duration::from_millis(ms as u64))
}

/// 500 with `{"error": true, "message": .., "details": ..}`
pub fn error_response(counter: u64, err: &Error) -> Response {
    tracing::error!(counter, error = %err, "{}", err.summary());

    match Response::json(StatusCode::INTERNAL_SERVER_ERROR, &ErrorBody::from(err)) {
        Ok(res) => res,
        Err(e) => {
            tracing::error!(counter, error = %e, "failed to write error JSON");
            ResponseBuilder::new(StatusCode::INTERNAL_SERVER_ERROR)
                .header("content-type", JSON_CONTENT_TYPE)
                .body(r#"{"error": true}"#)
                .build()
        }
    }
}
