//! Echo response shapes (the JSON wire contract)

use crate::request::MultiMap;
use crate::response::StatusCode;
use crate::token::DecodedToken;
use crate::Error;
use serde::Serialize;
use serde_json::Value;

/// Structured reflection of one request
#[derive(Debug, Clone, Serialize)]
pub struct EchoResponse {
    pub status_code: StatusCode,
    pub hostname: String,
    pub path: String,
    pub method: String,
    pub query: MultiMap,
    pub headers: MultiMap,
    /// Raw body, set only for non-JSON bodies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Parsed body, set only for `application/json` bodies
    #[serde(rename = "json", skip_serializing_if = "Option::is_none")]
    pub json_body: Option<Value>,
    #[serde(rename = "jwt", skip_serializing_if = "Option::is_none")]
    pub token: Option<DecodedToken>,
}

/// Body of a 500 response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: bool,
    pub message: String,
    pub details: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            details: details.into(),
        }
    }
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        ErrorBody::new(err.summary(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn skeleton() -> EchoResponse {
        EchoResponse {
            status_code: StatusCode::OK,
            hostname: "localhost:8080".to_string(),
            path: "/test".to_string(),
            method: "GET".to_string(),
            query: MultiMap::new(),
            headers: MultiMap::new(),
            body: None,
            json_body: None,
            token: None,
        }
    }

    #[test]
    fn test_optional_fields_omitted() {
        let value = serde_json::to_value(skeleton()).unwrap();
        assert_eq!(
            value,
            json!({
                "status_code": 200,
                "hostname": "localhost:8080",
                "path": "/test",
                "method": "GET",
                "query": {},
                "headers": {},
            })
        );
    }

    #[test]
    fn test_wire_names() {
        let mut echo = skeleton();
        echo.json_body = Some(json!({"foo": "bar"}));
        echo.token = Some(crate::token::decode(
            "eyJhbGciOiJIUzI1NiJ9.eyJuYW1lIjoiSm9lIENvZGVyIn0.sig",
        ).unwrap());

        let value = serde_json::to_value(echo).unwrap();
        assert_eq!(value["json"], json!({"foo": "bar"}));
        assert_eq!(value["jwt"]["header"]["alg"], "HS256");
        assert_eq!(value["jwt"]["signature"], "sig");
        assert!(value.get("body").is_none());
    }

    #[test]
    fn test_error_body() {
        let err = Error::BodyRead("connection reset".to_string());
        let value = serde_json::to_value(ErrorBody::from(&err)).unwrap();
        assert_eq!(value["error"], true);
        assert_eq!(value["message"], "failed reading body");
        assert_eq!(value["details"], "connection reset");
    }
}
