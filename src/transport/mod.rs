//! Boundary to the target endpoint. The engine only sees the [`Transport`]
//! trait, so tests and alternative clients can stand in for HTTP.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::FuzzError;

/// Parsed body of a response plus its HTTP status.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Non-empty GraphQL `errors` member.
    pub fn errors(&self) -> &[Value] {
        match self.body.get("errors") {
            Some(Value::Array(errors)) => errors.as_slice(),
            _ => &[],
        }
    }

    pub fn has_errors(&self) -> bool {
        match self.body.get("errors") {
            None | Some(Value::Null) => false,
            Some(Value::Array(errors)) => !errors.is_empty(),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        self.body.get("data").filter(|d| !d.is_null())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `payload` as the GraphQL document of one request.
    async fn send_request(&self, url: &str, payload: &str) -> Result<TransportResponse, FuzzError>;

    /// Headers attached to every request.
    fn headers(&self) -> BTreeMap<String, String>;

    fn proxy(&self) -> Option<String>;
}
