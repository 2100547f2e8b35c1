use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::transport::TransportResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// The target rejected the request or returned nothing usable.
    ExternalFailure,
    /// Materialization or transport failed before a usable response existed.
    InternalFailure,
    GeneralSuccess,
    HasDataSuccess,
    /// Error-free but empty response, counted as success by policy.
    NoDataSuccess,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::ExternalFailure => "external_failure",
            ResultKind::InternalFailure => "internal_failure",
            ResultKind::GeneralSuccess => "general_success",
            ResultKind::HasDataSuccess => "has_data_success",
            ResultKind::NoDataSuccess => "no_data_success",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ResultKind::GeneralSuccess | ResultKind::HasDataSuccess | ResultKind::NoDataSuccess
        )
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether an error-free response with empty data counts as success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuccessPolicy {
    pub no_data_counts_as_success: bool,
}

/// Outcome of sending one payload.
#[derive(Debug, Clone)]
pub struct OpResult {
    pub kind: ResultKind,
    pub payload: String,
    pub status_code: Option<u16>,
    pub response: Value,
}

impl OpResult {
    pub fn internal_failure(payload: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::InternalFailure,
            payload: payload.into(),
            status_code: None,
            response: Value::Null,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind.is_success()
    }

    pub fn data(&self) -> Option<&Value> {
        self.response.get("data").filter(|d| !d.is_null())
    }

    pub fn errors(&self) -> &[Value] {
        match self.response.get("errors") {
            Some(Value::Array(errors)) => errors.as_slice(),
            _ => &[],
        }
    }

    pub fn has_non_empty_data(&self) -> bool {
        self.data().is_some_and(|d| !is_data_empty(d))
    }
}

/// True when every leaf under `data` is null (or there are no leaves).
pub fn is_data_empty(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Object(map) => map.values().all(is_data_empty),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Classifies an error-free-or-not response for the field `response_key`.
pub fn classify_response(response: &TransportResponse, response_key: &str, policy: SuccessPolicy) -> ResultKind {
    let empty_body = match &response.body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty_body || response.has_errors() {
        return ResultKind::ExternalFailure;
    }
    let Some(data) = response.data() else {
        return ResultKind::ExternalFailure;
    };

    let missing = data.get(response_key).map_or(true, Value::is_null);
    if missing || is_data_empty(data) {
        return if policy.no_data_counts_as_success {
            ResultKind::NoDataSuccess
        } else {
            ResultKind::ExternalFailure
        };
    }
    ResultKind::GeneralSuccess
}
