use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Int,
    Float,
    Boolean,
}

/// A harvested scalar, kept as its raw text plus the JSON type it arrived as.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScalarValue {
    pub kind: PrimitiveKind,
    pub raw: String,
}

impl ScalarValue {
    pub fn string(raw: impl Into<String>) -> Self {
        Self {
            kind: PrimitiveKind::String,
            raw: raw.into(),
        }
    }

    pub fn from_json(value: &Value) -> Option<Self> {
        let (kind, raw) = match value {
            Value::String(s) => (PrimitiveKind::String, s.clone()),
            Value::Bool(b) => (PrimitiveKind::Boolean, b.to_string()),
            Value::Number(n) if n.is_f64() => (PrimitiveKind::Float, n.to_string()),
            Value::Number(n) => (PrimitiveKind::Int, n.to_string()),
            _ => return None,
        };
        Some(Self { kind, raw })
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Renders `s` as a quoted GraphQL string literal.
pub fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s.replace('"', "\\\"")))
}
