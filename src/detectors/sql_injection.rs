use rand::rngs::StdRng;
use regex::Regex;
use std::sync::LazyLock;

use super::{Detector, DetectorCategory};
use crate::bucket::quote;
use crate::engine::OpResult;
use crate::materializer::{DefaultGetter, Getter};

pub const SQL_INJECTION_STRING: &str = "' OR 1=1--";

const TARGET_INPUTS: &[&str] = &["filter", "search", "query", "name", "username", "password", "email", "id"];

static SQL_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(sql syntax|syntax error at or near|unterminated quoted string|sqlstate|sqlite_error|ora-\d{5}|mysql_fetch|pg_query|unclosed quotation mark)",
    )
    .expect("SQL error pattern is valid")
});

/// Puts a tautology into string inputs that usually reach a WHERE clause.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlInjectionGetter;

impl Getter for SqlInjectionGetter {
    fn string_value(&self, input_name: &str, rng: &mut StdRng) -> String {
        if TARGET_INPUTS.contains(&input_name.to_lowercase().as_str()) {
            return quote(SQL_INJECTION_STRING);
        }
        DefaultGetter.string_value(input_name, rng)
    }
}

#[derive(Debug, Default)]
pub struct SqlInjectionDetector {
    getter: SqlInjectionGetter,
}

impl Detector for SqlInjectionDetector {
    fn name(&self) -> &'static str {
        "SQL Injection"
    }

    fn category(&self) -> DetectorCategory {
        DetectorCategory::Injection
    }

    fn getter(&self) -> &dyn Getter {
        &self.getter
    }

    fn evaluate(&self, payload: &str, result: &OpResult) -> (bool, bool) {
        if !payload.contains(SQL_INJECTION_STRING) {
            return (false, false);
        }
        let confirmed = SQL_ERROR.is_match(&result.response.to_string());
        let potential = confirmed || (result.status_code == Some(200) && result.has_non_empty_data());
        (confirmed, potential)
    }
}
