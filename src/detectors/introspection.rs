use super::{Detector, DetectorCategory};
use crate::engine::OpResult;
use crate::materializer::{DefaultGetter, Getter};

const INTROSPECTION_QUERY: &str = "query {\n  __schema {\n    queryType {\n      name\n    }\n  }\n}";

/// Checks once per API whether schema introspection is open.
#[derive(Debug, Default)]
pub struct IntrospectionDetector {
    getter: DefaultGetter,
}

impl Detector for IntrospectionDetector {
    fn name(&self) -> &'static str {
        "Introspection Enabled"
    }

    fn category(&self) -> DetectorCategory {
        DetectorCategory::Misc
    }

    fn only_once_for_api(&self) -> bool {
        true
    }

    fn getter(&self) -> &dyn Getter {
        &self.getter
    }

    fn fixed_payload(&self) -> Option<(&'static str, &'static str)> {
        Some(("__schema", INTROSPECTION_QUERY))
    }

    fn evaluate(&self, _payload: &str, result: &OpResult) -> (bool, bool) {
        let confirmed = result.status_code == Some(200)
            && result.data().is_some_and(|data| data.get("__schema").is_some_and(|s| !s.is_null()));
        (confirmed, confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ResultKind;
    use crate::materializer::render::is_valid_request;
    use serde_json::json;

    #[test]
    fn test_fixed_payload_parses() {
        let (_, payload) = IntrospectionDetector::default().fixed_payload().unwrap();
        assert!(is_valid_request(payload));
    }

    #[test]
    fn test_schema_in_response_confirms() {
        let detector = IntrospectionDetector::default();
        let mut result = OpResult {
            kind: ResultKind::GeneralSuccess,
            payload: INTROSPECTION_QUERY.to_string(),
            status_code: Some(200),
            response: json!({"data": {"__schema": {"queryType": {"name": "Query"}}}}),
        };
        assert_eq!(detector.evaluate(INTROSPECTION_QUERY, &result), (true, true));

        result.response = json!({"errors": [{"message": "introspection is disabled"}]});
        assert_eq!(detector.evaluate(INTROSPECTION_QUERY, &result), (false, false));
    }
}
