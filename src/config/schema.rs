use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "materializer": {
                "type": "object",
                "properties": {
                    "max_object_cycles": { "type": "integer", "minimum": 1 },
                    "max_output_depth": { "type": "integer", "minimum": 1 },
                    "max_input_depth": { "type": "integer", "minimum": 1 },
                    "hard_cutoff_depth": { "type": "integer", "minimum": 1 }
                }
            },
            "fuzzing": {
                "type": "object",
                "properties": {
                    "no_data_count_as_success": { "type": "boolean" },
                    "allow_deletion_of_objects": { "type": "boolean" },
                    "max_fuzzing_iterations": { "type": "integer", "minimum": 0 },
                    "max_time_secs": { "type": "integer", "minimum": 1 },
                    "skip_maximal_payloads": { "type": "boolean" },
                    "skip_dos_attacks": { "type": "boolean" },
                    "skip_injection_attacks": { "type": "boolean" },
                    "skip_misc_attacks": { "type": "boolean" },
                    "skip_nodes": { "type": "array", "items": { "type": "string" } },
                    "use_dependency_graph": { "type": "boolean" },
                    "seed": { "type": "integer", "minimum": 0 }
                }
            },
            "request": {
                "type": "object",
                "properties": {
                    "timeout_secs": { "type": "integer", "minimum": 1 },
                    "time_between_requests_ms": { "type": "integer", "minimum": 0 },
                    "headers": {
                        "type": "object",
                        "additionalProperties": { "type": "string" }
                    },
                    "authorization": { "type": "string" },
                    "proxy": { "type": "string", "format": "uri" }
                }
            }
        }
    })
});
