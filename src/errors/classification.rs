use super::types::FuzzError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    /// Fatal errors abort the whole run. Everything else is absorbed at the
    /// node boundary and recorded as an internal failure.
    pub fatal: bool,
}

impl FuzzError {
    /// Classify this error to determine its type and whether it ends the run.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Run-level failures
            FuzzError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                fatal: true,
            },
            FuzzError::Schema(_) => ErrorClassification {
                error_type: "SchemaError",
                fatal: true,
            },
            FuzzError::UnknownNode(_) => ErrorClassification {
                error_type: "UnknownNodeError",
                fatal: true,
            },
            FuzzError::Io(_) => ErrorClassification {
                error_type: "IoError",
                fatal: true,
            },
            FuzzError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                fatal: true,
            },

            // Node-level failures
            FuzzError::HardDependencyNotMet(_) => ErrorClassification {
                error_type: "HardDependencyNotMet",
                fatal: false,
            },
            FuzzError::Materialization(_) => ErrorClassification {
                error_type: "MaterializationError",
                fatal: false,
            },
            FuzzError::InvalidPayload(_) => ErrorClassification {
                error_type: "InvalidPayloadError",
                fatal: false,
            },
            FuzzError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                fatal: false,
            },
            FuzzError::Timeout(_) => ErrorClassification {
                error_type: "TimeoutError",
                fatal: false,
            },
            FuzzError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                fatal: false,
            },
            FuzzError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                fatal: false,
            },
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.classify().fatal
    }
}
